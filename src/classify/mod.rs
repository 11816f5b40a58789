// src/classify/mod.rs

//! Text classification of child process output.
//!
//! - [`pattern`] holds the compiled, channel-bound [`Pattern`] rule.
//! - [`lines`] reassembles arbitrary output chunks into lines.
//! - [`classifier`] owns an ordered rule set plus the per-invocation match
//!   budget, and answers "was the current attempt's failure transient?".

pub mod classifier;
pub mod lines;
pub mod pattern;

pub use crate::types::{Channel, Stream};
pub use classifier::{Classifier, DEFAULT_MAX_MATCHES, MatchRecord};
pub use lines::LineBuffer;
pub use pattern::Pattern;
