// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] holds the immutable [`CommandLine`] being run.
//! - [`outcome`] describes what one attempt produced: an [`ExitStatus`]
//!   plus every output chunk in arrival order.
//! - [`backend`] provides the `ProcessBackend` trait and the concrete
//!   `TokioBackend` used in production, which tests can replace with a
//!   scripted implementation.
//! - [`executor`] owns the retry loop that ties backend and strategies
//!   together.

pub mod backend;
pub mod command;
pub mod executor;
pub mod outcome;

pub use backend::{ATTEMPT_TIMEOUT, OutputSink, ProcessBackend, TokioBackend};
pub use command::CommandLine;
pub use executor::{ReliableExecutor, RetryContext, RetryObserver};
pub use outcome::{ExitStatus, OutputChunk, ProcessOutcome};
