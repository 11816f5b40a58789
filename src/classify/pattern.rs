// src/classify/pattern.rs

use std::fmt;

use regex::Regex;

use crate::errors::{ReliableError, Result};
use crate::types::{Channel, Stream};

/// A compiled regular expression bound to one output channel.
///
/// Patterns are immutable once built; cloning shares the compiled regex.
#[derive(Clone)]
pub struct Pattern {
    channel: Channel,
    regex: Regex,
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("channel", &self.channel)
            .field("regex", &self.regex.as_str())
            .finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} /{}/", self.channel, self.regex.as_str())
    }
}

impl Pattern {
    /// Compile `source` into a pattern bound to `channel`.
    pub fn new(channel: Channel, source: &str) -> Result<Self> {
        let regex = Regex::new(source).map_err(|source_err| ReliableError::InvalidPattern {
            pattern: source.to_string(),
            source: source_err,
        })?;
        Ok(Self { channel, regex })
    }

    pub fn stdout(source: &str) -> Result<Self> {
        Self::new(Channel::Stdout, source)
    }

    pub fn stderr(source: &str) -> Result<Self> {
        Self::new(Channel::Stderr, source)
    }

    pub fn either(source: &str) -> Result<Self> {
        Self::new(Channel::Either, source)
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// The regex source this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns true if this pattern listens on `stream` and matches `text`.
    pub fn matches(&self, stream: Stream, text: &str) -> bool {
        self.channel.accepts(stream) && self.regex.is_match(text)
    }
}
