// src/classify/classifier.rs

//! Stateful rule engine over successive chunks of process output.
//!
//! A `Classifier` is scoped to one logical invocation of a command. Its match
//! counter accumulates across every retry of that invocation, while the
//! "last match" only describes the current attempt:
//!
//! - [`Classifier::reset_attempt`] forgets the last match before each attempt.
//! - [`Classifier::observe`] scans a chunk, first registered pattern wins.
//! - [`Classifier::should_retry`] reports a reason only while the budget
//!   holds; once the counter exceeds `max_matches` the classifier gives up
//!   for the rest of the invocation.

use tracing::debug;

use crate::types::Stream;

use super::pattern::Pattern;

/// Default number of transient matches tolerated per invocation.
pub const DEFAULT_MAX_MATCHES: u32 = 10;

/// The most recent match seen by a classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// The observed text, trimmed of surrounding whitespace.
    pub text: String,
    /// Source of the pattern that matched.
    pub pattern: String,
    pub stream: Stream,
}

impl MatchRecord {
    /// Human-readable justification for a retry.
    pub fn reason(&self) -> String {
        format!("{:?} (matched {:?} on {})", self.text, self.pattern, self.stream)
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    patterns: Vec<Pattern>,
    max_matches: u32,
    matches_seen: u32,
    last_match: Option<MatchRecord>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Classifier {
    pub fn new(patterns: Vec<Pattern>) -> Self {
        Self {
            patterns,
            max_matches: DEFAULT_MAX_MATCHES,
            matches_seen: 0,
            last_match: None,
        }
    }

    pub fn with_max_matches(mut self, max_matches: u32) -> Self {
        self.max_matches = max_matches;
        self
    }

    /// Append a pattern; it is tried after every pattern already registered.
    pub fn push(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn max_matches(&self) -> u32 {
        self.max_matches
    }

    /// Matches seen so far across every attempt of this invocation.
    pub fn matches_seen(&self) -> u32 {
        self.matches_seen
    }

    /// Match recorded for the current attempt, if any.
    pub fn last_match(&self) -> Option<&MatchRecord> {
        self.last_match.as_ref()
    }

    /// True once the match counter has strictly exceeded the budget.
    pub fn is_exhausted(&self) -> bool {
        self.matches_seen > self.max_matches
    }

    /// Forget the previous attempt's match. The budget counter is kept.
    pub fn reset_attempt(&mut self) {
        self.last_match = None;
    }

    /// Scan `text` against the patterns listening on `stream`.
    ///
    /// Returns true if a pattern matched.
    pub fn observe(&mut self, stream: Stream, text: &str) -> bool {
        if self.is_exhausted() {
            return false;
        }

        let Some(pattern) = self.patterns.iter().find(|p| p.matches(stream, text)) else {
            return false;
        };

        self.matches_seen += 1;
        let record = MatchRecord {
            text: text.trim().to_string(),
            pattern: pattern.as_str().to_string(),
            stream,
        };
        debug!(
            stream = %stream,
            pattern = %record.pattern,
            matches_seen = self.matches_seen,
            max_matches = self.max_matches,
            "output matched transient-failure pattern"
        );
        self.last_match = Some(record);
        true
    }

    /// Reason to retry the current attempt, if any.
    pub fn should_retry(&self) -> Option<String> {
        let record = self.last_match.as_ref()?;
        if self.is_exhausted() {
            return None;
        }
        Some(record.reason())
    }

    /// True if there are no patterns, so no retry can ever be recommended.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
