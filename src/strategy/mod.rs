// src/strategy/mod.rs

//! Retry strategies.
//!
//! A strategy watches the output of each attempt and decides whether a
//! failure looked transient. The executor drives every bound strategy
//! through the same lifecycle:
//!
//! 1. [`Strategy::about_to_run`] before each attempt,
//! 2. [`Strategy::process_stdout`] / [`Strategy::process_stderr`] for every
//!    chunk of output as it arrives,
//! 3. [`Strategy::should_retry`] once the attempt has failed.
//!
//! Concrete strategies:
//! - [`ssh`]: DNS and connection failures reported by the `ssh` client.
//! - [`scp`]: same failure modes as `ssh`.
//! - [`git`]: `ssh` failures plus git's own transport failures.

pub mod git;
pub mod scp;
pub mod ssh;

use tracing::debug;

use crate::classify::{Classifier, Pattern};
use crate::errors::Result;
use crate::types::Stream;

/// Contract every retry strategy implements.
pub trait Strategy: Send {
    /// Name this strategy is registered under.
    fn name(&self) -> &str;

    /// Called before every attempt, including the first.
    fn about_to_run(&mut self);

    fn process_stdout(&mut self, text: &str);

    fn process_stderr(&mut self, text: &str);

    /// A justification for retrying the attempt that just failed, or `None`
    /// if the failure should be surfaced.
    fn should_retry(&mut self) -> Option<String>;

    /// False if nothing this strategy observes could ever lead to a retry.
    fn can_retry(&self) -> bool {
        true
    }

    fn process(&mut self, stream: Stream, text: &str) {
        match stream {
            Stream::Stdout => self.process_stdout(text),
            Stream::Stderr => self.process_stderr(text),
        }
    }
}

/// Strategy driven by a single [`Classifier`].
///
/// Patterns are registered builder-style and tried in registration order:
///
/// ```
/// # fn main() -> reliable::errors::Result<()> {
/// use reliable::strategy::{PatternStrategy, Strategy};
///
/// let mut strategy = PatternStrategy::new("rsync")
///     .on_stderr(r"^rsync: connection unexpectedly closed")?
///     .on_either(r"^rsync error: timeout")?;
///
/// strategy.about_to_run();
/// strategy.process_stderr("rsync: connection unexpectedly closed (0 bytes received so far)");
/// assert!(strategy.should_retry().is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PatternStrategy {
    name: String,
    classifier: Classifier,
    matched_this_attempt: bool,
}

impl PatternStrategy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classifier: Classifier::default(),
            matched_this_attempt: false,
        }
    }

    pub fn with_max_matches(mut self, max_matches: u32) -> Self {
        self.classifier = self.classifier.with_max_matches(max_matches);
        self
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.classifier.push(pattern);
        self
    }

    pub fn on_stdout(self, source: &str) -> Result<Self> {
        Ok(self.with_pattern(Pattern::stdout(source)?))
    }

    pub fn on_stderr(self, source: &str) -> Result<Self> {
        Ok(self.with_pattern(Pattern::stderr(source)?))
    }

    pub fn on_either(self, source: &str) -> Result<Self> {
        Ok(self.with_pattern(Pattern::either(source)?))
    }

    /// Append several stderr patterns at once.
    pub fn on_stderr_all(self, sources: &[&str]) -> Result<Self> {
        sources
            .iter()
            .try_fold(self, |strategy, source| strategy.on_stderr(source))
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    fn observe(&mut self, stream: Stream, text: &str) {
        // Keep the first reason recorded for this attempt.
        if self.matched_this_attempt {
            return;
        }
        self.matched_this_attempt = self.classifier.observe(stream, text);
    }
}

impl Strategy for PatternStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn about_to_run(&mut self) {
        self.matched_this_attempt = false;
        self.classifier.reset_attempt();
    }

    fn process_stdout(&mut self, text: &str) {
        self.observe(Stream::Stdout, text);
    }

    fn process_stderr(&mut self, text: &str) {
        self.observe(Stream::Stderr, text);
    }

    fn can_retry(&self) -> bool {
        !self.classifier.is_empty()
    }

    fn should_retry(&mut self) -> Option<String> {
        let reason = self.classifier.should_retry();
        if reason.is_none() && self.classifier.is_exhausted() {
            debug!(
                strategy = %self.name,
                max_matches = self.classifier.max_matches(),
                "match budget exhausted; not retrying"
            );
        }
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flaky() -> PatternStrategy {
        PatternStrategy::new("flaky")
            .on_stderr("^transient: ")
            .unwrap()
            .on_stdout("^also transient")
            .unwrap()
    }

    #[test]
    fn no_retry_without_a_match_in_the_current_attempt() {
        let mut s = flaky();
        s.about_to_run();
        s.process_stderr("transient: oops");
        assert!(s.should_retry().is_some());

        s.about_to_run();
        s.process_stderr("permanent: oops");
        assert!(s.should_retry().is_none());
    }

    #[test]
    fn first_match_of_an_attempt_is_kept() {
        let mut s = flaky();
        s.about_to_run();
        s.process_stdout("also transient, first");
        s.process_stderr("transient: second");

        let reason = s.should_retry().unwrap();
        assert!(reason.contains("also transient, first"));
        assert_eq!(s.classifier().matches_seen(), 1);
    }

    #[test]
    fn budget_is_shared_across_attempts() {
        let mut s = flaky().with_max_matches(1);

        s.about_to_run();
        s.process_stderr("transient: 1");
        assert!(s.should_retry().is_some());

        s.about_to_run();
        s.process_stderr("transient: 2");
        assert!(s.should_retry().is_none());
    }

    #[test]
    fn strategy_without_patterns_cannot_retry() {
        let mut s = PatternStrategy::new("empty");
        assert!(!s.can_retry());
        s.about_to_run();
        s.process_stderr("transient: oops");
        assert!(s.should_retry().is_none());
        assert!(flaky().can_retry());
    }

    #[test]
    fn process_dispatches_by_stream() {
        let mut s = flaky();
        s.about_to_run();
        s.process(Stream::Stdout, "transient: wrong stream");
        assert!(s.should_retry().is_none());
        s.process(Stream::Stderr, "transient: right stream");
        assert!(s.should_retry().is_some());
    }
}
