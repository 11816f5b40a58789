// src/strategy/scp.rs

//! Transient failures of the `scp` client.
//!
//! `scp` runs over ssh and reports the same transport failures, verbatim,
//! with the `ssh:` prefix. See [`super::ssh`] for the list.

use crate::errors::Result;

use super::PatternStrategy;
use super::ssh;

pub const NAME: &str = "scp";

pub fn strategy(max_matches: u32) -> Result<PatternStrategy> {
    ssh::transport(NAME, max_matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::DEFAULT_MAX_MATCHES;
    use crate::strategy::Strategy;

    #[test]
    fn scp_classifies_like_ssh() {
        let mut s = strategy(DEFAULT_MAX_MATCHES).unwrap();
        assert_eq!(s.name(), "scp");

        s.about_to_run();
        s.process_stderr("ssh: connect to host files.example.com port 22: Connection timed out\n");
        s.process_stderr("lost connection\n");
        let reason = s.should_retry().unwrap();
        assert!(reason.contains("Connection timed out"));

        s.about_to_run();
        s.process_stderr("scp: /srv/missing.tar: No such file or directory\n");
        assert!(s.should_retry().is_none());
    }
}
