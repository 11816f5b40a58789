// src/strategy/ssh.rs

//! Transient failures of the `ssh` client.
//!
//! Retried:
//!
//! ```text
//! ssh: Could not resolve hostname example.com: Name or service not known
//! ssh: Could not resolve hostname example.com: Temporary failure in name resolution
//! ssh: connect to host example.com port 22: No route to host
//! ssh: connect to host example.com port 22: Network is unreachable
//! ssh: connect to host example.com port 22: Connection timed out
//! ssh: connect to host example.com port 22: Connection refused
//! ```
//!
//! Every pattern is anchored at the start of the line on the `ssh:` prefix
//! and, for connection failures, at the end of the line on the OS reason.
//! Authentication, host key and remote command failures never match, even
//! when they mention a host or a connection.
//!
//! "Connection refused" is retried whatever its cause. A permanently
//! misconfigured endpoint is therefore retried until the match budget runs
//! out.

use crate::errors::Result;

use super::PatternStrategy;

pub const NAME: &str = "ssh";

/// Stderr patterns shared by every strategy that shells out over ssh.
pub const TRANSPORT_PATTERNS: &[&str] = &[
    r"^ssh: Could not resolve hostname [^:\s]+: \S",
    r"^ssh: connect to host \S+ port \d+: (?:No route to host|Network is unreachable|Connection timed out|Connection refused)\s*$",
];

/// Build a strategy named `name` preloaded with the ssh transport patterns.
pub fn transport(name: &str, max_matches: u32) -> Result<PatternStrategy> {
    PatternStrategy::new(name)
        .with_max_matches(max_matches)
        .on_stderr_all(TRANSPORT_PATTERNS)
}

pub fn strategy(max_matches: u32) -> Result<PatternStrategy> {
    transport(NAME, max_matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::DEFAULT_MAX_MATCHES;
    use crate::strategy::Strategy;

    fn retries(stderr: &str) -> bool {
        let mut s = strategy(DEFAULT_MAX_MATCHES).unwrap();
        s.about_to_run();
        for line in stderr.lines() {
            s.process_stderr(line);
        }
        s.should_retry().is_some()
    }

    #[test]
    fn network_unreachable_is_transient() {
        assert!(retries(
            "ssh: connect to host example.com port 22: Network is unreachable"
        ));
    }

    #[test]
    fn permission_denied_is_permanent() {
        assert!(!retries("ssh: Permission denied (publickey)."));
    }

    #[test]
    fn all_connection_reasons_are_transient() {
        for reason in [
            "No route to host",
            "Network is unreachable",
            "Connection timed out",
            "Connection refused",
        ] {
            let line = format!("ssh: connect to host 10.0.0.1 port 2222: {reason}\n");
            assert!(retries(&line), "expected retry for {line:?}");
        }
    }

    #[test]
    fn dns_failures_are_transient() {
        assert!(retries(
            "ssh: Could not resolve hostname codereview.example.org: Name or service not known"
        ));
        assert!(retries(
            "ssh: Could not resolve hostname codereview.example.org: Temporary failure in name resolution"
        ));
        assert!(retries(
            "ssh: Could not resolve hostname host: nodename nor servname provided, or not known"
        ));
    }

    #[test]
    fn permanent_errors_sharing_vocabulary_are_not_retried() {
        for line in [
            "Host key verification failed.",
            "ssh: connect to host example.com port 22: Permission denied",
            "ssh: connect to host example.com port 22: Connection refused by policy",
            "Connection closed by 10.0.0.1 port 22",
            "remote: error: Connection refused while talking to backend",
            "bash: ssh: connect to host example.com port 22: No route to host",
            "ssh: Could not resolve hostname",
        ] {
            assert!(!retries(line), "unexpected retry for {line:?}");
        }
    }

    #[test]
    fn stdout_is_never_classified() {
        let mut s = strategy(DEFAULT_MAX_MATCHES).unwrap();
        s.about_to_run();
        s.process_stdout("ssh: connect to host example.com port 22: Connection refused");
        assert!(s.should_retry().is_none());
    }
}
