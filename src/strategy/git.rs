// src/strategy/git.rs

//! Transient failures of the `git` client.
//!
//! Git may talk to its remote over ssh, so every [`super::ssh`] pattern is
//! included first. On top of those, git's own transports are retried when
//! they report:
//!
//! ```text
//! fatal: the remote end hung up unexpectedly
//! fatal: unable to look up example.com (port 9418) (Name or service not known)
//! fatal: unable to connect a socket (Connection timed out)
//! example.com[0: 192.0.2.1]: errno=Connection refused
//! ```
//!
//! "The remote end hung up unexpectedly" is also printed after some
//! permanent failures (e.g. a missing repository over ssh). Those are
//! retried until the match budget runs out.

use crate::errors::Result;

use super::PatternStrategy;
use super::ssh;

pub const NAME: &str = "git";

pub const NATIVE_PATTERNS: &[&str] = &[
    r"^fatal: [Tt]he remote end hung up unexpectedly\s*$",
    r"^fatal: [Uu]nable to look up \S+ \(port \d+\) \(.+\)\s*$",
    r"^fatal: unable to connect a socket \(.+\)\s*$",
    r"^\S+\[\d+: [^\]]+\]: errno=(?:Connection refused|Connection timed out|No route to host|Network is unreachable)\s*$",
];

pub fn strategy(max_matches: u32) -> Result<PatternStrategy> {
    ssh::transport(NAME, max_matches)?.on_stderr_all(NATIVE_PATTERNS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::DEFAULT_MAX_MATCHES;
    use crate::strategy::Strategy;

    fn reason_for(stderr: &str) -> Option<String> {
        let mut s = strategy(DEFAULT_MAX_MATCHES).unwrap();
        s.about_to_run();
        for line in stderr.split_inclusive('\n') {
            s.process_stderr(line);
        }
        s.should_retry()
    }

    #[test]
    fn ssh_failures_are_inherited() {
        let reason = reason_for(
            "ssh: connect to host codereview.example.org port 29418: Connection refused\n\
             fatal: Could not read from remote repository.\n",
        )
        .unwrap();
        assert!(reason.contains("ssh: connect to host"));
    }

    #[test]
    fn native_transport_failures_are_transient() {
        for stderr in [
            "fatal: The remote end hung up unexpectedly\n",
            "fatal: the remote end hung up unexpectedly\n",
            "fatal: unable to look up git.example.org (port 9418) (Name or service not known)\n",
            "fatal: Unable to look up git.example.org (port 9418) (Temporary failure in name resolution)\n",
            "fatal: unable to connect a socket (Connection timed out)\n",
            "fatal: unable to connect to git.example.org:\ngit.example.org[0: 192.0.2.1]: errno=Connection refused\n",
        ] {
            assert!(reason_for(stderr).is_some(), "expected retry for {stderr:?}");
        }
    }

    #[test]
    fn permanent_git_errors_are_not_retried() {
        for stderr in [
            "fatal: repository 'https://example.org/missing.git/' not found\n",
            "error: pathspec 'nope' did not match any file(s) known to git\n",
            "fatal: Authentication failed for 'https://example.org/repo.git/'\n",
            "CONFLICT (content): Merge conflict in README\n",
            "error: The remote end hung up unexpectedly, said the test fixture\n",
        ] {
            assert!(reason_for(stderr).is_none(), "unexpected retry for {stderr:?}");
        }
    }

    #[test]
    fn ssh_patterns_are_tried_before_native_ones() {
        let s = strategy(DEFAULT_MAX_MATCHES).unwrap();
        let sources: Vec<&str> = s.classifier().patterns().iter().map(|p| p.as_str()).collect();
        assert_eq!(&sources[..ssh::TRANSPORT_PATTERNS.len()], ssh::TRANSPORT_PATTERNS);
        assert_eq!(&sources[ssh::TRANSPORT_PATTERNS.len()..], NATIVE_PATTERNS);
    }
}
