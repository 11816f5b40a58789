#![allow(dead_code)]

use reliable::exec::{ExitStatus, OutputChunk};
use reliable::types::Stream;

use crate::scripted_backend::ScriptedAttempt;

/// Builder for `ScriptedAttempt` to simplify test setup.
pub struct AttemptBuilder {
    chunks: Vec<OutputChunk>,
    status: ExitStatus,
}

impl AttemptBuilder {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            status: ExitStatus::Exited(0),
        }
    }

    pub fn stdout(mut self, text: &str) -> Self {
        self.chunks.push(OutputChunk::new(Stream::Stdout, text));
        self
    }

    pub fn stderr(mut self, text: &str) -> Self {
        self.chunks.push(OutputChunk::new(Stream::Stderr, text));
        self
    }

    pub fn exit(mut self, code: i32) -> Self {
        self.status = ExitStatus::Exited(code);
        self
    }

    pub fn signal(mut self, signal: i32) -> Self {
        self.status = ExitStatus::Signaled {
            signal,
            core_dumped: false,
        };
        self
    }

    pub fn not_started(mut self, reason: &str) -> Self {
        self.status = ExitStatus::NotStarted(reason.to_string());
        self
    }

    pub fn build(self) -> ScriptedAttempt {
        ScriptedAttempt {
            chunks: self.chunks,
            status: self.status,
        }
    }
}

impl Default for AttemptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Exit 0 with no output.
pub fn success() -> ScriptedAttempt {
    AttemptBuilder::new().build()
}

/// The canonical transient ssh failure.
pub fn ssh_unreachable() -> ScriptedAttempt {
    AttemptBuilder::new()
        .stderr("ssh: connect to host example.com port 22: Network is unreachable\n")
        .exit(255)
        .build()
}

/// A permanent ssh failure.
pub fn ssh_denied() -> ScriptedAttempt {
    AttemptBuilder::new()
        .stderr("ssh: Permission denied (publickey).\n")
        .exit(255)
        .build()
}
