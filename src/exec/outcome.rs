// src/exec/outcome.rs

use std::borrow::Cow;
use std::fmt;

use crate::types::Stream;

/// How a process attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    /// Exited normally with this code.
    Exited(i32),
    /// Terminated by a signal.
    Signaled { signal: i32, core_dumped: bool },
    /// The process could not be started at all.
    NotStarted(String),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Exited(0))
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Exited(code) => Some(*code),
            _ => None,
        }
    }

    pub fn signal(&self) -> Option<i32> {
        match self {
            ExitStatus::Signaled { signal, .. } => Some(*signal),
            _ => None,
        }
    }

    /// POSIX wait-status encoding: `code << 8` for a normal exit, the signal
    /// number (plus `0x80` if core was dumped) for a signal, `-1` if the
    /// process never started.
    pub fn raw(&self) -> i32 {
        match self {
            ExitStatus::Exited(code) => (code & 0xff) << 8,
            ExitStatus::Signaled {
                signal,
                core_dumped,
            } => (signal & 0x7f) | if *core_dumped { 0x80 } else { 0 },
            ExitStatus::NotStarted(_) => -1,
        }
    }

    /// Conventional shell exit code for this status.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitStatus::Exited(code) => *code,
            ExitStatus::Signaled { signal, .. } => 128 + signal,
            ExitStatus::NotStarted(_) => 127,
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    #[cfg(unix)]
    fn from(status: std::process::ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;

        match (status.code(), status.signal()) {
            (Some(code), _) => ExitStatus::Exited(code),
            (None, Some(signal)) => ExitStatus::Signaled {
                signal,
                core_dumped: status.core_dumped(),
            },
            (None, None) => ExitStatus::Exited(-1),
        }
    }

    #[cfg(not(unix))]
    fn from(status: std::process::ExitStatus) -> Self {
        ExitStatus::Exited(status.code().unwrap_or(-1))
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit code {code}"),
            ExitStatus::Signaled {
                signal,
                core_dumped: true,
            } => write!(f, "signal {signal} (core dumped)"),
            ExitStatus::Signaled { signal, .. } => write!(f, "signal {signal}"),
            ExitStatus::NotStarted(reason) => write!(f, "not started: {reason}"),
        }
    }
}

/// One piece of output, exactly as read from the child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: Stream,
    pub bytes: Vec<u8>,
}

impl OutputChunk {
    pub fn new(stream: Stream, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            stream,
            bytes: bytes.into(),
        }
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Result of one attempt: its status plus every output chunk in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    status: ExitStatus,
    chunks: Vec<OutputChunk>,
}

impl ProcessOutcome {
    pub fn new(status: ExitStatus, chunks: Vec<OutputChunk>) -> Self {
        Self { status, chunks }
    }

    pub fn status(&self) -> &ExitStatus {
        &self.status
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn chunks(&self) -> &[OutputChunk] {
        &self.chunks
    }

    pub fn stdout_bytes(&self) -> Vec<u8> {
        self.stream_bytes(Stream::Stdout)
    }

    pub fn stderr_bytes(&self) -> Vec<u8> {
        self.stream_bytes(Stream::Stderr)
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout_bytes()).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr_bytes()).into_owned()
    }

    fn stream_bytes(&self, stream: Stream) -> Vec<u8> {
        self.chunks
            .iter()
            .filter(|c| c.stream == stream)
            .flat_map(|c| c.bytes.iter().copied())
            .collect()
    }
}
