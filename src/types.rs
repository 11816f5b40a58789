use std::fmt;

/// Which output stream of a child process a piece of text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Which stream(s) a classification pattern applies to.
///
/// - `Stdout`: only text read from the child's stdout.
/// - `Stderr`: only text read from the child's stderr.
/// - `Either`: text from both streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stdout,
    Stderr,
    Either,
}

impl Channel {
    /// Whether a pattern bound to this channel should see text from `stream`.
    pub fn accepts(self, stream: Stream) -> bool {
        matches!(
            (self, stream),
            (Channel::Either, _)
                | (Channel::Stdout, Stream::Stdout)
                | (Channel::Stderr, Stream::Stderr)
        )
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Stdout => f.write_str("stdout"),
            Channel::Stderr => f.write_str("stderr"),
            Channel::Either => f.write_str("either"),
        }
    }
}
