// src/classify/lines.rs

/// Splits a byte stream into lines for classification.
///
/// Process output arrives in arbitrary chunks; patterns are written against
/// whole lines. Carriage returns also end a line so progress meters that
/// redraw in place do not glue onto the message that follows them.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed `bytes` and return every line they complete, terminator included.
    ///
    /// Blank lines are dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            self.pending.push(b);
            if b == b'\n' || b == b'\r' {
                if let Some(line) = self.take() {
                    lines.push(line);
                }
            }
        }
        lines
    }

    /// Return the trailing unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        if line.trim().is_empty() {
            None
        } else {
            Some(line)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_reassembled_across_chunks() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"fatal: The remote ").is_empty());
        assert_eq!(
            buf.push(b"end hung up unexpectedly\nnext"),
            vec!["fatal: The remote end hung up unexpectedly\n".to_string()]
        );
        assert_eq!(buf.finish(), Some("next".to_string()));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn carriage_returns_split_progress_output() {
        let mut buf = LineBuffer::new();
        let lines = buf.push(b"Receiving objects:  50%\rReceiving objects: 100%\r\nfatal: boom\n");
        assert_eq!(
            lines,
            vec![
                "Receiving objects:  50%\r".to_string(),
                "Receiving objects: 100%\r".to_string(),
                "fatal: boom\n".to_string(),
            ]
        );
    }
}
