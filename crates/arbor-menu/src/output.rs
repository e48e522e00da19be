//! Handler output buffer.

use std::fmt;

/// Text written by a command handler.
///
/// Handlers use `write!`/`writeln!` on it. The session flushes the buffer to
/// its stream once the handler returns, translating `\n` to the stream's
/// line ending.
#[derive(Debug, Default, Clone)]
pub struct Output {
    text: String,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw text.
    pub fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
    }

    /// Append `s` followed by a newline.
    pub fn line(&mut self, s: &str) {
        self.text.push_str(s);
        self.text.push('\n');
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Take the accumulated text, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}

impl fmt::Write for Output {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.text.push_str(s);
        Ok(())
    }
}
