//! Platform-agnostic key events.
//!
//! Both the byte-stream decoder (network sessions) and the local console
//! backend map their native input to this enum. The line editor never sees
//! raw escape sequences or terminal events.

/// A single editing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Printable character.
    Char(char),
    /// Cursor left.
    Left,
    /// Cursor right.
    Right,
    /// Recall the previous (older) history entry.
    Up,
    /// Recall the next (newer) history entry.
    Down,
    /// Jump to the start of the line.
    Home,
    /// Jump to the end of the line.
    End,
    /// Delete the character before the cursor.
    Backspace,
    /// Delete the character under the cursor.
    Delete,
    /// Complete the current token.
    Tab,
    /// Accept the line.
    Enter,
    /// Discard the current line (Ctrl-C).
    Cancel,
    /// End of input (Ctrl-D or stream closed).
    Eof,
}

impl Key {
    /// Whether the key inserts text into the buffer.
    pub fn is_printable(&self) -> bool {
        matches!(self, Key::Char(c) if !c.is_control())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_chars() {
        assert!(Key::Char('a').is_printable());
        assert!(Key::Char(' ').is_printable());
        assert!(Key::Char('\u{00E9}').is_printable());
    }

    #[test]
    fn control_chars_not_printable() {
        assert!(!Key::Char('\u{7}').is_printable());
        assert!(!Key::Enter.is_printable());
        assert!(!Key::Tab.is_printable());
    }

    #[test]
    fn key_equality() {
        assert_eq!(Key::Char('x'), Key::Char('x'));
        assert_ne!(Key::Up, Key::Down);
    }
}
