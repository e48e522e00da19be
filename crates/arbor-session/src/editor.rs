//! Single-line edit buffer.
//!
//! Every mutating operation returns the terminal echo that brings the
//! remote display in line with the buffer, using only printable text,
//! spaces and `\x08` (cursor left). That subset works on any VT100-ish
//! client and on dumb raw-TCP clients alike.

const BACK: char = '\x08';

fn backs(n: usize) -> String {
    std::iter::repeat_n(BACK, n).collect()
}

/// Edit buffer with a cursor, in characters (not bytes).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineEditor {
    buf: Vec<char>,
    cursor: usize,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents.
    pub fn line(&self) -> String {
        self.buf.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn tail(&self) -> String {
        self.buf[self.cursor..].iter().collect()
    }

    /// Insert `ch` at the cursor.
    pub fn insert(&mut self, ch: char) -> String {
        self.buf.insert(self.cursor, ch);
        self.cursor += 1;
        let tail = self.tail();
        let mut echo = String::with_capacity(tail.len() + 4);
        echo.push(ch);
        echo.push_str(&tail);
        echo.push_str(&backs(self.buf.len() - self.cursor));
        echo
    }

    /// Remove the character before the cursor.
    pub fn backspace(&mut self) -> String {
        if self.cursor == 0 {
            return String::new();
        }
        self.cursor -= 1;
        self.buf.remove(self.cursor);
        let tail = self.tail();
        let n = self.buf.len() - self.cursor;
        format!("{BACK}{tail} {}", backs(n + 1))
    }

    /// Remove the character under the cursor.
    pub fn delete(&mut self) -> String {
        if self.cursor == self.buf.len() {
            return String::new();
        }
        self.buf.remove(self.cursor);
        let tail = self.tail();
        let n = self.buf.len() - self.cursor;
        format!("{tail} {}", backs(n + 1))
    }

    pub fn left(&mut self) -> String {
        if self.cursor == 0 {
            return String::new();
        }
        self.cursor -= 1;
        BACK.to_string()
    }

    pub fn right(&mut self) -> String {
        if self.cursor == self.buf.len() {
            return String::new();
        }
        let ch = self.buf[self.cursor];
        self.cursor += 1;
        ch.to_string()
    }

    pub fn home(&mut self) -> String {
        let echo = backs(self.cursor);
        self.cursor = 0;
        echo
    }

    pub fn end(&mut self) -> String {
        let echo = self.tail();
        self.cursor = self.buf.len();
        echo
    }

    /// Replace the whole buffer, leaving the cursor at the end.
    pub fn replace(&mut self, text: &str) -> String {
        let old_len = self.buf.len();
        let mut echo = backs(self.cursor);
        self.buf = text.chars().collect();
        self.cursor = self.buf.len();
        echo.push_str(text);
        if old_len > self.buf.len() {
            let extra = old_len - self.buf.len();
            echo.push_str(&" ".repeat(extra));
            echo.push_str(&backs(extra));
        }
        echo
    }

    /// Text that redraws the buffer after a freshly printed prompt and
    /// puts the cursor back where it was.
    pub fn render(&self) -> String {
        let mut echo = self.line();
        echo.push_str(&backs(self.buf.len() - self.cursor));
        echo
    }

    /// Take the contents and reset the buffer.
    pub fn take(&mut self) -> String {
        let line = self.line();
        self.buf.clear();
        self.cursor = 0;
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(s: &str) -> LineEditor {
        let mut ed = LineEditor::new();
        for ch in s.chars() {
            ed.insert(ch);
        }
        ed
    }

    #[test]
    fn insert_at_end_echoes_char() {
        let mut ed = LineEditor::new();
        assert_eq!(ed.insert('a'), "a");
        assert_eq!(ed.insert('b'), "b");
        assert_eq!(ed.line(), "ab");
        assert_eq!(ed.cursor(), 2);
    }

    #[test]
    fn insert_mid_line_redraws_tail() {
        let mut ed = typed("ac");
        ed.left();
        assert_eq!(ed.insert('b'), "bc\x08");
        assert_eq!(ed.line(), "abc");
        assert_eq!(ed.cursor(), 2);
    }

    #[test]
    fn backspace_at_end() {
        let mut ed = typed("ab");
        assert_eq!(ed.backspace(), "\x08 \x08");
        assert_eq!(ed.line(), "a");
    }

    #[test]
    fn backspace_mid_line() {
        let mut ed = typed("abc");
        ed.left();
        assert_eq!(ed.backspace(), "\x08c \x08\x08");
        assert_eq!(ed.line(), "ac");
        assert_eq!(ed.cursor(), 1);
    }

    #[test]
    fn backspace_at_start_is_noop() {
        let mut ed = typed("a");
        ed.home();
        assert_eq!(ed.backspace(), "");
        assert_eq!(ed.line(), "a");
    }

    #[test]
    fn delete_under_cursor() {
        let mut ed = typed("abc");
        ed.home();
        assert_eq!(ed.delete(), "bc \x08\x08\x08");
        assert_eq!(ed.line(), "bc");
        ed.end();
        assert_eq!(ed.delete(), "");
    }

    #[test]
    fn cursor_movement_is_clamped() {
        let mut ed = typed("ab");
        assert_eq!(ed.right(), "");
        assert_eq!(ed.home(), "\x08\x08");
        assert_eq!(ed.left(), "");
        assert_eq!(ed.right(), "a");
        assert_eq!(ed.end(), "b");
        assert_eq!(ed.cursor(), 2);
    }

    #[test]
    fn replace_shorter_blanks_leftovers() {
        let mut ed = typed("hello");
        assert_eq!(ed.replace("hi"), "\x08\x08\x08\x08\x08hi   \x08\x08\x08");
        assert_eq!(ed.line(), "hi");
        assert_eq!(ed.cursor(), 2);
    }

    #[test]
    fn replace_longer() {
        let mut ed = typed("a");
        assert_eq!(ed.replace("abc"), "\x08abc");
    }

    #[test]
    fn multibyte_chars_count_once() {
        let mut ed = typed("\u{00E9}t\u{00E9}");
        assert_eq!(ed.len(), 3);
        ed.backspace();
        assert_eq!(ed.line(), "\u{00E9}t");
    }

    #[test]
    fn render_restores_cursor() {
        let mut ed = typed("abc");
        ed.left();
        ed.left();
        assert_eq!(ed.render(), "abc\x08\x08");
    }

    #[test]
    fn take_resets() {
        let mut ed = typed("abc");
        assert_eq!(ed.take(), "abc");
        assert!(ed.is_empty());
        assert_eq!(ed.cursor(), 0);
    }
}
