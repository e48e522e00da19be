//! Byte stream to [`Key`] decoder.
//!
//! Understands the VT100/xterm sequences needed for single-line editing
//! (arrows, home/end, delete) and assembles UTF-8 characters that arrive
//! split across reads. Everything else is dropped.

use arbor_types::key::Key;

/// Longest CSI parameter string we keep before giving up on a sequence.
const MAX_CSI_PARAMS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Ground,
    /// Just saw CR: swallow a following LF or NUL.
    AfterCr,
    Escape,
    Csi(String),
    Ss3,
    Utf8 { buf: Vec<u8>, need: usize },
}

/// Incremental decoder; keeps partial sequences between calls.
#[derive(Debug, Clone)]
pub struct KeyDecoder {
    state: State,
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Ground,
        }
    }

    /// Decode a chunk of input.
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<Key> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }

    /// Feed one byte, returning a key once one is complete.
    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match std::mem::replace(&mut self.state, State::Ground) {
            State::Ground => self.ground(byte),
            State::AfterCr => match byte {
                b'\n' | 0 => None,
                _ => self.ground(byte),
            },
            State::Escape => match byte {
                b'[' => {
                    self.state = State::Csi(String::new());
                    None
                },
                b'O' => {
                    self.state = State::Ss3;
                    None
                },
                _ => None,
            },
            State::Csi(mut params) => match byte {
                b'0'..=b'9' | b';' if params.len() < MAX_CSI_PARAMS => {
                    params.push(byte as char);
                    self.state = State::Csi(params);
                    None
                },
                0x40..=0x7e => csi_key(&params, byte),
                _ => None,
            },
            State::Ss3 => match byte {
                b'A' => Some(Key::Up),
                b'B' => Some(Key::Down),
                b'C' => Some(Key::Right),
                b'D' => Some(Key::Left),
                b'H' => Some(Key::Home),
                b'F' => Some(Key::End),
                _ => None,
            },
            State::Utf8 { mut buf, need } => {
                if byte & 0xC0 != 0x80 {
                    // Broken sequence: drop it and reinterpret this byte.
                    return self.ground(byte);
                }
                buf.push(byte);
                if buf.len() < need {
                    self.state = State::Utf8 { buf, need };
                    return None;
                }
                std::str::from_utf8(&buf)
                    .ok()
                    .and_then(|s| s.chars().next())
                    .map(Key::Char)
            },
        }
    }

    fn ground(&mut self, byte: u8) -> Option<Key> {
        match byte {
            0x1b => {
                self.state = State::Escape;
                None
            },
            b'\r' => {
                self.state = State::AfterCr;
                Some(Key::Enter)
            },
            b'\n' => Some(Key::Enter),
            b'\t' => Some(Key::Tab),
            0x7f | 0x08 => Some(Key::Backspace),
            0x01 => Some(Key::Home),
            0x03 => Some(Key::Cancel),
            0x04 => Some(Key::Eof),
            0x05 => Some(Key::End),
            0x20..=0x7e => Some(Key::Char(byte as char)),
            0xC2..=0xDF => self.start_utf8(byte, 2),
            0xE0..=0xEF => self.start_utf8(byte, 3),
            0xF0..=0xF4 => self.start_utf8(byte, 4),
            _ => None,
        }
    }

    fn start_utf8(&mut self, byte: u8, need: usize) -> Option<Key> {
        self.state = State::Utf8 {
            buf: vec![byte],
            need,
        };
        None
    }
}

fn csi_key(params: &str, final_byte: u8) -> Option<Key> {
    match (params, final_byte) {
        (_, b'A') => Some(Key::Up),
        (_, b'B') => Some(Key::Down),
        (_, b'C') => Some(Key::Right),
        (_, b'D') => Some(Key::Left),
        (_, b'H') => Some(Key::Home),
        (_, b'F') => Some(Key::End),
        ("1" | "7", b'~') => Some(Key::Home),
        ("4" | "8", b'~') => Some(Key::End),
        ("3", b'~') => Some(Key::Delete),
        _ => None,
    }
}
