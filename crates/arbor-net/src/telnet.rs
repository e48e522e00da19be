//! Minimal telnet option handling.
//!
//! The server asks the client for character-at-a-time mode with remote echo
//! and then strips every command the client sends. No option is tracked.

pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const SE: u8 = 240;

pub const OPT_ECHO: u8 = 1;
pub const OPT_SGA: u8 = 3;
pub const OPT_LINEMODE: u8 = 34;

/// Sent on connect: we echo, we suppress go-ahead, client must not do
/// line mode.
pub const NEGOTIATION: [u8; 9] = [
    IAC,
    WILL,
    OPT_ECHO,
    IAC,
    WILL,
    OPT_SGA,
    IAC,
    DONT,
    OPT_LINEMODE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    Iac,
    /// After WILL/WONT/DO/DONT: one option byte follows.
    Option,
    Sub,
    SubIac,
}

/// Removes telnet commands from an inbound byte stream.
#[derive(Debug, Clone)]
pub struct TelnetFilter {
    state: State,
}

impl Default for TelnetFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self { state: State::Data }
    }

    /// Return the data bytes of `input`. Partial commands carry over to
    /// the next call.
    pub fn filter(&mut self, input: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(input.len());
        for &b in input {
            self.state = match (self.state, b) {
                (State::Data, IAC) => State::Iac,
                (State::Data, _) => {
                    data.push(b);
                    State::Data
                },
                (State::Iac, IAC) => {
                    data.push(IAC);
                    State::Data
                },
                (State::Iac, WILL | WONT | DO | DONT) => State::Option,
                (State::Iac, SB) => State::Sub,
                (State::Iac, _) => State::Data,
                (State::Option, _) => State::Data,
                (State::Sub, IAC) => State::SubIac,
                (State::Sub, _) => State::Sub,
                (State::SubIac, SE) => State::Data,
                (State::SubIac, _) => State::Sub,
            };
        }
        data
    }
}
