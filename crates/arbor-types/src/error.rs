//! Error types for Arbor.

use std::io;

/// Errors produced by the Arbor runtime (I/O, configuration, networking).
///
/// Registration, dispatch and history failures have their own enums next to
/// the code that raises them; this type covers the engine plumbing.
#[derive(Debug, thiserror::Error)]
pub enum ArborError {
    #[error("config error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ArborError {
    /// Whether this is an I/O error of kind `WouldBlock`.
    ///
    /// Non-blocking sockets report "no data yet" this way.
    pub fn is_would_block(&self) -> bool {
        matches!(self, ArborError::Io(e) if e.kind() == io::ErrorKind::WouldBlock)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ArborError>;
