//! Engine configuration.
//!
//! Loaded from a TOML file. Every section and field is optional; missing
//! values fall back to the defaults below.
//!
//! ```toml
//! [history]
//! max_depth = 100
//! path = ".arbor_history"
//!
//! [server]
//! enabled = true
//! address = "127.0.0.1"
//! port = 5000
//! protocol = "telnet"
//!
//! [event_loop]
//! poll_interval_ms = 10
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ArborError, Result};

/// Default number of history entries retained.
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// Default listen port for the session server.
pub const DEFAULT_PORT: u16 = 5000;

/// Default maximum simultaneous network sessions.
pub const DEFAULT_MAX_CONNECTIONS: usize = 16;

/// Default event loop sleep when a turn did no work.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArborConfig {
    pub history: HistoryConfig,
    pub server: ServerConfig,
    pub local: LocalConfig,
    pub event_loop: EventLoopConfig,
}

/// Command history settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of retained entries (oldest evicted first).
    pub max_depth: usize,
    /// Backing file. `None` keeps history in memory only.
    pub path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_HISTORY_DEPTH,
            path: None,
        }
    }
}

/// Line discipline spoken by the session server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Telnet: negotiate character mode + server echo, strip IAC sequences.
    Telnet,
    /// Plain bytes, no negotiation.
    Raw,
}

/// Network session server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Whether the application should start a server at all.
    pub enabled: bool,
    /// Address to bind.
    pub address: String,
    /// Port to bind (0 = pick a free port).
    pub port: u16,
    pub protocol: Protocol,
    /// Maximum simultaneous sessions.
    pub max_connections: usize,
    /// Idle session timeout in seconds (0 = no timeout).
    pub idle_timeout_secs: u64,
    /// Banner written to every new connection before the first prompt.
    pub welcome: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            protocol: Protocol::Telnet,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            idle_timeout_secs: 0,
            welcome: None,
        }
    }
}

/// Local console settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Attach the process's own terminal as a session.
    pub enabled: bool,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventLoopConfig {
    /// Sleep between turns that found nothing to do.
    pub poll_interval_ms: u64,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl ArborConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ArborConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ArborError::Config(format!("{}: {e}", path.display())))?;
        log::debug!("loaded config from {}", path.display());
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.history.max_depth == 0 {
            return Err(ArborError::Config(
                "history.max_depth must be at least 1".to_string(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(ArborError::Config(
                "server.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
