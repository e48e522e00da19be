//! Interactive sessions over an Arbor command tree.
//!
//! A [`Cli`] bundles the tree with the state every session shares
//! (history, exit and error hooks, broadcast queue, live-session registry).
//! A [`Session`] turns keys or raw bytes into edited lines and dispatches
//! them against its current menu.

pub mod cli;
pub mod decoder;
pub mod editor;
pub mod history;
pub mod session;

pub use cli::{Broadcaster, Cli, ErrorHandler, ExitAction, SessionId, SessionRegistry};
pub use decoder::KeyDecoder;
pub use editor::LineEditor;
pub use history::{FileHistory, HistoryError, HistoryStore, MemoryHistory};
pub use session::{Session, SessionState};
