//! Arbor runtime.
//!
//! [`EventLoop`] owns the [`Cli`](arbor_session::Cli) and drives the local
//! console plus any number of session servers from one thread.
//! [`LoopHandle`] lets other threads stop it, broadcast, or run code on it.

pub mod event_loop;
pub mod local;

pub use event_loop::{EventLoop, LoopHandle, Request};
pub use local::{Console, CrosstermConsole, LocalTerminal, map_key};
