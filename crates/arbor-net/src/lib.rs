//! Network sessions for Arbor.
//!
//! [`SessionServer`] accepts TCP clients and runs one session per
//! connection over the shared command tree, speaking either telnet
//! (character mode with server-side echo) or raw bytes.

mod server;
mod std_backend;
pub mod telnet;

pub use server::SessionServer;
pub use std_backend::{StdNetworkBackend, StdNetworkStream};
