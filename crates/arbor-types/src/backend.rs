//! Network transport traits.
//!
//! The session server talks to sockets only through these traits so it can
//! be driven by the std TCP implementation or by an in-memory test double.
//! Both are polled: no call may block waiting for a peer.

use crate::error::Result;

/// Listening side of a transport.
pub trait NetworkBackend {
    /// Start listening on `address:port`. Port 0 picks a free port.
    fn listen(&mut self, address: &str, port: u16) -> Result<()>;

    /// Accept a pending connection. Returns `None` if none is waiting.
    fn accept(&mut self) -> Result<Option<Box<dyn NetworkStream>>>;

    /// Port actually bound, once listening.
    fn local_port(&self) -> Option<u16>;

    /// Stop listening. Accepted streams are unaffected.
    fn shutdown(&mut self);
}

/// A bidirectional, non-blocking byte stream.
///
/// `read` and `write` report "try again later" as an I/O error of kind
/// `WouldBlock` (see [`ArborError::is_would_block`]). `read` returning
/// `Ok(0)` means the peer closed the connection.
///
/// [`ArborError::is_would_block`]: crate::error::ArborError::is_would_block
pub trait NetworkStream: Send {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn write(&mut self, data: &[u8]) -> Result<usize>;
    fn close(&mut self) -> Result<()>;

    /// Remote address for logging.
    fn peer(&self) -> String {
        "unknown".to_string()
    }
}
