//! [`NetworkBackend`] over `std::net`, with every socket non-blocking.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};

use arbor_types::backend::{NetworkBackend, NetworkStream};
use arbor_types::error::{ArborError, Result};

/// TCP listener backend.
#[derive(Debug, Default)]
pub struct StdNetworkBackend {
    listener: Option<TcpListener>,
}

impl StdNetworkBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NetworkBackend for StdNetworkBackend {
    fn listen(&mut self, address: &str, port: u16) -> Result<()> {
        let listener = TcpListener::bind((address, port))
            .map_err(|e| ArborError::Network(format!("bind {address}:{port}: {e}")))?;
        listener.set_nonblocking(true)?;
        self.listener = Some(listener);
        Ok(())
    }

    fn accept(&mut self) -> Result<Option<Box<dyn NetworkStream>>> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| ArborError::Network("not listening".to_string()))?;
        match listener.accept() {
            Ok((stream, addr)) => {
                stream.set_nonblocking(true)?;
                stream.set_nodelay(true)?;
                Ok(Some(Box::new(StdNetworkStream {
                    stream,
                    peer: addr.to_string(),
                })))
            },
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn local_port(&self) -> Option<u16> {
        self.listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
            .map(|a| a.port())
    }

    fn shutdown(&mut self) {
        self.listener = None;
    }
}

/// Accepted TCP connection.
#[derive(Debug)]
pub struct StdNetworkStream {
    stream: TcpStream,
    peer: String,
}

impl NetworkStream for StdNetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.stream.read(buf)?)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.stream.write(data)?)
    }

    fn close(&mut self) -> Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Peer already gone.
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }
}
