//! Multi-session network server.
//!
//! Accepts inbound connections and gives each its own [`Session`] over the
//! shared [`Cli`]. Designed for non-blocking polling from the event loop:
//! [`SessionServer::poll`] never waits on a socket.

use std::rc::Rc;
use std::time::{Duration, Instant};

use arbor_menu::Output;
use arbor_session::{Cli, ExitAction, Session, SessionId};
use arbor_types::backend::{NetworkBackend, NetworkStream};
use arbor_types::config::{Protocol, ServerConfig};
use arbor_types::error::{ArborError, Result};

use crate::std_backend::StdNetworkBackend;
use crate::telnet::{NEGOTIATION, TelnetFilter};

/// Bytes read from one connection per read call.
const READ_CHUNK: usize = 512;

/// Reads per connection per poll, so one chatty client cannot starve the
/// others.
const MAX_READS_PER_POLL: usize = 8;

/// Unsent output allowed per connection before the client is dropped.
const MAX_OUTBOUND: usize = 64 * 1024;

/// One accepted client.
struct Connection {
    stream: Box<dyn NetworkStream>,
    session: Session,
    /// `None` in raw mode.
    telnet: Option<TelnetFilter>,
    /// Rendered output not yet accepted by the socket.
    outbound: Vec<u8>,
    last_activity: Instant,
    peer: String,
}

impl Connection {
    /// Move the session's pending output into the outbound buffer and write
    /// as much of it as the socket takes.
    ///
    /// Fails once more than [`MAX_OUTBOUND`] bytes are stuck in the buffer,
    /// which happens when the client stops reading.
    fn flush(&mut self) -> Result<()> {
        let text = self.session.take_output();
        self.outbound.extend_from_slice(text.as_bytes());
        while !self.outbound.is_empty() {
            match self.stream.write(&self.outbound) {
                Ok(0) => return Err(ArborError::Network("connection closed".to_string())),
                Ok(n) => {
                    self.outbound.drain(..n);
                },
                Err(e) if e.is_would_block() => break,
                Err(e) => return Err(e),
            }
        }
        if self.outbound.len() > MAX_OUTBOUND {
            let stuck = self.outbound.len();
            self.outbound.clear();
            return Err(ArborError::Network(format!(
                "{stuck} bytes of output not read by the client"
            )));
        }
        Ok(())
    }

    /// Best-effort final flush, then close the socket.
    fn shutdown(&mut self) {
        if let Err(e) = self.flush() {
            log::debug!("final flush to {} failed: {e}", self.peer);
        }
        if let Err(e) = self.stream.close() {
            log::debug!("close {} failed: {e}", self.peer);
        }
    }
}

/// Outcome of reading one connection during a poll.
enum ReadOutcome {
    Idle,
    Data,
    Closed,
}

/// Serves the command tree to network clients.
pub struct SessionServer {
    config: ServerConfig,
    backend: Box<dyn NetworkBackend>,
    connections: Vec<Connection>,
    listening: bool,
    exit_action: Option<ExitAction>,
}

impl SessionServer {
    pub fn new(config: ServerConfig, backend: Box<dyn NetworkBackend>) -> Self {
        Self {
            config,
            backend,
            connections: Vec::new(),
            listening: false,
            exit_action: None,
        }
    }

    /// Server over plain TCP sockets.
    pub fn tcp(config: ServerConfig) -> Self {
        Self::new(config, Box::new(StdNetworkBackend::new()))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Start listening on the configured address and port.
    pub fn start(&mut self) -> Result<()> {
        self.backend.listen(&self.config.address, self.config.port)?;
        self.listening = true;
        log::info!(
            "session server listening on {}:{} ({:?})",
            self.config.address,
            self.local_port().unwrap_or(self.config.port),
            self.config.protocol
        );
        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Port actually bound (differs from the config when it asked for 0).
    pub fn local_port(&self) -> Option<u16> {
        self.backend.local_port()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Action run for every disconnecting network session, before the
    /// Cli-wide exit action.
    pub fn set_exit_action<F>(&mut self, action: F)
    where
        F: Fn(&mut Output) + 'static,
    {
        self.exit_action = Some(Rc::new(action));
    }

    /// Accept new clients and service every connection once.
    ///
    /// Returns the number of events handled (accepts plus reads), so the
    /// caller can tell an idle poll from a busy one.
    pub fn poll(&mut self, cli: &Cli) -> usize {
        if !self.listening {
            return 0;
        }
        let mut work = self.accept_pending(cli);

        let idle_timeout = Duration::from_secs(self.config.idle_timeout_secs);
        let mut to_remove = Vec::new();
        for (idx, conn) in self.connections.iter_mut().enumerate() {
            if self.config.idle_timeout_secs > 0 && conn.last_activity.elapsed() > idle_timeout {
                log::debug!("{} idle for {}s, closing", conn.peer, idle_timeout.as_secs());
                conn.session.deliver(cli, "Idle timeout. Goodbye.");
                conn.session.close(cli);
                to_remove.push(idx);
                continue;
            }

            match read_connection(conn, cli) {
                ReadOutcome::Idle => {},
                ReadOutcome::Data => work += 1,
                ReadOutcome::Closed => {
                    work += 1;
                    to_remove.push(idx);
                    continue;
                },
            }

            if let Err(e) = conn.flush() {
                log::debug!("write to {} failed: {e}", conn.peer);
                conn.session.close(cli);
                to_remove.push(idx);
                continue;
            }
            if conn.session.is_closed() {
                to_remove.push(idx);
            }
        }

        for idx in to_remove.into_iter().rev() {
            let mut conn = self.connections.remove(idx);
            conn.shutdown();
            log::info!("{} disconnected", conn.peer);
        }
        work
    }

    fn accept_pending(&mut self, cli: &Cli) -> usize {
        let mut accepted = 0;
        loop {
            let mut stream = match self.backend.accept() {
                Ok(Some(stream)) => stream,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("accept error: {e}");
                    break;
                },
            };
            accepted += 1;
            let peer = stream.peer();

            if self.connections.len() >= self.config.max_connections {
                log::warn!("rejecting {peer}: too many connections");
                if let Err(e) = stream.write(b"too many connections\r\n") {
                    log::debug!("rejection notice to {peer} failed: {e}");
                }
                if let Err(e) = stream.close() {
                    log::debug!("close {peer} failed: {e}");
                }
                continue;
            }

            let mut session = Session::new(cli);
            if let Some(action) = &self.exit_action {
                session.set_exit_action(Rc::clone(action));
            }
            let telnet = match self.config.protocol {
                Protocol::Telnet => Some(TelnetFilter::new()),
                Protocol::Raw => {
                    session.set_echo(false);
                    None
                },
            };
            let mut outbound = Vec::new();
            if telnet.is_some() {
                outbound.extend_from_slice(&NEGOTIATION);
            }
            session.start(cli, self.config.welcome.as_deref());

            log::info!("session {} connected from {peer}", session.id());
            let mut conn = Connection {
                stream,
                session,
                telnet,
                outbound,
                last_activity: Instant::now(),
                peer,
            };
            if let Err(e) = conn.flush() {
                log::debug!("greeting {} failed: {e}", conn.peer);
                conn.session.close(cli);
                conn.shutdown();
                continue;
            }
            self.connections.push(conn);
        }
        accepted
    }

    /// Show broadcast text on every connected session.
    pub fn deliver(&mut self, cli: &Cli, text: &str) {
        for conn in &mut self.connections {
            deliver_one(conn, cli, text);
        }
    }

    /// Whether session `id` belongs to one of this server's connections.
    pub fn owns(&self, id: SessionId) -> bool {
        self.connections.iter().any(|c| c.session.id() == id)
    }

    /// Show broadcast text on session `id` only. Returns `false` if this
    /// server does not hold that session.
    pub fn deliver_to(&mut self, cli: &Cli, id: SessionId, text: &str) -> bool {
        let Some(conn) = self.connections.iter_mut().find(|c| c.session.id() == id) else {
            return false;
        };
        deliver_one(conn, cli, text);
        true
    }

    /// Close every session (running exit actions) and stop listening.
    pub fn stop(&mut self, cli: &Cli) {
        for conn in &mut self.connections {
            conn.session.close(cli);
            conn.shutdown();
        }
        let closed = self.connections.len();
        self.connections.clear();
        if self.listening {
            self.backend.shutdown();
            self.listening = false;
            log::info!("session server stopped ({closed} session(s) closed)");
        }
    }
}

/// Broadcast to one connection. A failed write closes the session; the
/// next poll removes the connection.
fn deliver_one(conn: &mut Connection, cli: &Cli, text: &str) {
    conn.session.deliver(cli, text);
    if let Err(e) = conn.flush() {
        log::debug!("broadcast to {} failed: {e}", conn.peer);
        conn.session.close(cli);
    }
}

/// Drain readable bytes from one connection into its session.
fn read_connection(conn: &mut Connection, cli: &Cli) -> ReadOutcome {
    let mut outcome = ReadOutcome::Idle;
    let mut buf = [0u8; READ_CHUNK];
    for _ in 0..MAX_READS_PER_POLL {
        match conn.stream.read(&mut buf) {
            Ok(0) => {
                log::debug!("{} closed the connection", conn.peer);
                conn.session.close(cli);
                return ReadOutcome::Closed;
            },
            Ok(n) => {
                conn.last_activity = Instant::now();
                outcome = ReadOutcome::Data;
                let data = match conn.telnet.as_mut() {
                    Some(filter) => filter.filter(&buf[..n]),
                    None => buf[..n].to_vec(),
                };
                conn.session.feed_bytes(cli, &data);
                if conn.session.is_closed() {
                    return ReadOutcome::Data;
                }
            },
            Err(e) if e.is_would_block() => break,
            Err(e) => {
                log::debug!("read from {} failed: {e}", conn.peer);
                conn.session.close(cli);
                return ReadOutcome::Closed;
            },
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_listening_by_default() {
        let server = SessionServer::tcp(ServerConfig::default());
        assert!(!server.is_listening());
        assert_eq!(server.connection_count(), 0);
    }

    #[test]
    fn poll_before_start_does_nothing() {
        let cli = Cli::new(arbor_menu::Menu::new("cli"));
        let mut server = SessionServer::tcp(ServerConfig::default());
        assert_eq!(server.poll(&cli), 0);
    }
}
