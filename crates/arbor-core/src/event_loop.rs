//! Single-thread scheduler driving every session.
//!
//! Each turn drains cross-thread requests, polls the local console and
//! every server without blocking, then delivers queued broadcasts. A turn
//! that found no work sleeps for the poll interval; nothing else ever
//! waits.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use arbor_net::SessionServer;
use arbor_session::{Cli, SessionId};
use arbor_types::config::EventLoopConfig;
use arbor_types::error::{ArborError, Result};

use crate::local::LocalTerminal;

/// Work posted to the loop from any thread.
pub enum Request {
    Stop,
    Broadcast(String),
    /// Run a closure on the scheduler thread with access to the Cli.
    Run(Box<dyn FnOnce(&Cli) + Send>),
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Request::Stop => f.write_str("Stop"),
            Request::Broadcast(text) => f.debug_tuple("Broadcast").field(text).finish(),
            Request::Run(_) => f.write_str("Run(..)"),
        }
    }
}

/// Thread-safe handle for talking to a running [`EventLoop`].
#[derive(Debug, Clone)]
pub struct LoopHandle {
    tx: Sender<Request>,
}

impl LoopHandle {
    fn send(&self, request: Request) -> Result<()> {
        self.tx
            .send(request)
            .map_err(|_| ArborError::Session("event loop has exited".to_string()))
    }

    /// Ask the loop to shut down after the current turn.
    pub fn stop(&self) -> Result<()> {
        self.send(Request::Stop)
    }

    /// Write a line to every live session.
    pub fn broadcast(&self, text: impl Into<String>) -> Result<()> {
        self.send(Request::Broadcast(text.into()))
    }

    /// Run `f` on the scheduler thread.
    pub fn run<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&Cli) + Send + 'static,
    {
        self.send(Request::Run(Box::new(f)))
    }
}

pub struct EventLoop {
    cli: Cli,
    local: Option<LocalTerminal>,
    servers: Vec<SessionServer>,
    poll_interval: Duration,
    tx: Sender<Request>,
    rx: Receiver<Request>,
    running: bool,
    /// Set by a stop request; the current turn finishes first.
    stopping: bool,
}

impl EventLoop {
    pub fn new(cli: Cli) -> Self {
        Self::with_config(cli, &EventLoopConfig::default())
    }

    pub fn with_config(cli: Cli, config: &EventLoopConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            cli,
            local: None,
            servers: Vec::new(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            tx,
            rx,
            running: false,
            stopping: false,
        }
    }

    pub fn cli(&self) -> &Cli {
        &self.cli
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Attach the local console and print its first prompt.
    pub fn attach_local(&mut self, mut local: LocalTerminal) -> Result<()> {
        local.attach(&self.cli)?;
        self.local = Some(local);
        Ok(())
    }

    /// Add a session server, starting it if needed.
    pub fn attach_server(&mut self, mut server: SessionServer) -> Result<()> {
        if !server.is_listening() {
            server.start()?;
        }
        self.servers.push(server);
        Ok(())
    }

    pub fn servers(&self) -> &[SessionServer] {
        &self.servers
    }

    /// Run until stopped, then shut every session down.
    pub fn run(&mut self) -> Result<()> {
        self.running = true;
        self.stopping = false;
        log::info!(
            "event loop started ({} server(s), local console: {})",
            self.servers.len(),
            self.local.is_some()
        );
        while !self.stopping {
            if self.turn() == 0 && !self.stopping {
                std::thread::sleep(self.poll_interval);
            }
        }
        self.shutdown();
        Ok(())
    }

    /// One scheduling pass. Returns the amount of work done.
    ///
    /// [`EventLoop::run`] calls this repeatedly; tests and embedders with
    /// their own main loop may call it directly.
    pub fn turn(&mut self) -> usize {
        let mut work = self.drain_requests();
        if self.stopping {
            return work;
        }

        if let Some(local) = self.local.as_mut() {
            match local.poll(&self.cli) {
                Ok(n) => work += n,
                Err(e) => {
                    log::warn!("local console failed: {e}");
                    if let Err(e) = local.close(&self.cli) {
                        log::warn!("local console close failed: {e}");
                    }
                },
            }
            if local.is_closed() {
                self.local = None;
                if self.servers.is_empty() {
                    log::info!("local session closed and no servers attached");
                    self.stopping = true;
                }
            }
        }

        for server in &mut self.servers {
            work += server.poll(&self.cli);
        }

        work + self.deliver_broadcasts()
    }

    fn drain_requests(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(request) = self.rx.try_recv() {
            handled += 1;
            log::debug!("loop request: {request:?}");
            match request {
                Request::Stop => self.stopping = true,
                Request::Broadcast(text) => self.cli.broadcaster().write_line(text),
                Request::Run(f) => f(&self.cli),
            }
        }
        handled
    }

    /// Deliver queued lines to every live session in registration order.
    fn deliver_broadcasts(&mut self) -> usize {
        let lines = self.cli.broadcaster().drain();
        for text in &lines {
            for id in self.cli.live_sessions() {
                self.deliver_to(id, text);
            }
        }
        lines.len()
    }

    fn deliver_to(&mut self, id: SessionId, text: &str) {
        if let Some(local) = self.local.as_mut()
            && local.session_id() == Some(id)
        {
            if let Err(e) = local.deliver(&self.cli, text) {
                log::warn!("broadcast to local console failed: {e}");
            }
            return;
        }
        for server in &mut self.servers {
            if server.deliver_to(&self.cli, id, text) {
                return;
            }
        }
        log::debug!("session {id} has no owner, broadcast skipped");
    }

    /// Close network sessions, then the local one, then stop.
    pub fn shutdown(&mut self) {
        // Output queued by the last handlers still goes out.
        self.deliver_broadcasts();
        for server in &mut self.servers {
            server.stop(&self.cli);
        }
        if let Some(mut local) = self.local.take()
            && let Err(e) = local.close(&self.cli)
        {
            log::warn!("local console close failed: {e}");
        }
        self.running = false;
        log::info!("event loop stopped");
    }
}
