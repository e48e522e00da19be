//! Context shared by every session of one command tree.

use std::cell::{RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::Rc;

use arbor_menu::{Menu, MenuId, MenuTree, Output};
use arbor_types::config::{DEFAULT_HISTORY_DEPTH, HistoryConfig};

use crate::history::{FileHistory, HistoryError, HistoryStore, MemoryHistory};

/// Hook run when a session closes. Whatever it writes is the session's
/// last output.
pub type ExitAction = Rc<dyn Fn(&mut Output)>;

/// Hook receiving handler failures: output buffer, the line that failed,
/// and the error.
pub type ErrorHandler = Rc<dyn Fn(&mut Output, &str, &anyhow::Error)>;

/// Identity of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Live sessions in registration order.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    next: u64,
    live: Vec<SessionId>,
}

impl SessionRegistry {
    pub fn register(&mut self) -> SessionId {
        let id = SessionId(self.next);
        self.next += 1;
        self.live.push(id);
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn unregister(&mut self, id: SessionId) -> bool {
        let before = self.live.len();
        self.live.retain(|s| *s != id);
        self.live.len() != before
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.live.contains(&id)
    }

    pub fn live(&self) -> &[SessionId] {
        &self.live
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

/// Write side of the output broadcast channel.
///
/// Cheap to clone into handlers. Text is queued and delivered to every
/// live session by the event loop once the current dispatch returns.
#[derive(Debug, Clone, Default)]
pub struct Broadcaster {
    queue: Rc<RefCell<VecDeque<String>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `text` for every session. A trailing newline is added if
    /// missing.
    pub fn write_line(&self, text: impl Into<String>) {
        let mut text = text.into();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        self.queue.borrow_mut().push_back(text);
    }

    /// Remove and return everything queued so far.
    pub fn drain(&self) -> Vec<String> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

/// The command tree plus everything sessions share: history, hooks,
/// broadcast queue and the live-session registry.
///
/// Owned by the event loop and lent to sessions as `&Cli`.
pub struct Cli {
    tree: Rc<RefCell<MenuTree>>,
    history: RefCell<Box<dyn HistoryStore>>,
    exit_action: Option<ExitAction>,
    error_handler: Option<ErrorHandler>,
    broadcaster: Broadcaster,
    registry: RefCell<SessionRegistry>,
}

impl Cli {
    /// Build a context over `root` with in-memory history.
    pub fn new(root: Menu) -> Self {
        Self::with_history(root, Box::new(MemoryHistory::new(DEFAULT_HISTORY_DEPTH)))
    }

    pub fn with_history(root: Menu, history: Box<dyn HistoryStore>) -> Self {
        Self {
            tree: Rc::new(RefCell::new(MenuTree::new(root))),
            history: RefCell::new(history),
            exit_action: None,
            error_handler: None,
            broadcaster: Broadcaster::new(),
            registry: RefCell::new(SessionRegistry::default()),
        }
    }

    /// Pick the history store described by `config`: a [`FileHistory`] when
    /// a path is set, otherwise in-memory.
    pub fn from_config(root: Menu, config: &HistoryConfig) -> Result<Self, HistoryError> {
        let history: Box<dyn HistoryStore> = match &config.path {
            Some(path) => Box::new(FileHistory::open(path, config.max_depth)?),
            None => Box::new(MemoryHistory::new(config.max_depth)),
        };
        Ok(Self::with_history(root, history))
    }

    /// The tree, shareable with handlers that add or toggle commands.
    pub fn tree(&self) -> &Rc<RefCell<MenuTree>> {
        &self.tree
    }

    pub fn root(&self) -> MenuId {
        self.tree.borrow().root()
    }

    pub fn broadcaster(&self) -> Broadcaster {
        self.broadcaster.clone()
    }

    /// Process-wide exit action, run after each session's own.
    pub fn set_exit_action<F>(&mut self, action: F)
    where
        F: Fn(&mut Output) + 'static,
    {
        self.exit_action = Some(Rc::new(action));
    }

    pub fn exit_action(&self) -> Option<ExitAction> {
        self.exit_action.as_ref().map(Rc::clone)
    }

    /// Replace the default `error: ...` rendering of handler failures.
    pub fn set_error_handler<F>(&mut self, handler: F)
    where
        F: Fn(&mut Output, &str, &anyhow::Error) + 'static,
    {
        self.error_handler = Some(Rc::new(handler));
    }

    /// Route a handler failure to the error handler, or render it.
    pub fn report_error(&self, out: &mut Output, line: &str, error: &anyhow::Error) {
        match &self.error_handler {
            Some(handler) => handler(out, line, error),
            None => out.line(&format!("error: command '{line}' failed: {error:#}")),
        }
    }

    pub fn history(&self) -> RefMut<'_, Box<dyn HistoryStore>> {
        self.history.borrow_mut()
    }

    pub fn history_len(&self) -> usize {
        self.history.borrow().len()
    }

    pub fn register_session(&self) -> SessionId {
        let id = self.registry.borrow_mut().register();
        log::debug!("session {id} registered");
        id
    }

    pub fn unregister_session(&self, id: SessionId) {
        if self.registry.borrow_mut().unregister(id) {
            log::debug!("session {id} unregistered");
        }
    }

    /// Live sessions in registration order.
    pub fn live_sessions(&self) -> Vec<SessionId> {
        self.registry.borrow().live().to_vec()
    }

    pub fn is_live(&self, id: SessionId) -> bool {
        self.registry.borrow().contains(id)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn registry_keeps_registration_order() {
        let mut reg = SessionRegistry::default();
        let a = reg.register();
        let b = reg.register();
        let c = reg.register();
        assert!(reg.unregister(b));
        assert!(!reg.unregister(b));
        assert_eq!(reg.live(), &[a, c]);
        let d = reg.register();
        assert_ne!(d, b);
        assert_eq!(reg.live(), &[a, c, d]);
    }

    #[test]
    fn broadcaster_clones_share_queue() {
        let b = Broadcaster::new();
        let handler_side = b.clone();
        handler_side.write_line("hi");
        handler_side.write_line("there\n");
        assert_eq!(b.drain(), vec!["hi\n", "there\n"]);
        assert!(b.is_empty());
    }

    #[test]
    fn default_error_rendering() {
        let cli = Cli::new(Menu::new("cli"));
        let mut out = Output::new();
        cli.report_error(&mut out, "boom", &anyhow::anyhow!("bad"));
        assert_eq!(out.as_str(), "error: command 'boom' failed: bad\n");
    }

    #[test]
    fn custom_error_handler() {
        let mut cli = Cli::new(Menu::new("cli"));
        cli.set_error_handler(|out, line, err| out.line(&format!("{line}: {err}")));
        let mut out = Output::new();
        cli.report_error(&mut out, "x", &anyhow::anyhow!("nope"));
        assert_eq!(out.as_str(), "x: nope\n");
    }

    #[test]
    fn exit_action_is_shared() {
        let hits = Rc::new(Cell::new(0));
        let mut cli = Cli::new(Menu::new("cli"));
        let h = Rc::clone(&hits);
        cli.set_exit_action(move |_| h.set(h.get() + 1));
        let mut out = Output::new();
        if let Some(action) = cli.exit_action() {
            action(&mut out);
        }
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn from_config_uses_file_when_path_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist");
        std::fs::write(&path, "hello\n").unwrap();
        let config = HistoryConfig {
            max_depth: 5,
            path: Some(path),
        };
        let cli = Cli::from_config(Menu::new("cli"), &config).unwrap();
        assert_eq!(cli.history_len(), 1);
    }

    #[test]
    fn registry_through_cli() {
        let cli = Cli::new(Menu::new("cli"));
        let a = cli.register_session();
        assert!(cli.is_live(a));
        cli.unregister_session(a);
        assert!(cli.live_sessions().is_empty());
    }
}
