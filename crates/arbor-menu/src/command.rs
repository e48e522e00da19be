//! Command nodes and the handles applications keep to toggle them.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::output::Output;
use crate::param::{Args, Param};

/// Handler signature shared by every command.
pub type Handler = Rc<dyn Fn(&mut Output, &Args) -> anyhow::Result<()>>;

/// Runtime state of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    /// Reachable by dispatch and completion.
    Enabled,
    /// Registered but hidden from dispatch; may be re-enabled.
    Disabled,
    /// Detached for good. Handle operations become no-ops.
    Removed,
}

/// One registered command.
pub(crate) struct CommandNode {
    pub name: String,
    pub description: String,
    pub params: Vec<Param>,
    pub handler: Handler,
    state: Rc<Cell<CommandState>>,
}

impl CommandNode {
    pub fn new(name: &str, params: Vec<Param>, description: &str, handler: Handler) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params,
            handler,
            state: Rc::new(Cell::new(CommandState::Enabled)),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn state(&self) -> CommandState {
        self.state.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.get() == CommandState::Enabled
    }

    pub fn is_removed(&self) -> bool {
        self.state.get() == CommandState::Removed
    }

    /// `name <a> <b>` for help listings.
    pub fn usage(&self) -> String {
        let mut usage = self.name.clone();
        for p in &self.params {
            usage.push(' ');
            usage.push_str(&p.display_name());
        }
        usage
    }

    pub fn handle(&self) -> CommandHandle {
        CommandHandle {
            name: self.name.clone(),
            arity: self.arity(),
            state: Rc::clone(&self.state),
        }
    }
}

/// Application-side handle to a registered command.
///
/// Clones share the same command. Once [`remove`](Self::remove) has been
/// called every further operation is a no-op.
#[derive(Clone)]
pub struct CommandHandle {
    name: String,
    arity: usize,
    state: Rc<Cell<CommandState>>,
}

impl CommandHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn state(&self) -> CommandState {
        self.state.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.get() == CommandState::Enabled
    }

    pub fn enable(&self) {
        self.transition(CommandState::Enabled);
    }

    pub fn disable(&self) {
        self.transition(CommandState::Disabled);
    }

    /// Permanently detach the command from its menu.
    pub fn remove(&self) {
        self.transition(CommandState::Removed);
    }

    fn transition(&self, next: CommandState) {
        if self.state.get() == CommandState::Removed {
            return;
        }
        log::debug!("command '{}'/{}: {next:?}", self.name, self.arity);
        self.state.set(next);
    }
}

impl fmt::Debug for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandle")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("state", &self.state.get())
            .finish()
    }
}
