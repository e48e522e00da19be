//! Resolve a tokenized line to a menu change or a handler call.
//!
//! Resolution walks the scope chain of the current menu, nearest level
//! first. At each level the first token is tried, in order, as a submenu
//! name, as a command with exactly the given arity, and as the level's own
//! name (navigating back up). A qualified path (`sub demo`) is resolved
//! strictly inside the named submenu.

use std::rc::Rc;

use crate::command::{CommandNode, Handler};
use crate::output::Output;
use crate::param::{Args, ParamType, convert_all};
use crate::tokenize::TokenizeError;
use crate::tree::{MenuId, MenuTree};

/// Dispatch failures. None of them close the session.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown command: {name}")]
    NoSuchCommand { name: String },

    #[error(
        "wrong number of arguments for '{name}': got {given}, expected {}",
        list_arities(.accepted)
    )]
    ArityMismatch {
        name: String,
        given: usize,
        accepted: Vec<usize>,
    },

    #[error("argument {position} of '{name}': cannot convert '{token}' to {expected}")]
    ArgumentConversion {
        name: String,
        position: usize,
        token: String,
        expected: ParamType,
    },

    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error("command '{line}' failed: {source}")]
    Handler {
        line: String,
        #[source]
        source: anyhow::Error,
    },
}

fn list_arities(accepted: &[usize]) -> String {
    let parts: Vec<String> = accepted.iter().map(ToString::to_string).collect();
    parts.join(" or ")
}

/// A handler call detached from the tree.
///
/// Holding an `Invocation` keeps no borrow on the [`MenuTree`], so the
/// handler itself may toggle commands or attach menus.
pub struct Invocation {
    name: String,
    handler: Handler,
    args: Args,
}

impl Invocation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    /// Run the handler.
    pub fn invoke(self, out: &mut Output) -> anyhow::Result<()> {
        (self.handler)(out, &self.args)
    }
}

/// Outcome of [`resolve`].
pub enum Resolution {
    /// The line named a menu: make it the session's current menu.
    Enter(MenuId),
    /// The line named a command.
    Invoke(Invocation),
}

enum Match {
    Found(Invocation),
    /// Name present, but no overload with this arity.
    WrongArity(Vec<usize>),
    Missing,
}

/// Resolve `tokens` against `tree`, starting at `current`.
///
/// An empty token list resolves to `current` itself.
pub fn resolve(
    tree: &MenuTree,
    current: MenuId,
    tokens: &[String],
) -> Result<Resolution, DispatchError> {
    let Some((first, rest)) = tokens.split_first() else {
        return Ok(Resolution::Enter(current));
    };

    let mut accepted: Vec<usize> = Vec::new();
    for level in tree.scope_chain(current) {
        if let Some(sub) = tree.submenu(level, first) {
            return resolve_within(tree, sub, rest);
        }
        match match_command(tree, level, first, rest)? {
            Match::Found(inv) => return Ok(Resolution::Invoke(inv)),
            Match::WrongArity(arities) => accepted.extend(arities),
            Match::Missing => {},
        }
        if tree.name(level) == first.as_str() {
            return resolve_within(tree, level, rest);
        }
    }
    Err(not_found(first, rest.len(), accepted))
}

/// Resolve a qualified remainder inside `menu` only.
fn resolve_within(
    tree: &MenuTree,
    menu: MenuId,
    tokens: &[String],
) -> Result<Resolution, DispatchError> {
    let Some((first, rest)) = tokens.split_first() else {
        return Ok(Resolution::Enter(menu));
    };
    if let Some(sub) = tree.submenu(menu, first) {
        return resolve_within(tree, sub, rest);
    }
    match match_command(tree, menu, first, rest)? {
        Match::Found(inv) => Ok(Resolution::Invoke(inv)),
        Match::WrongArity(accepted) => Err(not_found(first, rest.len(), accepted)),
        Match::Missing => Err(not_found(first, rest.len(), Vec::new())),
    }
}

fn not_found(name: &str, given: usize, mut accepted: Vec<usize>) -> DispatchError {
    if accepted.is_empty() {
        return DispatchError::NoSuchCommand {
            name: name.to_string(),
        };
    }
    accepted.sort_unstable();
    accepted.dedup();
    DispatchError::ArityMismatch {
        name: name.to_string(),
        given,
        accepted,
    }
}

fn match_command(
    tree: &MenuTree,
    menu: MenuId,
    name: &str,
    args: &[String],
) -> Result<Match, DispatchError> {
    let candidates: Vec<&CommandNode> = tree
        .commands(menu)
        .filter(|c| c.is_enabled() && c.name == name)
        .collect();
    if candidates.is_empty() {
        return Ok(Match::Missing);
    }
    let Some(cmd) = candidates.iter().find(|c| c.arity() == args.len()) else {
        return Ok(Match::WrongArity(
            candidates.iter().map(|c| c.arity()).collect(),
        ));
    };
    let converted =
        convert_all(&cmd.params, args).map_err(|f| DispatchError::ArgumentConversion {
            name: name.to_string(),
            position: f.position,
            token: f.token,
            expected: f.expected,
        })?;
    log::debug!("resolved '{name}'/{} in '{}'", args.len(), tree.name(menu));
    Ok(Match::Found(Invocation {
        name: name.to_string(),
        handler: Rc::clone(&cmd.handler),
        args: converted,
    }))
}
