//! Command menu tree and dispatcher.
//!
//! Applications build a tree of [`Menu`]s holding overloaded commands, hand
//! it to a [`MenuTree`] arena, and resolve typed lines against a position in
//! that tree with [`resolve`]. Commands are matched by name, then arity, then
//! by converting each token to the declared [`ParamType`].

mod command;
mod dispatch;
mod output;
mod param;
mod tokenize;
mod tree;

/// Runtime state of a registered command.
pub use command::CommandState;
/// Handle kept by the application to enable/disable/remove a command.
pub use command::CommandHandle;
/// Boxed handler signature shared by every command.
pub use command::Handler;
/// Resolve a tokenized line against the tree.
pub use dispatch::resolve;
/// Dispatch failures (unknown command, arity, conversion, handler error).
pub use dispatch::DispatchError;
/// A resolved handler call, ready to run once the tree borrow is released.
pub use dispatch::Invocation;
/// Result of resolving a line: enter a menu or invoke a command.
pub use dispatch::Resolution;
/// Text sink handed to command handlers.
pub use output::Output;
/// Converted argument list and typed accessors.
pub use param::{ArgError, Args, Param, ParamType, Value};
/// Whitespace/quote-aware line splitting.
pub use tokenize::{TokenizeError, tokenize};
/// Menu builder, arena tree, ids and listing entries.
pub use tree::{Entry, Menu, MenuId, MenuTree, RegistrationError};
