//! Menus and the arena that owns them.
//!
//! Applications build detached [`Menu`]s, nest them with
//! [`Menu::insert_menu`], and hand the root to [`MenuTree::new`]. The tree
//! stores every menu in a flat arena and links children to parents with
//! [`MenuId`] indices, so parents are never shared owners. Menus are never
//! removed once attached, which keeps every `MenuId` valid for the life of
//! the tree.

use std::rc::Rc;

use crate::command::{CommandHandle, CommandNode, CommandState, Handler};
use crate::output::Output;
use crate::param::{Args, Param, ParamType};

/// Index of a menu inside its [`MenuTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MenuId(usize);

/// Errors raised while registering commands or menus.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("command '{name}' with {arity} parameter(s) already registered in menu '{menu}'")]
    DuplicateCommand {
        menu: String,
        name: String,
        arity: usize,
    },

    #[error("menu '{parent}' already has a submenu named '{name}'")]
    DuplicateMenu { parent: String, name: String },

    #[error("invalid name '{0}': names must be non-empty and contain no whitespace")]
    InvalidName(String),
}

/// One line of a menu listing, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Command {
        /// `name <a> <b>`
        usage: String,
        description: String,
        state: CommandState,
    },
    Menu {
        name: String,
    },
}

fn validate_name(name: &str) -> Result<(), RegistrationError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(RegistrationError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Register `node` into `commands`, rejecting a live `(name, arity)` duplicate.
///
/// Removed commands are purged first so their slot can be reused.
fn add_command(
    menu: &str,
    commands: &mut Vec<CommandNode>,
    node: CommandNode,
) -> Result<CommandHandle, RegistrationError> {
    validate_name(&node.name)?;
    commands.retain(|c| !c.is_removed());
    let arity = node.arity();
    if commands
        .iter()
        .any(|c| c.name == node.name && c.arity() == arity)
    {
        return Err(RegistrationError::DuplicateCommand {
            menu: menu.to_string(),
            name: node.name,
            arity,
        });
    }
    let handle = node.handle();
    commands.push(node);
    Ok(handle)
}

fn make_node<F>(name: &str, params: Vec<Param>, description: &str, handler: F) -> CommandNode
where
    F: Fn(&mut Output, &Args) -> anyhow::Result<()> + 'static,
{
    let handler: Handler = Rc::new(handler);
    CommandNode::new(name, params, description, handler)
}

fn unnamed(params: &[ParamType]) -> Vec<Param> {
    params.iter().copied().map(Param::new).collect()
}

fn named(params: &[(&str, ParamType)]) -> Vec<Param> {
    params.iter().map(|(n, k)| Param::named(n, *k)).collect()
}

/// A detached menu under construction.
pub struct Menu {
    name: String,
    commands: Vec<CommandNode>,
    submenus: Vec<Menu>,
}

impl Menu {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            commands: Vec::new(),
            submenus: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a command whose parameters are identified by type only.
    pub fn insert<F>(
        &mut self,
        name: &str,
        params: &[ParamType],
        description: &str,
        handler: F,
    ) -> Result<CommandHandle, RegistrationError>
    where
        F: Fn(&mut Output, &Args) -> anyhow::Result<()> + 'static,
    {
        let node = make_node(name, unnamed(params), description, handler);
        add_command(&self.name, &mut self.commands, node)
    }

    /// Register a command with named parameters (names show up in help).
    pub fn insert_named<F>(
        &mut self,
        name: &str,
        params: &[(&str, ParamType)],
        description: &str,
        handler: F,
    ) -> Result<CommandHandle, RegistrationError>
    where
        F: Fn(&mut Output, &Args) -> anyhow::Result<()> + 'static,
    {
        let node = make_node(name, named(params), description, handler);
        add_command(&self.name, &mut self.commands, node)
    }

    /// Move `child` into this menu as a submenu.
    pub fn insert_menu(&mut self, child: Menu) -> Result<(), RegistrationError> {
        validate_name(&child.name)?;
        if self.submenus.iter().any(|m| m.name == child.name) {
            return Err(RegistrationError::DuplicateMenu {
                parent: self.name.clone(),
                name: child.name,
            });
        }
        self.submenus.push(child);
        Ok(())
    }
}

struct MenuNode {
    name: String,
    parent: Option<MenuId>,
    commands: Vec<CommandNode>,
    submenus: Vec<MenuId>,
}

/// Arena holding an attached menu tree.
pub struct MenuTree {
    nodes: Vec<MenuNode>,
}

impl MenuTree {
    /// Take ownership of `root` and all of its descendants.
    pub fn new(root: Menu) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.flatten(None, root);
        tree
    }

    fn flatten(&mut self, parent: Option<MenuId>, menu: Menu) -> MenuId {
        let id = MenuId(self.nodes.len());
        self.nodes.push(MenuNode {
            name: menu.name,
            parent,
            commands: menu.commands,
            submenus: Vec::new(),
        });
        for child in menu.submenus {
            let child_id = self.flatten(Some(id), child);
            self.nodes[id.0].submenus.push(child_id);
        }
        id
    }

    fn node(&self, id: MenuId) -> &MenuNode {
        &self.nodes[id.0]
    }

    pub fn root(&self) -> MenuId {
        MenuId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self, id: MenuId) -> &str {
        &self.node(id).name
    }

    pub fn parent(&self, id: MenuId) -> Option<MenuId> {
        self.node(id).parent
    }

    /// Menu names from the root down to `id`.
    pub fn path(&self, id: MenuId) -> Vec<&str> {
        let mut path: Vec<&str> = self.scope_chain(id).iter().map(|m| self.name(*m)).collect();
        path.reverse();
        path
    }

    /// `id` followed by each ancestor up to the root.
    pub fn scope_chain(&self, id: MenuId) -> Vec<MenuId> {
        let mut chain = vec![id];
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            chain.push(p);
            cursor = self.parent(p);
        }
        chain
    }

    pub fn submenus(&self, id: MenuId) -> &[MenuId] {
        &self.node(id).submenus
    }

    /// Direct child of `id` named `name`.
    pub fn submenu(&self, id: MenuId, name: &str) -> Option<MenuId> {
        self.node(id)
            .submenus
            .iter()
            .copied()
            .find(|m| self.name(*m) == name)
    }

    /// Resolve a path of submenu names starting below the root.
    pub fn find_menu(&self, path: &[&str]) -> Option<MenuId> {
        path.iter()
            .try_fold(self.root(), |menu, name| self.submenu(menu, name))
    }

    /// Non-removed commands of `id`, in insertion order.
    pub(crate) fn commands(&self, id: MenuId) -> impl Iterator<Item = &CommandNode> {
        self.node(id).commands.iter().filter(|c| !c.is_removed())
    }

    /// Handles to every live overload of `name` in `id`.
    pub fn commands_named(&self, id: MenuId, name: &str) -> Vec<CommandHandle> {
        self.commands(id)
            .filter(|c| c.name == name)
            .map(CommandNode::handle)
            .collect()
    }

    /// Register a command into an attached menu.
    pub fn insert<F>(
        &mut self,
        id: MenuId,
        name: &str,
        params: &[ParamType],
        description: &str,
        handler: F,
    ) -> Result<CommandHandle, RegistrationError>
    where
        F: Fn(&mut Output, &Args) -> anyhow::Result<()> + 'static,
    {
        let node = make_node(name, unnamed(params), description, handler);
        let menu = &mut self.nodes[id.0];
        add_command(&menu.name, &mut menu.commands, node)
    }

    /// Register a command with named parameters into an attached menu.
    pub fn insert_named<F>(
        &mut self,
        id: MenuId,
        name: &str,
        params: &[(&str, ParamType)],
        description: &str,
        handler: F,
    ) -> Result<CommandHandle, RegistrationError>
    where
        F: Fn(&mut Output, &Args) -> anyhow::Result<()> + 'static,
    {
        let node = make_node(name, named(params), description, handler);
        let menu = &mut self.nodes[id.0];
        add_command(&menu.name, &mut menu.commands, node)
    }

    /// Attach a detached menu (and its subtree) below `parent`.
    pub fn attach(&mut self, parent: MenuId, menu: Menu) -> Result<MenuId, RegistrationError> {
        validate_name(&menu.name)?;
        if self.submenu(parent, &menu.name).is_some() {
            return Err(RegistrationError::DuplicateMenu {
                parent: self.name(parent).to_string(),
                name: menu.name,
            });
        }
        let id = self.flatten(Some(parent), menu);
        self.nodes[parent.0].submenus.push(id);
        log::debug!("attached menu '{}'", self.path(id).join("/"));
        Ok(id)
    }

    /// Listing of `id`: commands (any live state) then submenus.
    pub fn entries(&self, id: MenuId) -> Vec<Entry> {
        let commands = self.commands(id).map(|c| Entry::Command {
            usage: c.usage(),
            description: c.description.clone(),
            state: c.state(),
        });
        let menus = self.submenus(id).iter().map(|m| Entry::Menu {
            name: self.name(*m).to_string(),
        });
        commands.chain(menus).collect()
    }

    /// Names reachable from `id` (enabled commands and submenus along the
    /// scope chain, nearest first) starting with `prefix`. No duplicates.
    pub fn completions(&self, id: MenuId, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for level in self.scope_chain(id) {
            let commands = self
                .commands(level)
                .filter(|c| c.is_enabled())
                .map(|c| c.name.as_str());
            let menus = self.submenus(level).iter().map(|m| self.name(*m));
            for name in commands.chain(menus) {
                if name.starts_with(prefix) && !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }
}
