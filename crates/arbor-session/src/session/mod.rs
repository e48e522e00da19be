//! One interactive session: key handling, line editing and dispatch.
//!
//! A [`Session`] is transport-agnostic. The network server feeds it raw
//! bytes, the local console feeds it [`Key`]s; both collect the rendered
//! output with [`Session::take_output`] and write it to their stream.

use arbor_menu::{CommandState, Entry, MenuId, Output, Resolution, resolve, tokenize};
use arbor_types::key::Key;

use crate::cli::{Cli, ExitAction, SessionId};
use crate::decoder::KeyDecoder;
use crate::editor::LineEditor;

#[cfg(test)]
mod tests;

/// Names handled by the session itself, ahead of the tree.
const BUILTINS: [(&str, &str); 3] = [
    ("help", "This help message"),
    ("exit", "Quit the session"),
    ("history", "Show the command history"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

pub struct Session {
    id: SessionId,
    state: SessionState,
    current: MenuId,
    editor: LineEditor,
    decoder: KeyDecoder,
    /// Index of the recalled history entry; equals the history length when
    /// not navigating.
    history_cursor: usize,
    /// Line being typed before history navigation started.
    draft: Option<String>,
    exit_action: Option<ExitAction>,
    /// Echo typed keys back. Off for clients that echo locally.
    echo: bool,
    pending: String,
}

impl Session {
    /// Create a session positioned at the root menu and register it.
    pub fn new(cli: &Cli) -> Self {
        Self {
            id: cli.register_session(),
            state: SessionState::Open,
            current: cli.root(),
            editor: LineEditor::new(),
            decoder: KeyDecoder::new(),
            history_cursor: cli.history_len(),
            draft: None,
            exit_action: None,
            echo: true,
            pending: String::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn current(&self) -> MenuId {
        self.current
    }

    /// Current edit buffer.
    pub fn buffer(&self) -> String {
        self.editor.line()
    }

    /// Session-specific exit action, run before the Cli-wide one.
    pub fn set_exit_action(&mut self, action: ExitAction) {
        self.exit_action = Some(action);
    }

    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    /// Print an optional banner and the first prompt.
    pub fn start(&mut self, cli: &Cli, banner: Option<&str>) {
        if let Some(banner) = banner {
            self.emit(banner);
            if !banner.ends_with('\n') {
                self.emit("\n");
            }
        }
        self.emit_prompt(cli);
    }

    /// Rendered output since the last call, with `\r\n` line endings.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }

    pub fn has_output(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn prompt(&self, cli: &Cli) -> String {
        format!("{}> ", cli.tree().borrow().path(self.current).join("/"))
    }

    /// Decode raw input bytes and process the resulting keys.
    pub fn feed_bytes(&mut self, cli: &Cli, bytes: &[u8]) {
        for key in self.decoder.decode(bytes) {
            if self.is_closed() {
                break;
            }
            self.feed_key(cli, key);
        }
    }

    pub fn feed_key(&mut self, cli: &Cli, key: Key) {
        if self.is_closed() {
            return;
        }
        let echo = match key {
            Key::Char(ch) if key.is_printable() => self.editor.insert(ch),
            Key::Char(_) => String::new(),
            Key::Left => self.editor.left(),
            Key::Right => self.editor.right(),
            Key::Home => self.editor.home(),
            Key::End => self.editor.end(),
            Key::Backspace => self.editor.backspace(),
            Key::Delete => self.editor.delete(),
            Key::Up => self.history_prev(cli),
            Key::Down => self.history_next(cli),
            Key::Tab => {
                self.complete(cli);
                return;
            },
            Key::Enter => {
                self.enter(cli);
                return;
            },
            Key::Cancel => {
                self.editor.take();
                self.draft = None;
                self.history_cursor = cli.history_len();
                self.emit("^C\n");
                self.emit_prompt(cli);
                return;
            },
            Key::Eof => {
                if self.editor.is_empty() {
                    self.emit("\n");
                    self.close(cli);
                }
                return;
            },
        };
        if self.echo {
            self.pending.push_str(&echo);
        }
    }

    /// Show broadcast `text` without losing the line being typed.
    pub fn deliver(&mut self, cli: &Cli, text: &str) {
        if self.is_closed() {
            return;
        }
        let width = self.prompt(cli).chars().count() + self.editor.len();
        self.pending.push('\r');
        self.pending.push_str(&" ".repeat(width));
        self.pending.push('\r');
        self.emit(text);
        if !text.ends_with('\n') {
            self.emit("\n");
        }
        self.emit_prompt(cli);
        let redraw = self.editor.render();
        self.pending.push_str(&redraw);
    }

    /// Run the exit actions and close. Closing twice is a no-op.
    pub fn close(&mut self, cli: &Cli) {
        if self.is_closed() {
            return;
        }
        let mut out = Output::new();
        if let Some(action) = &self.exit_action {
            action(&mut out);
        }
        if let Some(action) = cli.exit_action() {
            action(&mut out);
        }
        self.emit(out.as_str());
        self.state = SessionState::Closed;
        cli.unregister_session(self.id);
        log::debug!("session {} closed", self.id);
    }

    fn emit(&mut self, text: &str) {
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.pending.push_str("\r\n");
            }
            self.pending.push_str(part.strip_suffix('\r').unwrap_or(part));
        }
    }

    fn emit_prompt(&mut self, cli: &Cli) {
        let prompt = self.prompt(cli);
        self.pending.push_str(&prompt);
    }

    fn history_prev(&mut self, cli: &Cli) -> String {
        let history = cli.history();
        if self.draft.is_none() {
            self.history_cursor = history.len();
        }
        self.history_cursor = self.history_cursor.min(history.len());
        if self.history_cursor == 0 {
            return String::new();
        }
        if self.draft.is_none() {
            self.draft = Some(self.editor.line());
        }
        self.history_cursor -= 1;
        match history.get(self.history_cursor) {
            Ok(entry) => self.editor.replace(entry),
            Err(_) => String::new(),
        }
    }

    fn history_next(&mut self, cli: &Cli) -> String {
        if self.draft.is_none() {
            return String::new();
        }
        let history = cli.history();
        self.history_cursor = (self.history_cursor + 1).min(history.len());
        if self.history_cursor == history.len() {
            let draft = self.draft.take().unwrap_or_default();
            return self.editor.replace(&draft);
        }
        match history.get(self.history_cursor) {
            Ok(entry) => self.editor.replace(entry),
            Err(_) => String::new(),
        }
    }

    fn complete(&mut self, cli: &Cli) {
        let line = self.editor.line();
        let mut words = line.split_whitespace();
        let (Some(prefix), None) = (words.next(), words.next()) else {
            return;
        };
        if line.ends_with(char::is_whitespace) {
            return;
        }
        let candidates = cli.tree().borrow().completions(self.current, prefix);
        match candidates.as_slice() {
            [] => {},
            [only] => {
                let echo = self.editor.replace(only);
                self.pending.push_str(&echo);
            },
            many => {
                self.emit(&format!("\n{}\n", many.join("  ")));
                self.emit_prompt(cli);
                let redraw = self.editor.render();
                self.pending.push_str(&redraw);
            },
        }
    }

    fn enter(&mut self, cli: &Cli) {
        let line = self.editor.take();
        self.draft = None;
        if self.echo {
            self.emit("\n");
        }
        let line = line.trim();
        if !line.is_empty() {
            self.execute(cli, line);
        }
        self.history_cursor = cli.history_len();
        if !self.is_closed() {
            self.emit_prompt(cli);
        }
    }

    fn execute(&mut self, cli: &Cli, line: &str) {
        let line = match expand_history(cli, line) {
            Ok(Some(expanded)) => {
                self.emit(&format!("{expanded}\n"));
                expanded
            },
            Ok(None) => line.to_string(),
            Err(message) => {
                self.emit(&format!("error: {message}\n"));
                return;
            },
        };

        let appended = cli.history().append(&line);
        if let Err(e) = appended {
            log::warn!("session {}: {e}", self.id);
            self.emit(&format!("warning: {e}\n"));
        }

        let tokens = match tokenize(&line) {
            Ok(tokens) => tokens,
            Err(e) => {
                self.emit(&format!("error: {e}\n"));
                return;
            },
        };

        if let [only] = tokens.as_slice() {
            match only.as_str() {
                "help" => {
                    let text = self.help(cli);
                    self.emit(&text);
                    return;
                },
                "history" => {
                    let text = history_listing(cli);
                    self.emit(&text);
                    return;
                },
                "exit" => {
                    self.close(cli);
                    return;
                },
                _ => {},
            }
        }

        self.dispatch(cli, &line, &tokens);
    }

    fn dispatch(&mut self, cli: &Cli, line: &str, tokens: &[String]) {
        // Tree borrow ends here so the handler may mutate the tree.
        let resolution = resolve(&cli.tree().borrow(), self.current, tokens);
        match resolution {
            Ok(Resolution::Enter(menu)) => self.current = menu,
            Ok(Resolution::Invoke(invocation)) => {
                log::debug!("session {} runs '{}'", self.id, invocation.name());
                let mut out = Output::new();
                if let Err(e) = invocation.invoke(&mut out) {
                    log::debug!("session {}: '{line}' failed: {e}", self.id);
                    cli.report_error(&mut out, line, &e);
                }
                self.emit(out.as_str());
            },
            Err(e) => self.emit(&format!("error: {e}\n")),
        }
    }

    fn help(&self, cli: &Cli) -> String {
        let tree = cli.tree().borrow();
        let mut text = String::from("Commands available:\n");
        for (name, description) in BUILTINS {
            text.push_str(&format!(" - {name}\n\t{description}\n"));
        }
        for (i, level) in tree.scope_chain(self.current).into_iter().enumerate() {
            if i > 0 {
                text.push_str(&format!("From {}:\n", tree.path(level).join("/")));
            }
            for entry in tree.entries(level) {
                match entry {
                    Entry::Command {
                        usage,
                        description,
                        state,
                    } => {
                        let mark = if state == CommandState::Disabled {
                            " (disabled)"
                        } else {
                            ""
                        };
                        text.push_str(&format!(" - {usage}{mark}\n\t{description}\n"));
                    },
                    Entry::Menu { name } => text.push_str(&format!(" + {name}\n")),
                }
            }
        }
        text
    }
}

/// Expand `!!` and `!N` (1-based). `Ok(None)` means no expansion applied.
fn expand_history(cli: &Cli, line: &str) -> Result<Option<String>, String> {
    let Some(rest) = line.strip_prefix('!') else {
        return Ok(None);
    };
    let history = cli.history();
    if rest == "!" {
        return match history.len() {
            0 => Err("!!: no previous command".to_string()),
            len => history
                .get(len - 1)
                .map(|s| Some(s.to_string()))
                .map_err(|e| e.to_string()),
        };
    }
    let Ok(n) = rest.parse::<usize>() else {
        return Ok(None);
    };
    if n == 0 || n > history.len() {
        return Err(format!("!{n}: event not found"));
    }
    history
        .get(n - 1)
        .map(|s| Some(s.to_string()))
        .map_err(|e| e.to_string())
}

fn history_listing(cli: &Cli) -> String {
    let entries = cli.history().entries();
    if entries.is_empty() {
        return "(no history)\n".to_string();
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("  {:4}  {entry}\n", i + 1))
        .collect()
}
