//! The process's own terminal as a session.

use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

use arbor_menu::Output;
use arbor_session::{Cli, ExitAction, Session, SessionId};
use arbor_types::error::Result;
use arbor_types::key::Key;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

/// Keyboard in, text out. Implementations must never block in
/// [`Console::poll_key`].
pub trait Console {
    /// Next key if one is ready.
    fn poll_key(&mut self) -> Result<Option<Key>>;

    fn write(&mut self, text: &str) -> Result<()>;

    /// Prepare the terminal for character-at-a-time input.
    fn enter(&mut self) -> Result<()> {
        Ok(())
    }

    /// Undo [`Console::enter`].
    fn leave(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Map a terminal key event to an editing key.
pub fn map_key(event: KeyEvent) -> Option<Key> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        return match event.code {
            KeyCode::Char('c') => Some(Key::Cancel),
            KeyCode::Char('d') => Some(Key::Eof),
            KeyCode::Char('a') => Some(Key::Home),
            KeyCode::Char('e') => Some(Key::End),
            _ => None,
        };
    }
    match event.code {
        KeyCode::Char(c) => Some(Key::Char(c)),
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Home => Some(Key::Home),
        KeyCode::End => Some(Key::End),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Delete => Some(Key::Delete),
        KeyCode::Tab => Some(Key::Tab),
        KeyCode::Enter => Some(Key::Enter),
        _ => None,
    }
}

/// Stdin/stdout through crossterm, in raw mode while attached.
#[derive(Debug, Default)]
pub struct CrosstermConsole {
    raw: bool,
}

impl CrosstermConsole {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Console for CrosstermConsole {
    fn poll_key(&mut self) -> Result<Option<Key>> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()?
                && let Some(key) = map_key(key)
            {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }

    fn write(&mut self, text: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    fn enter(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        self.raw = true;
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.raw {
            terminal::disable_raw_mode()?;
            self.raw = false;
        }
        Ok(())
    }
}

impl Drop for CrosstermConsole {
    fn drop(&mut self) {
        if self.raw {
            let _ = terminal::disable_raw_mode();
        }
    }
}

/// Session bound to a [`Console`].
pub struct LocalTerminal {
    console: Box<dyn Console>,
    session: Option<Session>,
    exit_action: Option<ExitAction>,
    banner: Option<String>,
}

impl LocalTerminal {
    pub fn new(console: Box<dyn Console>) -> Self {
        Self {
            console,
            session: None,
            exit_action: None,
            banner: None,
        }
    }

    /// Local terminal on the process's stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(Box::new(CrosstermConsole::new()))
    }

    /// Exit action for the local session (typically stops the event loop).
    pub fn set_exit_action<F>(&mut self, action: F)
    where
        F: Fn(&mut Output) + 'static,
    {
        self.exit_action = Some(Rc::new(action));
    }

    pub fn set_banner(&mut self, banner: impl Into<String>) {
        self.banner = Some(banner.into());
    }

    /// Open the session and print the first prompt.
    pub fn attach(&mut self, cli: &Cli) -> Result<()> {
        self.console.enter()?;
        let mut session = Session::new(cli);
        if let Some(action) = &self.exit_action {
            session.set_exit_action(Rc::clone(action));
        }
        session.start(cli, self.banner.as_deref());
        log::debug!("local session {} attached", session.id());
        self.session = Some(session);
        self.flush()
    }

    /// Id of the attached session, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(Session::id)
    }

    pub fn is_attached(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.session.as_ref().is_none_or(Session::is_closed)
    }

    /// Process every key that is ready. Returns the number of keys handled.
    pub fn poll(&mut self, cli: &Cli) -> Result<usize> {
        let mut handled = 0;
        loop {
            let Some(session) = self.session.as_mut() else {
                return Ok(handled);
            };
            if session.is_closed() {
                break;
            }
            let Some(key) = self.console.poll_key()? else {
                break;
            };
            session.feed_key(cli, key);
            handled += 1;
            self.flush()?;
        }
        if self.session.as_ref().is_some_and(Session::is_closed) {
            self.console.leave()?;
        }
        Ok(handled)
    }

    pub fn deliver(&mut self, cli: &Cli, text: &str) -> Result<()> {
        if let Some(session) = self.session.as_mut() {
            session.deliver(cli, text);
        }
        self.flush()
    }

    /// Close the session (running its exit actions) and restore the
    /// terminal.
    pub fn close(&mut self, cli: &Cli) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if !session.is_closed() {
            session.close(cli);
            self.flush()?;
        }
        self.console.leave()
    }

    fn flush(&mut self) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let text = session.take_output();
        if text.is_empty() {
            return Ok(());
        }
        self.console.write(&text)
    }
}
