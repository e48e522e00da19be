//! Sample command tree served by the demo binary.

use std::cell::OnceCell;
use std::fmt::Write;
use std::rc::Rc;

use anyhow::Context;
use arbor_menu::{CommandHandle, Menu, ParamType, RegistrationError};
use arbor_session::Cli;

/// Build the detached demo tree (everything except commands that need the
/// running [`Cli`]).
pub fn demo_menu() -> Result<Menu, RegistrationError> {
    let mut root = Menu::new("cli");
    root.insert("hello", &[], "Print hello world", |out, _| {
        out.line("Hello, world");
        Ok(())
    })?;
    root.insert(
        "answer",
        &[ParamType::Int],
        "Print the answer to Life, the Universe and Everything",
        |out, args| {
            writeln!(out, "The answer is: {}", args.int(0)?)?;
            Ok(())
        },
    )?;
    root.insert_named(
        "file",
        &[("file_descriptor", ParamType::Int)],
        "Print the file descriptor specified",
        |out, args| {
            writeln!(out, "file descriptor: {}", args.int(0)?)?;
            Ok(())
        },
    )?;
    root.insert_named(
        "echo",
        &[("string to echo", ParamType::Str)],
        "Print the string passed as parameter",
        |out, args| {
            out.line(args.str(0)?);
            Ok(())
        },
    )?;
    root.insert_named(
        "echo",
        &[
            ("first string to echo", ParamType::Str),
            ("second string to echo", ParamType::Str),
        ],
        "Print the strings passed as parameter",
        |out, args| {
            writeln!(out, "{} {}", args.str(0)?, args.str(1)?)?;
            Ok(())
        },
    )?;
    root.insert(
        "error",
        &[],
        "Return an error from the command handler",
        |_, _| anyhow::bail!("Error in cmd"),
    )?;
    root.insert_named(
        "reverse",
        &[("string_to_revert", ParamType::Str)],
        "Print the reverse string",
        |out, args| {
            let reversed: String = args.str(0)?.chars().rev().collect();
            out.line(&reversed);
            Ok(())
        },
    )?;
    root.insert_named(
        "add",
        &[("first_term", ParamType::Int), ("second_term", ParamType::Int)],
        "Print the sum of the two numbers",
        |out, args| {
            let (x, y) = (args.int(0)?, args.int(1)?);
            let sum = x.checked_add(y).context("integer overflow")?;
            writeln!(out, "{x} + {y} = {sum}")?;
            Ok(())
        },
    )?;
    root.insert(
        "add",
        &[ParamType::Int, ParamType::Int, ParamType::Int],
        "Print the sum of the three numbers",
        |out, args| {
            let (x, y, z) = (args.int(0)?, args.int(1)?, args.int(2)?);
            let sum = x
                .checked_add(y)
                .and_then(|s| s.checked_add(z))
                .context("integer overflow")?;
            writeln!(out, "{x} + {y} + {z} = {sum}")?;
            Ok(())
        },
    )?;
    add_color_commands(&mut root)?;
    root.insert_menu(sub_menu()?)?;
    Ok(root)
}

/// `color` and `nocolor` disable themselves and enable each other;
/// `removecmds` drops both for good.
fn add_color_commands(root: &mut Menu) -> Result<(), RegistrationError> {
    let color_slot: Rc<OnceCell<CommandHandle>> = Rc::new(OnceCell::new());
    let nocolor_slot: Rc<OnceCell<CommandHandle>> = Rc::new(OnceCell::new());

    let (this, other) = (Rc::clone(&color_slot), Rc::clone(&nocolor_slot));
    let color = root.insert("color", &[], "Enable colors in the cli", move |out, _| {
        out.line("Colors ON");
        toggle(&this, &other);
        Ok(())
    })?;

    let (this, other) = (Rc::clone(&nocolor_slot), Rc::clone(&color_slot));
    let nocolor = root.insert("nocolor", &[], "Disable colors in the cli", move |out, _| {
        out.line("Colors OFF");
        toggle(&this, &other);
        Ok(())
    })?;

    // Start in the "colors off" state.
    nocolor.disable();

    let (c, n) = (color.clone(), nocolor.clone());
    root.insert("removecmds", &[], "", move |_, _| {
        c.remove();
        n.remove();
        Ok(())
    })?;

    let _ = color_slot.set(color);
    let _ = nocolor_slot.set(nocolor);
    Ok(())
}

fn toggle(this: &OnceCell<CommandHandle>, other: &OnceCell<CommandHandle>) {
    if let Some(h) = this.get() {
        h.disable();
    }
    if let Some(h) = other.get() {
        h.enable();
    }
}

fn sub_menu() -> Result<Menu, RegistrationError> {
    let mut sub = Menu::new("sub");
    sub.insert("hello", &[], "Print hello world in the submenu", |out, _| {
        out.line("Hello, submenu world");
        Ok(())
    })?;
    sub.insert("demo", &[], "Print a demo string", |out, _| {
        out.line("This is a sample!");
        Ok(())
    })?;

    let mut subsub = Menu::new("subsub");
    subsub.insert(
        "hello",
        &[],
        "Print hello world in the sub-submenu",
        |out, _| {
            out.line("Hello, subsubmenu world");
            Ok(())
        },
    )?;
    sub.insert_menu(subsub)?;
    Ok(sub)
}

/// Commands that talk to every session go in once the Cli exists.
pub fn add_session_commands(cli: &Cli) -> Result<(), RegistrationError> {
    let broadcaster = cli.broadcaster();
    let root = cli.root();
    cli.tree().borrow_mut().insert(
        root,
        "hello_everysession",
        &[],
        "Print hello everybody on all open sessions",
        move |_, _| {
            broadcaster.write_line("Hello, everybody");
            Ok(())
        },
    )?;
    Ok(())
}

/// Error hook matching the demo's wording.
pub fn install_error_handler(cli: &mut Cli) {
    cli.set_error_handler(|out, line, error| {
        out.line(&format!(
            "Exception caught in cli handler: {error} handling command: {line}."
        ));
    });
}

#[cfg(test)]
mod tests {
    use arbor_session::Session;

    use super::*;

    fn demo() -> (Cli, Session) {
        let mut cli = Cli::new(demo_menu().unwrap());
        add_session_commands(&cli).unwrap();
        install_error_handler(&mut cli);
        let mut session = Session::new(&cli);
        session.start(&cli, None);
        session.take_output();
        (cli, session)
    }

    /// Run one line and return only what follows the echoed input.
    fn run(cli: &Cli, session: &mut Session, line: &str) -> String {
        session.feed_bytes(cli, line.as_bytes());
        session.feed_bytes(cli, b"\r");
        let out = session.take_output();
        out.strip_prefix(&format!("{line}\r\n"))
            .map(str::to_string)
            .unwrap_or(out)
    }

    #[test]
    fn overloads_pick_by_arity() {
        let (cli, mut s) = demo();
        assert_eq!(run(&cli, &mut s, "echo hi"), "hi\r\ncli> ");
        assert_eq!(run(&cli, &mut s, "echo hi there"), "hi there\r\ncli> ");
        assert_eq!(run(&cli, &mut s, "add 1 2"), "1 + 2 = 3\r\ncli> ");
        assert_eq!(run(&cli, &mut s, "add 1 2 3"), "1 + 2 + 3 = 6\r\ncli> ");
    }

    #[test]
    fn typed_commands() {
        let (cli, mut s) = demo();
        assert_eq!(run(&cli, &mut s, "answer 42"), "The answer is: 42\r\ncli> ");
        assert_eq!(run(&cli, &mut s, "reverse abc"), "cba\r\ncli> ");
        assert_eq!(run(&cli, &mut s, "file 3"), "file descriptor: 3\r\ncli> ");
    }

    #[test]
    fn handler_error_uses_custom_hook() {
        let (cli, mut s) = demo();
        assert_eq!(
            run(&cli, &mut s, "error"),
            "Exception caught in cli handler: Error in cmd handling command: error.\r\ncli> "
        );
    }

    #[test]
    fn add_overflow_is_reported_not_fatal() {
        let (cli, mut s) = demo();
        assert_eq!(
            run(&cli, &mut s, "add 9223372036854775807 1"),
            "Exception caught in cli handler: integer overflow handling command: \
             add 9223372036854775807 1.\r\ncli> "
        );
        assert_eq!(
            run(&cli, &mut s, "add 9223372036854775807 0 1"),
            "Exception caught in cli handler: integer overflow handling command: \
             add 9223372036854775807 0 1.\r\ncli> "
        );
        assert!(!s.is_closed());
        assert_eq!(run(&cli, &mut s, "add 1 2"), "1 + 2 = 3\r\ncli> ");
    }

    #[test]
    fn color_commands_toggle_each_other() {
        let (cli, mut s) = demo();
        let root = cli.root();
        let enabled = |name: &str| {
            cli.tree()
                .borrow()
                .commands_named(root, name)
                .iter()
                .any(CommandHandle::is_enabled)
        };
        assert!(enabled("color"));
        assert!(!enabled("nocolor"));

        assert_eq!(run(&cli, &mut s, "color"), "Colors ON\r\ncli> ");
        assert!(!enabled("color"));
        assert!(enabled("nocolor"));

        assert_eq!(run(&cli, &mut s, "nocolor"), "Colors OFF\r\ncli> ");
        assert!(enabled("color"));
        assert!(!enabled("nocolor"));
    }

    #[test]
    fn removecmds_drops_color_commands() {
        let (cli, mut s) = demo();
        run(&cli, &mut s, "removecmds");
        assert!(cli.tree().borrow().commands_named(cli.root(), "color").is_empty());
        assert!(run(&cli, &mut s, "color").contains("unknown command"));
    }

    #[test]
    fn nested_menus() {
        let (cli, mut s) = demo();
        assert_eq!(run(&cli, &mut s, "sub"), "cli/sub> ");
        assert_eq!(run(&cli, &mut s, "hello"), "Hello, submenu world\r\ncli/sub> ");
        assert_eq!(run(&cli, &mut s, "subsub"), "cli/sub/subsub> ");
        assert_eq!(
            run(&cli, &mut s, "hello"),
            "Hello, subsubmenu world\r\ncli/sub/subsub> "
        );
        // Ancestor commands stay reachable.
        assert_eq!(run(&cli, &mut s, "answer 1"), "The answer is: 1\r\ncli/sub/subsub> ");
    }

    #[test]
    fn hello_everysession_queues_broadcast() {
        let (cli, mut s) = demo();
        assert_eq!(run(&cli, &mut s, "hello_everysession"), "cli> ");
        assert_eq!(cli.broadcaster().drain(), vec!["Hello, everybody\n"]);
    }
}
