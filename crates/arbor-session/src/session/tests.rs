//! Tests for the session state machine.

use std::cell::Cell;
use std::fmt::Write;
use std::rc::Rc;

use arbor_menu::{Menu, ParamType};

use super::*;

fn demo_menu() -> Menu {
    let mut root = Menu::new("cli");
    root.insert("hello", &[], "Print hello world", |out, _| {
        out.line("Hello, world");
        Ok(())
    })
    .unwrap();
    root.insert(
        "add",
        &[ParamType::Int, ParamType::Int],
        "Add two numbers",
        |out, args| {
            writeln!(out, "{}", args.int(0)? + args.int(1)?)?;
            Ok(())
        },
    )
    .unwrap();
    root.insert("fail", &[], "Always fails", |_, _| {
        Err(anyhow::anyhow!("it broke"))
    })
    .unwrap();
    let mut sub = Menu::new("sub");
    sub.insert("demo", &[], "Demo", |out, _| {
        out.line("demo ran");
        Ok(())
    })
    .unwrap();
    root.insert_menu(sub).unwrap();
    root
}

fn started() -> (Cli, Session) {
    let cli = Cli::new(demo_menu());
    let mut session = Session::new(&cli);
    session.start(&cli, None);
    session.take_output();
    (cli, session)
}

fn run(cli: &Cli, session: &mut Session, line: &str) -> String {
    session.feed_bytes(cli, line.as_bytes());
    session.feed_bytes(cli, b"\r\n");
    session.take_output()
}

#[test]
fn start_prints_banner_and_prompt() {
    let cli = Cli::new(demo_menu());
    let mut session = Session::new(&cli);
    session.start(&cli, Some("Welcome"));
    assert_eq!(session.take_output(), "Welcome\r\ncli> ");
}

#[test]
fn runs_command_and_reprompts() {
    let (cli, mut s) = started();
    assert_eq!(run(&cli, &mut s, "hello"), "hello\r\nHello, world\r\ncli> ");
    assert_eq!(run(&cli, &mut s, "add 2 3"), "add 2 3\r\n5\r\ncli> ");
}

#[test]
fn empty_line_only_reprompts() {
    let (cli, mut s) = started();
    assert_eq!(run(&cli, &mut s, ""), "\r\ncli> ");
    assert_eq!(cli.history_len(), 0);
}

#[test]
fn dispatch_errors_keep_session_open() {
    let (cli, mut s) = started();
    let out = run(&cli, &mut s, "nope");
    assert!(out.contains("error: unknown command: nope"));
    let out = run(&cli, &mut s, "add 1 x");
    assert!(out.contains("cannot convert 'x'"));
    let out = run(&cli, &mut s, "echo 'open");
    assert!(out.contains("unterminated single quote"));
    assert!(!s.is_closed());
    assert!(out.ends_with("cli> "));
}

#[test]
fn handler_error_uses_error_handler() {
    let (cli, mut s) = started();
    let out = run(&cli, &mut s, "fail");
    assert!(out.contains("error: command 'fail' failed: it broke"));

    let mut cli = Cli::new(demo_menu());
    cli.set_error_handler(|out, _, err| out.line(&format!("caught: {err}")));
    let mut s = Session::new(&cli);
    let out = run(&cli, &mut s, "fail");
    assert!(out.contains("caught: it broke"));
}

#[test]
fn entering_submenu_changes_prompt() {
    let (cli, mut s) = started();
    assert!(run(&cli, &mut s, "sub").ends_with("cli/sub> "));
    assert!(run(&cli, &mut s, "demo").contains("demo ran"));
    // Root commands stay reachable.
    assert!(run(&cli, &mut s, "hello").contains("Hello, world"));
    assert!(run(&cli, &mut s, "cli").ends_with("\r\ncli> "));
}

#[test]
fn qualified_path_runs_without_entering() {
    let (cli, mut s) = started();
    let out = run(&cli, &mut s, "sub demo");
    assert!(out.contains("demo ran"));
    assert!(out.ends_with("cli> "));
}

#[test]
fn editing_keys() {
    let (cli, mut s) = started();
    s.feed_bytes(&cli, b"helo");
    s.feed_bytes(&cli, b"\x1b[D");
    s.feed_bytes(&cli, b"l");
    assert_eq!(s.buffer(), "hello");
    s.feed_bytes(&cli, b"\x01\x1b[3~");
    assert_eq!(s.buffer(), "ello");
    s.feed_bytes(&cli, b"\x05\x7f");
    assert_eq!(s.buffer(), "ell");
}

#[test]
fn cancel_clears_line() {
    let (cli, mut s) = started();
    s.feed_bytes(&cli, b"hel\x03");
    assert_eq!(s.buffer(), "");
    assert_eq!(s.take_output(), "hel^C\r\ncli> ");
}

#[test]
fn history_recall_and_draft() {
    let (cli, mut s) = started();
    run(&cli, &mut s, "hello");
    run(&cli, &mut s, "add 1 2");
    s.feed_bytes(&cli, b"dra");
    s.feed_key(&cli, Key::Up);
    assert_eq!(s.buffer(), "add 1 2");
    s.feed_key(&cli, Key::Up);
    assert_eq!(s.buffer(), "hello");
    // Clamped at the oldest entry.
    s.feed_key(&cli, Key::Up);
    assert_eq!(s.buffer(), "hello");
    s.feed_key(&cli, Key::Down);
    assert_eq!(s.buffer(), "add 1 2");
    s.feed_key(&cli, Key::Down);
    assert_eq!(s.buffer(), "dra");
    s.feed_key(&cli, Key::Down);
    assert_eq!(s.buffer(), "dra");
    assert_eq!(cli.history_len(), 2);
}

#[test]
fn history_builtin_and_bang() {
    let (cli, mut s) = started();
    run(&cli, &mut s, "hello");
    run(&cli, &mut s, "add 1 2");
    let out = run(&cli, &mut s, "history");
    assert!(out.contains("     1  hello\r\n"));
    assert!(out.contains("     3  history\r\n"));
    let out = run(&cli, &mut s, "!2");
    assert!(out.contains("add 1 2\r\n3\r\n"));
    let out = run(&cli, &mut s, "!!");
    assert!(out.contains("3\r\n"));
    let out = run(&cli, &mut s, "!99");
    assert!(out.contains("error: !99: event not found"));
}

#[test]
fn help_lists_commands_and_marks_disabled() {
    let cli = Cli::new(demo_menu());
    let mut s = Session::new(&cli);
    let root = cli.root();
    let handle = cli.tree().borrow().commands_named(root, "hello")[0].clone();
    handle.disable();
    let out = run(&cli, &mut s, "help");
    assert!(out.contains(" - help\r\n"));
    assert!(out.contains(" - hello (disabled)\r\n"));
    assert!(out.contains(" - add <int> <int>\r\n\tAdd two numbers"));
    assert!(out.contains(" + sub\r\n"));

    run(&cli, &mut s, "sub");
    let out = run(&cli, &mut s, "help");
    assert!(out.contains(" - demo\r\n"));
    assert!(out.contains("From cli:\r\n"));
}

#[test]
fn builtin_wins_over_tree_command() {
    let mut root = Menu::new("cli");
    root.insert("help", &[], "shadowed", |out, _| {
        out.line("tree help");
        Ok(())
    })
    .unwrap();
    let cli = Cli::new(root);
    let mut s = Session::new(&cli);
    let out = run(&cli, &mut s, "help");
    assert!(out.contains("Commands available:"));
    assert!(!out.contains("tree help"));
}

#[test]
fn tab_completes_single_candidate() {
    let (cli, mut s) = started();
    s.feed_bytes(&cli, b"he\t");
    assert_eq!(s.buffer(), "hello");
    s.feed_bytes(&cli, b"\r");
    assert!(s.take_output().contains("Hello, world"));
}

#[test]
fn tab_lists_several_candidates() {
    let mut root = demo_menu();
    root.insert("help_me", &[], "", |_, _| Ok(())).unwrap();
    let cli = Cli::new(root);
    let mut s = Session::new(&cli);
    s.feed_bytes(&cli, b"he");
    s.take_output();
    s.feed_bytes(&cli, b"\t");
    assert_eq!(s.buffer(), "he");
    assert_eq!(s.take_output(), "\r\nhello  help_me\r\ncli> he");
}

#[test]
fn tab_ignored_after_first_token() {
    let (cli, mut s) = started();
    s.feed_bytes(&cli, b"add 1\t");
    assert_eq!(s.buffer(), "add 1");
    s.feed_bytes(&cli, b"\x7f\x7f\x7f\x7f\x7fhe \t");
    assert_eq!(s.buffer(), "he ");
}

#[test]
fn tab_skips_disabled() {
    let (cli, mut s) = started();
    let root = cli.root();
    cli.tree().borrow().commands_named(root, "hello")[0].disable();
    s.feed_bytes(&cli, b"he\t");
    assert_eq!(s.buffer(), "he");
}

#[test]
fn handler_may_toggle_commands() {
    let mut root = Menu::new("cli");
    let target = root.insert("target", &[], "", |_, _| Ok(())).unwrap();
    root.insert("off", &[], "", move |_, _| {
        target.disable();
        Ok(())
    })
    .unwrap();
    let cli = Cli::new(root);
    let mut s = Session::new(&cli);
    run(&cli, &mut s, "off");
    assert!(run(&cli, &mut s, "target").contains("unknown command: target"));
}

#[test]
fn handler_may_insert_commands() {
    let cli = Cli::new(Menu::new("cli"));
    let tree = Rc::clone(cli.tree());
    let root = cli.root();
    cli.tree()
        .borrow_mut()
        .insert(root, "grow", &[], "", move |_, _| {
            let mut tree = tree.borrow_mut();
            let root = tree.root();
            tree.insert(root, "grown", &[], "", |out, _| {
                out.line("grown!");
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
    let mut s = Session::new(&cli);
    run(&cli, &mut s, "grow");
    assert!(run(&cli, &mut s, "grown").contains("grown!"));
}

#[test]
fn exit_runs_actions_in_order_and_closes() {
    let order = Rc::new(Cell::new(0));
    let mut cli = Cli::new(demo_menu());
    let o = Rc::clone(&order);
    cli.set_exit_action(move |out| {
        assert_eq!(o.get(), 1);
        o.set(2);
        out.line("cli bye");
    });
    let mut s = Session::new(&cli);
    let o = Rc::clone(&order);
    s.set_exit_action(Rc::new(move |out: &mut Output| {
        o.set(1);
        out.line("session bye");
    }));
    let out = run(&cli, &mut s, "exit");
    assert!(out.ends_with("session bye\r\ncli bye\r\n"));
    assert_eq!(order.get(), 2);
    assert!(s.is_closed());
    assert!(!cli.is_live(s.id()));

    // Closing again does nothing.
    s.close(&cli);
    assert_eq!(order.get(), 2);
    s.feed_bytes(&cli, b"hello\r");
    assert!(s.take_output().is_empty());
}

#[test]
fn eof_closes_only_on_empty_line() {
    let (cli, mut s) = started();
    s.feed_bytes(&cli, b"x\x04");
    assert!(!s.is_closed());
    s.feed_bytes(&cli, b"\x7f\x04");
    assert!(s.is_closed());
}

#[test]
fn deliver_redraws_partial_line() {
    let (cli, mut s) = started();
    s.feed_bytes(&cli, b"ad");
    s.take_output();
    s.deliver(&cli, "news");
    assert_eq!(s.take_output(), "\r       \rnews\r\ncli> ad");
    assert_eq!(s.buffer(), "ad");
}

#[test]
fn history_failure_is_a_notice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("h");
    let history = crate::history::FileHistory::open(&path, 10).unwrap();
    let cli = Cli::with_history(demo_menu(), Box::new(history));
    // Replace the file with a directory so appends fail.
    std::fs::create_dir(&path).unwrap();
    let mut s = Session::new(&cli);
    let out = run(&cli, &mut s, "hello");
    assert!(out.contains("warning: cannot persist history"));
    assert!(out.contains("Hello, world"));
    assert_eq!(cli.history_len(), 1);
}

#[test]
fn sessions_keep_separate_positions() {
    let cli = Cli::new(demo_menu());
    let mut a = Session::new(&cli);
    let mut b = Session::new(&cli);
    run(&cli, &mut a, "sub");
    assert_ne!(a.current(), b.current());
    assert!(run(&cli, &mut b, "demo").contains("unknown command: demo"));
    assert_eq!(cli.live_sessions(), vec![a.id(), b.id()]);
}
