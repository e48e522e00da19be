//! Arbor demo entry point.
//!
//! Serves a sample command tree on the local terminal and, when enabled,
//! to telnet clients. Type `help` for the command list, `exit` or Ctrl-D
//! on the local console to quit.

mod menu;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use arbor_core::{EventLoop, LocalTerminal};
use arbor_net::SessionServer;
use arbor_session::Cli;
use arbor_types::config::ArborConfig;

/// Interactive command shell demo
#[derive(Parser)]
#[command(name = "arbor-app")]
#[command(about = "Sample command tree on the local terminal and over telnet")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start the session server on this port
    #[arg(short, long)]
    port: Option<u16>,

    /// Do not attach the local terminal
    #[arg(long)]
    no_local: bool,

    /// Persist command history to this file
    #[arg(long)]
    history: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ArborConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ArborConfig::default(),
    };
    if let Some(port) = args.port {
        config.server.enabled = true;
        config.server.port = port;
    }
    if args.no_local {
        config.local.enabled = false;
    }
    if args.history.is_some() {
        config.history.path = args.history;
    }
    if !config.local.enabled && !config.server.enabled {
        anyhow::bail!("nothing to serve: enable the local terminal or the server");
    }

    let mut cli = Cli::from_config(menu::demo_menu()?, &config.history)?;
    menu::add_session_commands(&cli)?;
    menu::install_error_handler(&mut cli);
    cli.set_exit_action(|out| out.line("Goodbye and thanks for all the fish."));

    let mut event_loop = EventLoop::with_config(cli, &config.event_loop);

    if config.server.enabled {
        let mut server = SessionServer::tcp(config.server.clone());
        server.set_exit_action(|out| out.line("Terminating this session..."));
        event_loop.attach_server(server)?;
    }

    if config.local.enabled {
        let mut local = LocalTerminal::stdio();
        local.set_banner("Arbor demo. Type 'help' for commands.");
        let handle = event_loop.handle();
        local.set_exit_action(move |out| {
            out.line("Closing App...");
            if let Err(e) = handle.stop() {
                log::warn!("failed to stop event loop: {e}");
            }
        });
        event_loop.attach_local(local)?;
    }

    event_loop.run()?;
    log::info!("Arbor demo exited");
    Ok(())
}
