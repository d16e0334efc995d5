//! Focus Terminal CLI
//!
//! Terminal front end for the rule sync core. Talks to a running `focusd`
//! over its socket, or hosts the core in-process with `--embedded`.

mod cli;
mod client;
mod commands;
mod error;
mod repl;
mod table;

use clap::Parser;
use colored::Colorize;
use dialoguer::Confirm;
use focus_core::config::default_config_path;
use focus_core::{Config, FilterService};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use client::{FilterClient, LocalClient};
use error::{CliError, Result};
use repl::Repl;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing if verbose
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| CliError::user(format!("Failed to set tracing subscriber: {}", e)))?;
        tracing::debug!("Verbose mode enabled");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(connect_and_execute(cli))
}

async fn connect_and_execute(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    if cli.embedded {
        let config = Config::load_or_default(&config_path)?;
        let mut sync = config.build_sync().await?;
        // Fails fast when focusd or another embedded run owns the same filters
        sync.start().await?;
        let (handle, task) = FilterService::spawn_with_capacity(sync, config.server.queue_depth);
        let client = LocalClient::new(handle);

        let result = execute_command(&client, cli.command).await;

        drop(client);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Embedded core did not shut down cleanly");
        }
        return result;
    }

    let socket = match cli.socket {
        Some(socket) => socket,
        None => Config::load_or_default(&config_path)?.server.socket,
    };
    connect_socket(&socket, cli.command).await
}

#[cfg(unix)]
async fn connect_socket(socket: &std::path::Path, command: Option<Commands>) -> Result<()> {
    let client = client::SocketClient::connect(socket).await?;
    execute_command(&client, command).await
}

#[cfg(not(unix))]
async fn connect_socket(_socket: &std::path::Path, _command: Option<Commands>) -> Result<()> {
    Err(CliError::user(
        "focusd sockets are unavailable on this platform, use --embedded",
    ))
}

async fn execute_command(client: &dyn FilterClient, command: Option<Commands>) -> Result<()> {
    let mut out = std::io::stdout();
    match command {
        None | Some(Commands::Shell) => Repl::new(client).run().await,
        Some(Commands::Ls) => commands::run_list(client, &mut out).await,
        Some(Commands::Block { pattern }) => commands::run_block(client, &pattern, &mut out).await,
        Some(Commands::Delete { target }) => commands::run_delete(client, &target, &mut out).await,
        Some(Commands::Enable { target }) => {
            commands::run_set_enabled(client, &target, true, &mut out).await
        }
        Some(Commands::Disable { target }) => {
            commands::run_set_enabled(client, &target, false, &mut out).await
        }
        Some(Commands::Export { file }) => commands::run_export(client, file.as_deref(), &mut out)
            .await
            .map(|_| ()),
        Some(Commands::Import { file }) => commands::run_import(client, &file, &mut out)
            .await
            .map(|_| ()),
        Some(Commands::Check) => commands::run_check(client, &mut out).await,
        Some(Commands::Reset { yes }) => {
            let confirmed = yes
                || Confirm::new()
                    .with_prompt("Remove every filter?")
                    .default(false)
                    .interact()?;
            if confirmed {
                commands::run_reset(client, &mut out).await
            } else {
                println!("Reset cancelled.");
                Ok(())
            }
        }
    }
}
