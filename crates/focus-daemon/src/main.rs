//! Focus Terminal daemon
//!
//! # Usage
//!
//! ```bash
//! focusd [--config <path>] [--socket <path>] [--stdio]
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Control log verbosity (default: `focus_daemon=info,focus_core=info`)
//!
//! Logs go to stderr so that stdout stays free for the stdio transport.

use std::path::PathBuf;

use clap::Parser;
use focus_core::config::default_config_path;
use focus_core::{Config, FilterService};
use focus_daemon::FocusServer;

/// Rule sync daemon for Focus Terminal
#[derive(Parser)]
#[command(name = "focusd")]
#[command(about = "Rule sync daemon for Focus Terminal")]
#[command(version)]
struct Args {
    /// Path to focus.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Socket to listen on (overrides the config file)
    #[arg(short, long, conflicts_with = "stdio")]
    socket: Option<PathBuf>,

    /// Serve a single client over stdin/stdout instead of a socket
    #[arg(long)]
    stdio: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("focus_daemon=info".parse()?)
                .add_directive("focus_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = args.config.unwrap_or_else(default_config_path);
    let mut config = Config::load_or_default(&config_path)?;
    if let Some(socket) = args.socket {
        config.server.socket = socket;
    }

    tracing::info!(
        config = %config_path.display(),
        storage = %config.storage.path.display(),
        backend = ?config.enforcement.backend,
        "Starting focusd"
    );

    let mut sync = config.build_sync().await?;
    // Refuse to run next to another core that owns the same filters
    sync.start().await?;
    let (handle, task) = FilterService::spawn_with_capacity(sync, config.server.queue_depth);
    let server = FocusServer::new(handle);

    if args.stdio {
        server.run_stdio().await?;
        // The service stops once the last handle is gone
        drop(server);
        let sync = task.await?;
        tracing::info!(divergences = sync.divergences(), "focusd stopped");
    } else {
        // Connection tasks may still hold handles; the runtime drops them on exit
        run_socket(&server, &config).await?;
        tracing::info!("focusd stopped");
    }

    Ok(())
}

#[cfg(unix)]
async fn run_socket(server: &FocusServer, config: &Config) -> focus_daemon::Result<()> {
    server
        .run_unix(&config.server.socket, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Could not listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown requested");
        })
        .await
}

#[cfg(not(unix))]
async fn run_socket(_server: &FocusServer, _config: &Config) -> focus_daemon::Result<()> {
    Err(focus_daemon::Error::Io(std::io::Error::other(
        "unix sockets are unavailable on this platform, use --stdio",
    )))
}
