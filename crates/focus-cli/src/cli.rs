//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Focus Terminal - block distracting sites from the command line
#[derive(Parser, Debug)]
#[command(name = "focus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Socket of the focusd daemon
    #[arg(long, global = true, env = "FOCUS_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Run the rule sync core inside this process instead of talking to focusd
    #[arg(long, global = true)]
    pub embedded: bool,

    /// Path to focus.toml (used for defaults and by --embedded)
    #[arg(short, long, global = true, env = "FOCUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to run; without one an interactive terminal starts
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List all filters
    #[command(visible_alias = "list")]
    Ls,

    /// Add a new filter
    ///
    /// Examples:
    ///   focus block news.example.com
    ///   focus block "reddit.com/r/*"
    #[command(visible_alias = "add")]
    Block {
        /// URL pattern to block
        pattern: String,
    },

    /// Remove a filter by id or pattern
    #[command(visible_aliases = ["rm", "remove"])]
    Delete {
        /// Filter id or exact pattern
        target: String,
    },

    /// Enable a filter by id or pattern
    Enable {
        /// Filter id or exact pattern
        target: String,
    },

    /// Disable a filter by id or pattern
    Disable {
        /// Filter id or exact pattern
        target: String,
    },

    /// Export filters to a JSON file
    Export {
        /// Output file (defaults to focus-filters-<timestamp>.json)
        file: Option<PathBuf>,
    },

    /// Import filters from a JSON file, skipping patterns already present
    Import {
        /// JSON file written by `focus export`
        file: PathBuf,
    },

    /// Verify that enforcement matches the enabled filters
    Check,

    /// Remove every filter
    Reset {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Start the interactive terminal
    Shell,
}
