//! Interactive terminal
//!
//! Reads one command per line. On a terminal the prompt comes from dialoguer
//! with history; piped input is read line by line without prompting.

use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use colored::Colorize;
use dialoguer::{BasicHistory, Confirm, Input};

use crate::client::FilterClient;
use crate::commands;
use crate::error::{CliError, Result};

const PROMPT: &str = "focus";

const HELP: &[&str] = &[
    "Available commands:",
    "",
    "  ls                - List all filters",
    "  block <url>       - Add a new filter",
    "  delete <id|url>   - Remove a filter",
    "  enable <id|url>   - Enable a filter",
    "  disable <id|url>  - Disable a filter",
    "  export [file]     - Export filters to JSON",
    "  import <file>     - Import filters from JSON",
    "  check             - Verify enforcement matches the filters",
    "  reset [-y]        - Remove every filter",
    "  clear             - Clear terminal output",
    "  help              - Show this help message",
    "  exit              - Close the terminal",
];

/// One parsed terminal line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    List,
    Block(String),
    Delete(String),
    Enable(String),
    Disable(String),
    Export(Option<PathBuf>),
    Import(PathBuf),
    Check,
    Reset { assume_yes: bool },
    Clear,
    Help,
    Exit,
}

/// Parse a line; blank input yields `None`
///
/// Only the command word is case-insensitive, arguments are kept verbatim.
pub fn parse_line(line: &str) -> Result<Option<ReplCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let required = |usage: &str| {
        if rest.is_empty() {
            Err(CliError::user(format!("Usage: {}", usage)))
        } else {
            Ok(rest.to_string())
        }
    };

    let command = match word.to_lowercase().as_str() {
        "ls" | "list" => ReplCommand::List,
        "block" | "add" => ReplCommand::Block(required("block <url-pattern>")?),
        "delete" | "rm" | "remove" => ReplCommand::Delete(required("delete <id|url-pattern>")?),
        "enable" => ReplCommand::Enable(required("enable <id|url-pattern>")?),
        "disable" => ReplCommand::Disable(required("disable <id|url-pattern>")?),
        "export" => ReplCommand::Export((!rest.is_empty()).then(|| PathBuf::from(rest))),
        "import" => ReplCommand::Import(PathBuf::from(required("import <file>")?)),
        "check" | "status" => ReplCommand::Check,
        "reset" => ReplCommand::Reset {
            assume_yes: matches!(rest, "-y" | "--yes"),
        },
        "clear" | "cls" => ReplCommand::Clear,
        "help" | "?" => ReplCommand::Help,
        "exit" | "quit" => ReplCommand::Exit,
        other => {
            return Err(CliError::user(format!(
                "Command not found: {}. Type 'help' for available commands.",
                other
            )));
        }
    };
    Ok(Some(command))
}

/// Whether the loop should keep reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

type ConfirmFn<'a> = Box<dyn FnMut(&str) -> Result<bool> + 'a>;

/// Interactive session bound to one client
pub struct Repl<'a> {
    client: &'a dyn FilterClient,
    confirm: ConfirmFn<'a>,
}

impl<'a> Repl<'a> {
    /// A session that asks for confirmation on the terminal
    pub fn new(client: &'a dyn FilterClient) -> Self {
        Self {
            client,
            confirm: Box::new(|prompt: &str| {
                Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
            }),
        }
    }

    /// Replace the confirmation prompt
    pub fn with_confirm(mut self, confirm: impl FnMut(&str) -> Result<bool> + 'a) -> Self {
        self.confirm = Box::new(confirm);
        self
    }

    /// Run until `exit` or end of input
    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{}", format!("FOCUS TERMINAL v{}", env!("CARGO_PKG_VERSION")).bold())?;
        writeln!(stdout, "Type \"help\" for available commands")?;
        writeln!(stdout)?;

        if std::io::stdin().is_terminal() {
            let mut history = BasicHistory::new().max_entries(100).no_duplicates(true);
            loop {
                let line = match Input::<String>::new()
                    .with_prompt(PROMPT)
                    .allow_empty(true)
                    .history_with(&mut history)
                    .interact_text()
                {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::debug!(error = %e, "Prompt closed");
                        break;
                    }
                };
                if self.step(&line, &mut stdout).await? == Flow::Exit {
                    break;
                }
            }
        } else {
            for line in std::io::stdin().lines() {
                if self.step(&line?, &mut stdout).await? == Flow::Exit {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Execute one line, printing command errors instead of returning them
    ///
    /// Only a lost connection to the daemon ends the session.
    pub async fn step(&mut self, line: &str, out: &mut dyn Write) -> Result<Flow> {
        match self.execute(line, out).await {
            Ok(flow) => Ok(flow),
            Err(e @ CliError::Connect { .. }) => Err(e),
            Err(e) => {
                writeln!(out, "{} {}", "ERROR".red().bold(), e)?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Execute one line
    pub async fn execute(&mut self, line: &str, out: &mut dyn Write) -> Result<Flow> {
        let Some(command) = parse_line(line)? else {
            return Ok(Flow::Continue);
        };
        tracing::debug!(?command, "Executing terminal command");

        match command {
            ReplCommand::List => commands::run_list(self.client, out).await?,
            ReplCommand::Block(pattern) => commands::run_block(self.client, &pattern, out).await?,
            ReplCommand::Delete(target) => commands::run_delete(self.client, &target, out).await?,
            ReplCommand::Enable(target) => {
                commands::run_set_enabled(self.client, &target, true, out).await?
            }
            ReplCommand::Disable(target) => {
                commands::run_set_enabled(self.client, &target, false, out).await?
            }
            ReplCommand::Export(path) => {
                commands::run_export(self.client, path.as_deref(), out).await?;
            }
            ReplCommand::Import(path) => {
                commands::run_import(self.client, &path, out).await?;
            }
            ReplCommand::Check => commands::run_check(self.client, out).await?,
            ReplCommand::Reset { assume_yes } => {
                if assume_yes || (self.confirm)("Remove every filter?")? {
                    commands::run_reset(self.client, out).await?;
                } else {
                    writeln!(out, "Reset cancelled.")?;
                }
            }
            ReplCommand::Clear => write!(out, "\x1B[2J\x1B[1;1H")?,
            ReplCommand::Help => {
                for line in HELP {
                    writeln!(out, "{}", line)?;
                }
            }
            ReplCommand::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }
}
