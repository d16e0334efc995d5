//! Filter management commands
//!
//! Each command fetches what it needs from the core, prints progress to
//! `out`, and returns a [`CliError::User`] for anything the user should fix.

use std::io::Write;

use colored::Colorize;
use focus_core::{CheckStatus, FilterRule};

use crate::client::FilterClient;
use crate::error::{CliError, Result};
use crate::table;

/// Find a rule by numeric id, or else by exact pattern
pub fn resolve<'a>(rules: &'a [FilterRule], identifier: &str) -> Option<&'a FilterRule> {
    let identifier = identifier.trim();
    match identifier.parse::<u32>() {
        Ok(id) => rules.iter().find(|r| r.id == id),
        Err(_) => rules.iter().find(|r| r.pattern == identifier),
    }
}

async fn resolve_remote(client: &dyn FilterClient, identifier: &str) -> Result<FilterRule> {
    let rules = client.list().await?;
    resolve(&rules, identifier)
        .cloned()
        .ok_or_else(|| CliError::user(format!("Filter not found: {}", identifier)))
}

/// Print every rule as a table, disabled rows dimmed
pub async fn run_list(client: &dyn FilterClient, out: &mut dyn Write) -> Result<()> {
    let rules = client.list().await?;
    let sorted = table::sorted(&rules);

    for (i, line) in table::render_rules(&rules).into_iter().enumerate() {
        // Two heading lines precede the rows
        let row = i.checked_sub(2).and_then(|n| sorted.get(n));
        match row {
            _ if i < 2 && !rules.is_empty() => writeln!(out, "{}", line.bold())?,
            Some(rule) if !rule.enabled => writeln!(out, "{}", line.dimmed())?,
            _ => writeln!(out, "{}", line)?,
        }
    }
    Ok(())
}

/// Add a filter unless the same pattern already exists
pub async fn run_block(client: &dyn FilterClient, pattern: &str, out: &mut dyn Write) -> Result<()> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(CliError::user("Usage: block <url-pattern>"));
    }

    let existing = client.list().await?;
    if existing.iter().any(|r| r.pattern == pattern) {
        return Err(CliError::user(format!("Filter already exists: {}", pattern)));
    }

    let rule = client.add(pattern).await?;
    writeln!(
        out,
        "{} Filter added: {} [ID: {}]",
        "OK".green().bold(),
        rule.pattern.cyan(),
        rule.id
    )?;
    Ok(())
}

/// Remove the filter named by id or pattern
pub async fn run_delete(client: &dyn FilterClient, identifier: &str, out: &mut dyn Write) -> Result<()> {
    let rule = resolve_remote(client, identifier).await?;

    if client.remove(rule.id).await? {
        writeln!(out, "{} Filter removed: {}", "OK".green().bold(), rule.pattern)?;
        Ok(())
    } else {
        Err(CliError::user(format!("Filter not found: {}", identifier)))
    }
}

/// Bring the filter named by id or pattern into the requested state
///
/// The core only offers a flip, so a rule already in that state is left alone.
pub async fn run_set_enabled(
    client: &dyn FilterClient,
    identifier: &str,
    enable: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let rule = resolve_remote(client, identifier).await?;
    let verb = if enable { "enabled" } else { "disabled" };

    if rule.enabled == enable {
        writeln!(out, "{} Filter already {}: {}", "WARN".yellow().bold(), verb, rule.pattern)?;
        return Ok(());
    }

    match client.toggle(rule.id).await? {
        Some(updated) => {
            writeln!(out, "{} Filter {}: {}", "OK".green().bold(), verb, updated.pattern)?;
            Ok(())
        }
        None => Err(CliError::user(format!("Filter not found: {}", identifier))),
    }
}

/// Delete every filter
pub async fn run_reset(client: &dyn FilterClient, out: &mut dyn Write) -> Result<()> {
    let count = client.list().await?.len();
    client.clear_all().await?;
    writeln!(out, "{} Removed {} filter(s)", "OK".green().bold(), count)?;
    Ok(())
}

/// Report whether enforcement mirrors the enabled filters
pub async fn run_check(client: &dyn FilterClient, out: &mut dyn Write) -> Result<()> {
    let report = client.check().await?;

    match report.status {
        CheckStatus::Healthy => {
            writeln!(out, "{} Enforcement is in sync", "OK".green().bold())?;
        }
        CheckStatus::Drifted => {
            writeln!(out, "{} Enforcement has drifted:", "WARN".yellow().bold())?;
            for (label, items) in [
                ("missing", &report.missing),
                ("unexpected", &report.unexpected),
                ("drifted", &report.drifted),
            ] {
                for item in items {
                    writeln!(out, "   {} [{}] {}: {}", "-".cyan(), label, item.id, item.description)?;
                }
            }
            writeln!(out, "Restart focusd to reconcile.")?;
        }
    }
    Ok(())
}
