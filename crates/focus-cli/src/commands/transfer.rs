//! JSON export and import of filters

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Deserialize;

use crate::client::FilterClient;
use crate::error::{CliError, Result};
use crate::table;

/// File name used when `export` is given no path
pub fn default_export_name(now_millis: i64) -> String {
    format!("focus-filters-{}.json", now_millis)
}

/// Write every filter, sorted by id, as pretty JSON
///
/// Returns the path written.
pub async fn run_export(
    client: &dyn FilterClient,
    path: Option<&Path>,
    out: &mut dyn Write,
) -> Result<PathBuf> {
    let rules = client.list().await?;
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(default_export_name(chrono::Utc::now().timestamp_millis())),
    };

    let json = serde_json::to_string_pretty(&table::sorted(&rules))?;
    fs::write(&path, json + "\n")?;

    writeln!(
        out,
        "{} Exported {} filter(s) to {}",
        "OK".green().bold(),
        rules.len(),
        path.display()
    )?;
    Ok(path)
}

/// An exported record; everything except the pattern is ignored on import
#[derive(Debug, Deserialize)]
struct ImportedFilter {
    pattern: String,
}

/// Add every pattern in `path` that is not present yet
///
/// Returns how many filters were added.
pub async fn run_import(client: &dyn FilterClient, path: &Path, out: &mut dyn Write) -> Result<usize> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::user(format!("Cannot read {}: {}", path.display(), e)))?;
    let imported: Vec<ImportedFilter> = serde_json::from_str(&content)
        .map_err(|e| CliError::user(format!("Failed to import filters: {}", e)))?;

    let mut known: HashSet<String> = client.list().await?.into_iter().map(|r| r.pattern).collect();
    let mut count = 0;
    for filter in imported {
        let pattern = filter.pattern.trim();
        if pattern.is_empty() || known.contains(pattern) {
            continue;
        }
        client.add(pattern).await?;
        known.insert(pattern.to_string());
        count += 1;
    }

    tracing::debug!(path = %path.display(), count, "Imported filters");
    writeln!(out, "{} Imported {} new filter(s)", "OK".green().bold(), count)?;
    Ok(count)
}
