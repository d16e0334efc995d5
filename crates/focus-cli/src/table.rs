//! Plain-text rendering of a rule listing

use focus_core::FilterRule;

const ID_WIDTH: usize = 4;
const STATUS_WIDTH: usize = 10;
const PATTERN_WIDTH: usize = 32;

const EMPTY_LISTING: &str = "No filters configured.";

/// Status label shown in the listing
pub fn status_label(rule: &FilterRule) -> &'static str {
    if rule.enabled { "[ACTIVE]" } else { "[DISABLED]" }
}

/// Column headings and their underline
pub fn header_lines() -> [String; 2] {
    [
        format!(
            "{:<ID_WIDTH$} {:<STATUS_WIDTH$} {:<PATTERN_WIDTH$} CREATED",
            "ID", "STATUS", "PATTERN"
        ),
        format!(
            "{} {} {} {}",
            "-".repeat(ID_WIDTH),
            "-".repeat(STATUS_WIDTH),
            "-".repeat(PATTERN_WIDTH),
            "-".repeat(10)
        ),
    ]
}

/// One table row; the creation date is shown as a UTC calendar date
pub fn row(rule: &FilterRule) -> String {
    format!(
        "{:<ID_WIDTH$} {:<STATUS_WIDTH$} {:<PATTERN_WIDTH$} {}",
        rule.id,
        status_label(rule),
        rule.pattern,
        rule.created_at.format("%Y-%m-%d")
    )
}

pub fn total_line(count: usize) -> String {
    format!("Total: {} filter(s)", count)
}

/// Rules ordered the way listings show them
pub fn sorted(rules: &[FilterRule]) -> Vec<&FilterRule> {
    let mut sorted: Vec<&FilterRule> = rules.iter().collect();
    sorted.sort_by_key(|r| r.id);
    sorted
}

/// Render `rules` as table lines, sorted by id, with a trailing total
pub fn render_rules(rules: &[FilterRule]) -> Vec<String> {
    if rules.is_empty() {
        return vec![EMPTY_LISTING.to_string()];
    }

    let mut lines: Vec<String> = header_lines().into();
    lines.extend(sorted(rules).into_iter().map(row));
    lines.push(String::new());
    lines.push(total_line(rules.len()));
    lines
}
