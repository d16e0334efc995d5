//! Rule and snapshot builders with deterministic timestamps.

use chrono::{DateTime, Utc};
use focus_core::{EnforcementRule, FilterRule, RuleId, Settings, Snapshot};

/// Fixed creation time used by every fixture (2023-11-14T22:13:20Z)
pub const FIXTURE_MILLIS: i64 = 1_700_000_000_000;

fn fixture_time() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(FIXTURE_MILLIS).unwrap_or_default()
}

/// A rule created at the fixture time
pub fn rule_at(id: RuleId, pattern: &str, enabled: bool) -> FilterRule {
    FilterRule::with_created_at(id, pattern, fixture_time()).enabled(enabled)
}

/// A snapshot holding `(id, pattern, enabled)` records and default settings
pub fn snapshot_with(records: &[(RuleId, &str, bool)]) -> Snapshot {
    Snapshot::new(
        records
            .iter()
            .map(|(id, pattern, enabled)| rule_at(*id, pattern, *enabled))
            .collect(),
        Settings::default(),
    )
}

/// An enforcement entry as a crashed predecessor process might have left it
pub fn stale_rule(id: RuleId, pattern: &str) -> EnforcementRule {
    EnforcementRule::redirecting(&rule_at(id, pattern, true), "/interceptor.html")
}
