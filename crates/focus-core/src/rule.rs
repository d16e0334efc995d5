//! Filter rule type
//!
//! A `FilterRule` is the unit of policy: one URL pattern whose matching
//! top-level navigations get redirected while the rule is enabled.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Identifier shared by a filter rule and its enforcement entry
pub type RuleId = u32;

/// A filter rule in the authoritative set
///
/// `pattern` and `created_at` are write-once; only `enabled` changes after
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRule {
    /// Positive, monotonically assigned identifier
    pub id: RuleId,
    /// URL filter expression understood by the enforcement engine
    pub pattern: String,
    /// Disabled rules are kept but never enforced
    pub enabled: bool,
    /// Creation time, milliseconds since the Unix epoch on the wire
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl FilterRule {
    /// Create an enabled rule stamped with the current time
    ///
    /// The stamp is truncated to milliseconds, the resolution it is persisted
    /// with, so a reloaded rule compares equal to the one that was saved.
    pub fn new(id: RuleId, pattern: impl Into<String>) -> Self {
        Self::with_created_at(id, pattern, Utc::now().trunc_subsecs(3))
    }

    /// Create an enabled rule with an explicit creation time (for fixtures and imports)
    pub fn with_created_at(id: RuleId, pattern: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            pattern: pattern.into(),
            enabled: true,
            created_at,
        }
    }

    /// Return a copy with `enabled` set as given
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_new_rule_is_enabled() {
        let rule = FilterRule::new(1, "example.com/*");
        assert!(rule.enabled);
        assert_eq!(rule.id, 1);
        assert_eq!(rule.pattern, "example.com/*");
    }

    #[test]
    fn test_new_rule_survives_wire_round_trip_unchanged() {
        let rule = FilterRule::new(1, "a.com");
        let back: FilterRule = serde_json::from_value(serde_json::to_value(&rule).unwrap()).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_serializes_with_camel_case_and_millis() {
        let created = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let rule = FilterRule::with_created_at(7, "a.com", created);

        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 7,
                "pattern": "a.com",
                "enabled": true,
                "createdAt": 1_700_000_000_123i64
            })
        );
    }

    #[test]
    fn test_deserializes_front_end_record() {
        let raw = r#"{"id":3,"pattern":"b.com","enabled":false,"createdAt":1700000000000}"#;
        let rule: FilterRule = serde_json::from_str(raw).unwrap();
        assert_eq!(rule.id, 3);
        assert!(!rule.enabled);
        assert_eq!(rule.created_at.timestamp_millis(), 1_700_000_000_000);
    }
}
