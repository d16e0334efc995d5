//! Enforcement drift reporting
//!
//! Compares the engine's live table against the enabled subset of the
//! authoritative set. Reporting only; the startup reconciliation heals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::EnforcementRule;
use crate::rule::{FilterRule, RuleId};

/// Overall result of a drift check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Engine table mirrors the enabled rules exactly
    Healthy,
    /// At least one id is missing, unexpected, or carries the wrong pattern
    Drifted,
}

/// One id whose enforcement entry disagrees with the authoritative set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftItem {
    pub id: RuleId,
    pub description: String,
}

/// Report from a drift check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub status: CheckStatus,
    /// Enabled rules with no enforcement entry
    pub missing: Vec<DriftItem>,
    /// Enforcement entries with no enabled rule behind them
    pub unexpected: Vec<DriftItem>,
    /// Entries present on both sides whose pattern differs
    pub drifted: Vec<DriftItem>,
}

impl CheckReport {
    /// Create a healthy check report with no issues
    pub fn healthy() -> Self {
        Self {
            status: CheckStatus::Healthy,
            missing: Vec::new(),
            unexpected: Vec::new(),
            drifted: Vec::new(),
        }
    }

    /// Diff the authoritative rules against the engine's current table
    pub fn compare<'a>(
        rules: impl IntoIterator<Item = &'a FilterRule>,
        active: &[EnforcementRule],
    ) -> Self {
        let enabled: BTreeMap<RuleId, &FilterRule> = rules
            .into_iter()
            .filter(|r| r.enabled)
            .map(|r| (r.id, r))
            .collect();
        let live: BTreeMap<RuleId, &EnforcementRule> = active.iter().map(|r| (r.id, r)).collect();

        let mut report = Self::healthy();
        for (id, rule) in &enabled {
            match live.get(id) {
                None => report.missing.push(DriftItem {
                    id: *id,
                    description: format!("Enabled rule '{}' is not enforced", rule.pattern),
                }),
                Some(entry) if entry.pattern != rule.pattern => report.drifted.push(DriftItem {
                    id: *id,
                    description: format!(
                        "Pattern mismatch: expected '{}', engine has '{}'",
                        rule.pattern, entry.pattern
                    ),
                }),
                Some(_) => {}
            }
        }
        for (id, entry) in &live {
            if !enabled.contains_key(id) {
                report.unexpected.push(DriftItem {
                    id: *id,
                    description: format!("Engine enforces '{}' with no enabled rule", entry.pattern),
                });
            }
        }

        if !report.is_healthy() {
            report.status = CheckStatus::Drifted;
        }
        report
    }

    pub fn is_healthy(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.drifted.is_empty()
    }
}
