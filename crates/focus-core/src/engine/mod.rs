//! Enforcement boundary
//!
//! The enforcement engine is the external rule table that actually redirects
//! navigations. The core only ever speaks to it through [`EnforcementEngine`];
//! matching semantics belong to the engine.

mod memory;
mod ruleset;

pub use memory::MemoryEngine;
pub use ruleset::RulesetEngine;

use crate::Result;
use crate::rule::{FilterRule, RuleId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which requests an enforcement rule applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchScope {
    /// Only the top-level document navigation (`main_frame`)
    #[default]
    TopLevelNavigation,
}

/// A rule as the enforcement engine sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcementRule {
    pub id: RuleId,
    pub pattern: String,
    pub redirect_target: String,
    #[serde(default)]
    pub scope: MatchScope,
}

impl EnforcementRule {
    /// Project a filter rule onto the engine's rule shape
    pub fn redirecting(filter: &FilterRule, redirect_target: &str) -> Self {
        Self {
            id: filter.id,
            pattern: filter.pattern.clone(),
            redirect_target: redirect_target.to_string(),
            scope: MatchScope::TopLevelNavigation,
        }
    }
}

/// Asynchronous, id-keyed rule table with no persistence of its own
#[async_trait]
pub trait EnforcementEngine: Send + Sync {
    /// Remove `remove_ids`, then add `add`, as one update
    async fn replace_all(&self, remove_ids: &[RuleId], add: &[EnforcementRule]) -> Result<()>;

    /// Add a single rule
    async fn add(&self, rule: &EnforcementRule) -> Result<()>;

    /// Remove a rule by id; removing an id the engine does not hold is a no-op
    async fn remove_by_id(&self, id: RuleId) -> Result<()>;

    /// Rules currently active in the engine
    async fn list_current(&self) -> Result<Vec<EnforcementRule>>;
}

/// Empty the engine's table, whatever it currently holds
pub async fn clear_engine(engine: &dyn EnforcementEngine) -> Result<()> {
    let ids: Vec<RuleId> = engine.list_current().await?.iter().map(|r| r.id).collect();
    if !ids.is_empty() {
        tracing::debug!(count = ids.len(), "Clearing enforcement rules");
        engine.replace_all(&ids, &[]).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_keeps_id_and_pattern() {
        let filter = FilterRule::new(4, "news.site/*");
        let rule = EnforcementRule::redirecting(&filter, "/interceptor.html");

        assert_eq!(rule.id, 4);
        assert_eq!(rule.pattern, "news.site/*");
        assert_eq!(rule.redirect_target, "/interceptor.html");
        assert_eq!(rule.scope, MatchScope::TopLevelNavigation);
    }

    #[tokio::test]
    async fn test_clear_engine_empties_table() {
        let engine = MemoryEngine::new();
        engine
            .add(&EnforcementRule::redirecting(&FilterRule::new(1, "a.com"), "/x"))
            .await
            .unwrap();
        engine
            .add(&EnforcementRule::redirecting(&FilterRule::new(9, "b.com"), "/x"))
            .await
            .unwrap();

        clear_engine(&engine).await.unwrap();

        assert!(engine.list_current().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_engine_on_empty_table_issues_no_update() {
        let engine = MemoryEngine::new();
        clear_engine(&engine).await.unwrap();
        assert_eq!(engine.update_count(), 0);
    }
}
