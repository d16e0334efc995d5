//! In-process enforcement table

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{EnforcementEngine, EnforcementRule};
use crate::Result;
use crate::rule::RuleId;

/// Enforcement engine holding its table in memory
///
/// Clones share one table. Adding an id that is already present replaces the
/// entry, so the table never holds two rules with the same id.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    table: Arc<Mutex<BTreeMap<RuleId, EnforcementRule>>>,
    updates: Arc<Mutex<usize>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with rules already installed, as a crashed predecessor might leave them
    pub fn with_rules(rules: impl IntoIterator<Item = EnforcementRule>) -> Self {
        let engine = Self::new();
        {
            let mut table = engine.table();
            for rule in rules {
                table.insert(rule.id, rule);
            }
        }
        engine
    }

    /// Ids currently in the table, ascending
    pub fn active_ids(&self) -> Vec<RuleId> {
        self.table().keys().copied().collect()
    }

    /// Number of mutating calls received
    pub fn update_count(&self) -> usize {
        *self.updates.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn table(&self) -> MutexGuard<'_, BTreeMap<RuleId, EnforcementRule>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        *self.updates.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }
}

#[async_trait]
impl EnforcementEngine for MemoryEngine {
    async fn replace_all(&self, remove_ids: &[RuleId], add: &[EnforcementRule]) -> Result<()> {
        let mut table = self.table();
        for id in remove_ids {
            table.remove(id);
        }
        for rule in add {
            table.insert(rule.id, rule.clone());
        }
        drop(table);
        self.bump();
        Ok(())
    }

    async fn add(&self, rule: &EnforcementRule) -> Result<()> {
        self.table().insert(rule.id, rule.clone());
        self.bump();
        Ok(())
    }

    async fn remove_by_id(&self, id: RuleId) -> Result<()> {
        self.table().remove(&id);
        self.bump();
        Ok(())
    }

    async fn list_current(&self) -> Result<Vec<EnforcementRule>> {
        Ok(self.table().values().cloned().collect())
    }
}
