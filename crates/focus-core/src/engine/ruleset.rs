//! File-published enforcement table
//!
//! Keeps the dynamic rule table in memory and publishes it after every update
//! as a JSON ruleset in the declarative redirect format host-side enforcers
//! consume:
//!
//! ```json
//! [{"id": 1, "priority": 1,
//!   "action": {"type": "redirect", "redirect": {"extensionPath": "/interceptor.html"}},
//!   "condition": {"urlFilter": "example.com/*", "resourceTypes": ["main_frame"]}}]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{EnforcementEngine, EnforcementRule, MatchScope};
use crate::io::{run_blocking, write_atomic};
use crate::rule::RuleId;
use crate::{Error, Result};

const RULE_PRIORITY: u32 = 1;
const MAIN_FRAME: &str = "main_frame";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishedRule {
    id: RuleId,
    priority: u32,
    action: RuleAction,
    condition: RuleCondition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuleAction {
    #[serde(rename = "type")]
    kind: String,
    redirect: Redirect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Redirect {
    extension_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleCondition {
    url_filter: String,
    resource_types: Vec<String>,
}

impl From<&EnforcementRule> for PublishedRule {
    fn from(rule: &EnforcementRule) -> Self {
        let resource_types = match rule.scope {
            MatchScope::TopLevelNavigation => vec![MAIN_FRAME.to_string()],
        };
        Self {
            id: rule.id,
            priority: RULE_PRIORITY,
            action: RuleAction {
                kind: "redirect".to_string(),
                redirect: Redirect {
                    extension_path: rule.redirect_target.clone(),
                },
            },
            condition: RuleCondition {
                url_filter: rule.pattern.clone(),
                resource_types,
            },
        }
    }
}

impl From<PublishedRule> for EnforcementRule {
    fn from(rule: PublishedRule) -> Self {
        Self {
            id: rule.id,
            pattern: rule.condition.url_filter,
            redirect_target: rule.action.redirect.extension_path,
            scope: MatchScope::TopLevelNavigation,
        }
    }
}

/// Enforcement engine that publishes its table to a JSON file
///
/// A new instance picks up whatever file is already on disk, including rules
/// left behind by an earlier process; the sync core clears them at startup.
pub struct RulesetEngine {
    path: PathBuf,
    table: Mutex<BTreeMap<RuleId, EnforcementRule>>,
}

impl RulesetEngine {
    /// Open the ruleset at `path`, adopting any rules already published there
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table = read_published(&path).await?;
        tracing::debug!(path = %path.display(), rules = table.len(), "Opened ruleset");
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    /// Path of the published ruleset
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn publish(&self, table: &BTreeMap<RuleId, EnforcementRule>) -> Result<()> {
        let published: Vec<PublishedRule> = table.values().map(PublishedRule::from).collect();
        let content = serde_json::to_vec_pretty(&published)?;
        let path = self.path.clone();
        run_blocking(&self.path, move || write_atomic(&path, &content)).await
    }

    /// Apply `change` to a copy of the table and keep it only if publishing succeeds
    async fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<RuleId, EnforcementRule>),
    {
        let mut table = self.table.lock().await;
        let mut next = table.clone();
        change(&mut next);
        self.publish(&next).await?;
        *table = next;
        Ok(())
    }
}

async fn read_published(path: &Path) -> Result<BTreeMap<RuleId, EnforcementRule>> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(Error::io(path, e)),
    };
    match serde_json::from_slice::<Vec<PublishedRule>>(&raw) {
        Ok(rules) => Ok(rules
            .into_iter()
            .map(EnforcementRule::from)
            .map(|r| (r.id, r))
            .collect()),
        Err(e) => {
            // The table is derived state, so an unreadable file is simply replaced on next publish
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable ruleset");
            Ok(BTreeMap::new())
        }
    }
}

#[async_trait]
impl EnforcementEngine for RulesetEngine {
    async fn replace_all(&self, remove_ids: &[RuleId], add: &[EnforcementRule]) -> Result<()> {
        self.update(|table| {
            for id in remove_ids {
                table.remove(id);
            }
            for rule in add {
                table.insert(rule.id, rule.clone());
            }
        })
        .await
    }

    async fn add(&self, rule: &EnforcementRule) -> Result<()> {
        self.update(|table| {
            table.insert(rule.id, rule.clone());
        })
        .await
    }

    async fn remove_by_id(&self, id: RuleId) -> Result<()> {
        self.update(|table| {
            table.remove(&id);
        })
        .await
    }

    async fn list_current(&self) -> Result<Vec<EnforcementRule>> {
        Ok(self.table.lock().await.values().cloned().collect())
    }
}
