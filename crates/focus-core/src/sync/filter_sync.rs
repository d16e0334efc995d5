//! FilterSync implementation
//!
//! `FilterSync` owns the authoritative filter set and keeps the persisted
//! snapshot and the enforcement engine's table derived from it.
//!
//! Every mutating command runs the same three steps in order:
//!
//! 1. mutate the authoritative map
//! 2. persist the whole snapshot; on failure restore the map and stop
//! 3. issue the minimal enforcement delta; on failure log the divergence and
//!    keep the persisted intent, the next startup rebuilds the engine table
//!
//! Commands take `&mut self`, so one command is in flight at a time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::{EnforcementEngine, EnforcementRule, clear_engine};
use crate::rule::{FilterRule, RuleId};
use crate::store::{RuleStore, Settings, Snapshot};
use crate::{Error, Result};

use super::check::CheckReport;

/// Path of the page navigations are redirected to
pub const DEFAULT_REDIRECT_TARGET: &str = "/interceptor.html";

/// Lifecycle of the sync core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Constructed, startup reconciliation not yet run
    Uninitialized,
    /// Startup reconciliation in progress
    Loading,
    /// Serving commands
    Ready,
}

/// The rule synchronization core
pub struct FilterSync {
    store: Box<dyn RuleStore>,
    engine: Box<dyn EnforcementEngine>,
    redirect_target: String,
    phase: Phase,
    rules: BTreeMap<RuleId, FilterRule>,
    next_id: RuleId,
    settings: Settings,
    divergences: u64,
}

impl FilterSync {
    /// Create a core over the given store and engine
    ///
    /// Nothing is read or enforced until [`FilterSync::start`] runs.
    pub fn new(store: impl RuleStore + 'static, engine: impl EnforcementEngine + 'static) -> Self {
        Self::from_boxed(Box::new(store), Box::new(engine))
    }

    /// Create a core over already boxed collaborators
    pub fn from_boxed(store: Box<dyn RuleStore>, engine: Box<dyn EnforcementEngine>) -> Self {
        Self {
            store,
            engine,
            redirect_target: DEFAULT_REDIRECT_TARGET.to_string(),
            phase: Phase::Uninitialized,
            rules: BTreeMap::new(),
            next_id: 1,
            settings: Settings::default(),
            divergences: 0,
        }
    }

    /// Redirect enforced navigations to `target` instead of the default page
    pub fn with_redirect_target(mut self, target: impl Into<String>) -> Self {
        self.redirect_target = target.into();
        self
    }

    /// Run the startup reconciliation and move to `Ready`
    ///
    /// Loads the persisted snapshot, empties the engine table regardless of
    /// what an earlier process left there, then re-applies every enabled rule.
    /// If the snapshot cannot be read the core returns to `Uninitialized` and
    /// `start` may be called again.
    pub async fn start(&mut self) -> Result<()> {
        if self.phase == Phase::Ready {
            return Ok(());
        }
        self.phase = Phase::Loading;
        tracing::info!("Loading persisted filters");

        // Nothing is read or enforced unless this core is the only owner
        if let Err(e) = self.store.claim().await {
            tracing::error!(error = %e, "Persisted filters are owned by another core");
            self.phase = Phase::Uninitialized;
            return Err(e);
        }

        let snapshot = match self.store.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load persisted filters");
                self.phase = Phase::Uninitialized;
                return Err(e);
            }
        };

        // Must finish before any rule is re-applied: stale ids could collide
        if let Err(e) = clear_engine(self.engine.as_ref()).await {
            self.record_divergence("clear", None, &e);
        }

        self.rules.clear();
        for filter in snapshot.filters {
            let id = filter.id;
            if filter.enabled {
                let rule = EnforcementRule::redirecting(&filter, &self.redirect_target);
                if let Err(e) = self.engine.add(&rule).await {
                    self.record_divergence("add", Some(id), &e);
                }
            }
            if self.rules.insert(id, filter).is_some() {
                tracing::warn!(id, "Snapshot holds duplicate id, keeping the last record");
            }
        }
        // A snapshot holding RuleId::MAX leaves nothing to allocate; add reports it
        self.next_id = self
            .rules
            .keys()
            .next_back()
            .map_or(1, |max| max.saturating_add(1));
        self.settings = snapshot.settings;
        self.phase = Phase::Ready;

        tracing::info!(
            rules = self.rules.len(),
            next_id = self.next_id,
            "Rule sync core ready"
        );
        Ok(())
    }

    /// Add an enabled rule for `pattern` under a freshly allocated id
    ///
    /// Duplicate patterns are accepted; rejecting them is the caller's policy.
    pub async fn add(&mut self, pattern: &str) -> Result<FilterRule> {
        self.ensure_ready()?;
        if pattern.trim().is_empty() {
            return Err(Error::EmptyPattern);
        }

        // Ids are not handed back on failure, so allocation stays strictly increasing
        let id = self.next_id;
        let Some(following) = id.checked_add(1) else {
            tracing::error!(id, "Filter id space exhausted");
            return Err(Error::IdSpaceExhausted);
        };
        self.next_id = following;
        let filter = FilterRule::new(id, pattern);
        self.rules.insert(id, filter.clone());

        if let Err(e) = self.persist().await {
            self.rules.remove(&id);
            return Err(e);
        }

        let rule = EnforcementRule::redirecting(&filter, &self.redirect_target);
        if let Err(e) = self.engine.add(&rule).await {
            self.record_divergence("add", Some(id), &e);
        }

        tracing::info!(id, pattern = %filter.pattern, "Filter added");
        Ok(filter)
    }

    /// Remove the rule with `id`; `false` if there is no such rule
    pub async fn remove(&mut self, id: RuleId) -> Result<bool> {
        self.ensure_ready()?;
        let Some(removed) = self.rules.remove(&id) else {
            tracing::debug!(id, "Remove of unknown id ignored");
            return Ok(false);
        };

        if let Err(e) = self.persist().await {
            self.rules.insert(id, removed);
            return Err(e);
        }

        // Issued even for disabled rules; removing an absent id is a no-op for the engine
        if let Err(e) = self.engine.remove_by_id(id).await {
            self.record_divergence("remove", Some(id), &e);
        }

        tracing::info!(id, pattern = %removed.pattern, "Filter removed");
        Ok(true)
    }

    /// Flip `enabled` on the rule with `id`; `None` if there is no such rule
    pub async fn toggle(&mut self, id: RuleId) -> Result<Option<FilterRule>> {
        self.ensure_ready()?;
        let Some(filter) = self.rules.get_mut(&id) else {
            tracing::debug!(id, "Toggle of unknown id ignored");
            return Ok(None);
        };
        filter.enabled = !filter.enabled;
        let updated = filter.clone();

        if let Err(e) = self.persist().await {
            if let Some(filter) = self.rules.get_mut(&id) {
                filter.enabled = !filter.enabled;
            }
            return Err(e);
        }

        let result = if updated.enabled {
            let rule = EnforcementRule::redirecting(&updated, &self.redirect_target);
            self.engine.add(&rule).await
        } else {
            self.engine.remove_by_id(id).await
        };
        if let Err(e) = result {
            let op = if updated.enabled { "add" } else { "remove" };
            self.record_divergence(op, Some(id), &e);
        }

        tracing::info!(id, enabled = updated.enabled, "Filter toggled");
        Ok(Some(updated))
    }

    /// All rules, ascending by id
    pub fn list(&self) -> Result<Vec<FilterRule>> {
        self.ensure_ready()?;
        Ok(self.rules.values().cloned().collect())
    }

    /// Drop every rule, reset id allocation to 1, and empty the engine table
    pub async fn clear_all(&mut self) -> Result<()> {
        self.ensure_ready()?;
        let previous = std::mem::take(&mut self.rules);
        let previous_next_id = std::mem::replace(&mut self.next_id, 1);

        if let Err(e) = self.persist().await {
            self.rules = previous;
            self.next_id = previous_next_id;
            return Err(e);
        }

        if let Err(e) = clear_engine(self.engine.as_ref()).await {
            self.record_divergence("clear", None, &e);
        }

        tracing::info!(removed = previous.len(), "All filters cleared");
        Ok(())
    }

    /// Compare the engine's live table against the enabled rules
    pub async fn check(&self) -> Result<CheckReport> {
        self.ensure_ready()?;
        let active = self.engine.list_current().await?;
        Ok(CheckReport::compare(self.rules.values(), &active))
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Id the next `add` will receive
    pub fn next_id(&self) -> RuleId {
        self.next_id
    }

    /// Settings carried alongside the filters
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Enforcement calls that failed since construction
    pub fn divergences(&self) -> u64 {
        self.divergences
    }

    /// Redirect target applied to enforced rules
    pub fn redirect_target(&self) -> &str {
        &self.redirect_target
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.phase {
            Phase::Ready => Ok(()),
            Phase::Uninitialized | Phase::Loading => Err(Error::Busy),
        }
    }

    async fn persist(&self) -> Result<()> {
        let snapshot = Snapshot::new(self.rules.values().cloned().collect(), self.settings.clone());
        self.store.save(&snapshot).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to persist filters, rolling back");
            Error::Persistence {
                reason: e.to_string(),
            }
        })
    }

    fn record_divergence(&mut self, op: &str, id: Option<RuleId>, error: &Error) {
        self.divergences += 1;
        tracing::warn!(
            op,
            id = ?id,
            error = %error,
            "Enforcement diverged from persisted filters until next startup"
        );
    }
}

impl std::fmt::Debug for FilterSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterSync")
            .field("phase", &self.phase)
            .field("rules", &self.rules.len())
            .field("next_id", &self.next_id)
            .field("divergences", &self.divergences)
            .finish_non_exhaustive()
    }
}
