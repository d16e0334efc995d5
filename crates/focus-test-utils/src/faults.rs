//! Store and engine doubles with switchable failures.
//!
//! Each double wraps the in-memory implementation from `focus-core` and
//! shares state across clones, so a test keeps one clone as a remote control
//! while the core owns another.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use focus_core::{
    EnforcementEngine, EnforcementRule, Error, MemoryEngine, MemoryStore, Result, RuleId,
    RuleStore, Snapshot,
};

/// A [`MemoryStore`] whose reads and writes can be made to fail
#[derive(Debug, Clone, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_saves: Arc<AtomicBool>,
    fail_loads: Arc<AtomicBool>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: MemoryStore::with_snapshot(snapshot),
            ..Self::default()
        }
    }

    /// Make every subsequent `save` fail (or succeed again)
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `load` fail (or succeed again)
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// The last snapshot actually written
    pub fn current(&self) -> Option<Snapshot> {
        self.inner.current()
    }

    pub fn write_count(&self) -> usize {
        self.inner.write_count()
    }
}

#[async_trait]
impl RuleStore for FailingStore {
    async fn load(&self) -> Result<Snapshot> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(Error::io(
                "memory://filters",
                std::io::Error::other("injected load failure"),
            ));
        }
        self.inner.load().await
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::io(
                "memory://filters",
                std::io::Error::new(std::io::ErrorKind::StorageFull, "injected save failure"),
            ));
        }
        self.inner.save(snapshot).await
    }
}

/// A [`MemoryEngine`] whose calls can be made to fail
#[derive(Debug, Clone, Default)]
pub struct FailingEngine {
    inner: MemoryEngine,
    failing: Arc<AtomicBool>,
}

impl FailingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with rules already installed
    pub fn with_rules(rules: impl IntoIterator<Item = EnforcementRule>) -> Self {
        Self {
            inner: MemoryEngine::with_rules(rules),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail (or succeed again)
    pub fn fail(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub fn active_ids(&self) -> Vec<RuleId> {
        self.inner.active_ids()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::enforcement("injected engine failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EnforcementEngine for FailingEngine {
    async fn replace_all(&self, remove_ids: &[RuleId], add: &[EnforcementRule]) -> Result<()> {
        self.check()?;
        self.inner.replace_all(remove_ids, add).await
    }

    async fn add(&self, rule: &EnforcementRule) -> Result<()> {
        self.check()?;
        self.inner.add(rule).await
    }

    async fn remove_by_id(&self, id: RuleId) -> Result<()> {
        self.check()?;
        self.inner.remove_by_id(id).await
    }

    async fn list_current(&self) -> Result<Vec<EnforcementRule>> {
        self.check()?;
        self.inner.list_current().await
    }
}

/// A [`MemoryStore`] whose `load` stalls, to hold the core in `Loading`
#[derive(Debug, Clone)]
pub struct DelayedStore {
    inner: MemoryStore,
    delay: Duration,
}

impl DelayedStore {
    pub fn new(inner: MemoryStore, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl RuleStore for DelayedStore {
    async fn load(&self) -> Result<Snapshot> {
        tokio::time::sleep(self.delay).await;
        self.inner.load().await
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.inner.save(snapshot).await
    }
}
