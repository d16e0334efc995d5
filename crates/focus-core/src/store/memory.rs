//! In-process snapshot store

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{RuleStore, Snapshot};
use crate::Result;

/// Store that keeps the snapshot in memory
///
/// Clones share the same slot, so a test can keep one handle while the core
/// owns another and then hand the first to a "restarted" core.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<Snapshot>>>,
    writes: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot, as if a previous run had written it
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(snapshot))),
            writes: Arc::default(),
        }
    }

    /// The last written snapshot, `None` if nothing was ever stored
    pub fn current(&self) -> Option<Snapshot> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful `save` calls
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn load(&self) -> Result<Snapshot> {
        Ok(self.current().unwrap_or_default())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
