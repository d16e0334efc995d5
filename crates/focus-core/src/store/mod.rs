//! Persistence boundary
//!
//! The store keeps the durable copy of the authoritative filter set. A write
//! replaces the whole snapshot or nothing; there is no per-record persistence.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::Result;
use crate::rule::{FilterRule, RuleId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

fn default_version() -> String {
    "1.0".to_string()
}

fn default_notifications() -> bool {
    true
}

/// Application settings stored alongside the filters
///
/// The sync core never interprets these; it only carries them through
/// every snapshot write so they survive mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub strict_mode: bool,
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strict_mode: false,
            notifications: default_notifications(),
        }
    }
}

/// The persisted state, keyed by `filters`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version for forward compatibility
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub filters: Vec<FilterRule>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: default_version(),
            settings: Settings::default(),
            filters: Vec::new(),
        }
    }
}

impl Snapshot {
    /// Build a snapshot from rules, ordered by id
    pub fn new(mut filters: Vec<FilterRule>, settings: Settings) -> Self {
        filters.sort_by_key(|f| f.id);
        Self {
            version: default_version(),
            settings,
            filters,
        }
    }

    /// Highest id present, if any
    pub fn max_id(&self) -> Option<RuleId> {
        self.filters.iter().map(|f| f.id).max()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Durable key-value storage for the filter snapshot
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Read the last written snapshot, or an empty one on first run
    async fn load(&self) -> Result<Snapshot>;

    /// Replace the persisted snapshot as a single unit
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Become the only core writing this snapshot, for as long as the store lives
    ///
    /// Stores that cannot be shared need nothing here.
    async fn claim(&self) -> Result<()> {
        Ok(())
    }
}
