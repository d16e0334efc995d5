//! Rule synchronization core for Focus Terminal
//!
//! This crate owns the authoritative set of URL filter rules and keeps two
//! derived views of it in step:
//!
//! - **Persistence**: the snapshot in a [`RuleStore`], written before any
//!   command is acknowledged
//! - **Enforcement**: the rule table of an [`EnforcementEngine`], which
//!   redirects matching top-level navigations, restricted to enabled rules
//!
//! # Architecture
//!
//! ```text
//!        front ends (terminal, scripts, ...)
//!                      |  (JSON requests)
//!                ServiceHandle  x N
//!                      |  (mpsc queue, one command at a time)
//!                 FilterService
//!                      |
//!                  FilterSync
//!                 /          \
//!          RuleStore    EnforcementEngine
//! ```
//!
//! # Example
//!
//! ```
//! use focus_core::{FilterService, FilterSync, MemoryEngine, MemoryStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> focus_core::Result<()> {
//! let sync = FilterSync::new(MemoryStore::new(), MemoryEngine::new());
//! let (handle, _task) = FilterService::spawn(sync);
//!
//! let rule = handle.add("example.com/*").await?;
//! assert_eq!(rule.id, 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
mod io;
pub mod protocol;
pub mod rule;
pub mod service;
pub mod store;
pub mod sync;

pub use config::Config;
pub use engine::{EnforcementEngine, EnforcementRule, MatchScope, MemoryEngine, RulesetEngine};
pub use error::{Error, Result};
pub use protocol::{Reply, Request};
pub use rule::{FilterRule, RuleId};
pub use service::{FilterService, ServiceHandle};
pub use store::{FileStore, MemoryStore, RuleStore, Settings, Snapshot};
pub use sync::{CheckReport, CheckStatus, FilterSync, Phase};
