//! Shared test utilities for the focus-terminal workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`faults`]: store and engine doubles that fail or stall on demand
//! - [`fixtures`]: snapshot and rule builders with fixed timestamps

pub mod faults;
pub mod fixtures;

pub use faults::{DelayedStore, FailingEngine, FailingStore};
pub use fixtures::{rule_at, snapshot_with, stale_rule};
