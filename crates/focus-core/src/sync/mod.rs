//! Rule synchronization between the authoritative set, the store, and the engine
//!
//! This module provides:
//! - **filter_sync**: the `FilterSync` state machine and its command surface
//! - **check**: drift reporting between the enabled rules and the engine table

mod check;
mod filter_sync;

pub use check::{CheckReport, CheckStatus, DriftItem};
pub use filter_sync::{DEFAULT_REDIRECT_TARGET, FilterSync, Phase};
