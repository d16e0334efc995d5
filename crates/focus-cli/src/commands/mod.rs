//! Command implementations for focus-cli

pub mod filters;
pub mod transfer;

pub use filters::{run_block, run_check, run_delete, run_list, run_reset, run_set_enabled};
pub use transfer::{run_export, run_import};
