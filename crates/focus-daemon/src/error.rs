//! Error types for the daemon

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for daemon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving the command channel
#[derive(Debug, Error)]
pub enum Error {
    /// Error from the rule sync core
    #[error(transparent)]
    Core(#[from] focus_core::Error),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error on a connection or on stdio
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Another daemon already answers on the socket
    #[error("socket already in use: {}", path.display())]
    SocketInUse { path: PathBuf },
}
