//! Error types for focus-core

use std::path::PathBuf;

/// Result type for focus-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in focus-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure against a specific path
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Advisory lock could not be taken
    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    /// The snapshot write did not complete; the command was rolled back
    #[error("Persistence failed: {reason}")]
    Persistence { reason: String },

    /// The enforcement engine rejected or failed a call
    #[error("Enforcement engine error: {message}")]
    Enforcement { message: String },

    /// Filter patterns must contain at least one non-whitespace character
    #[error("Filter pattern must not be empty")]
    EmptyPattern,

    /// Every id up to `RuleId::MAX` has been handed out
    #[error("No filter ids left to allocate")]
    IdSpaceExhausted,

    /// A command reached the core before startup reconciliation finished
    #[error("Rule sync core is still loading, retry shortly")]
    Busy,

    /// The request `type` is not one the core understands
    #[error("Unknown request type")]
    UnknownRequest,

    /// The request `type` is known but its payload is malformed
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The command service task is gone
    #[error("Filter service has shut down")]
    ServiceClosed,

    /// Configuration could not be resolved
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn enforcement(message: impl Into<String>) -> Self {
        Self::Enforcement {
            message: message.into(),
        }
    }

    /// Whether the caller may simply resubmit the same command later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy)
    }
}
