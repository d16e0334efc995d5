//! Configuration parsing for focus.toml
//!
//! Every section is optional; missing values fall back to per-user
//! platform directories.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::{MemoryEngine, RulesetEngine};
use crate::service::DEFAULT_QUEUE_DEPTH;
use crate::store::FileStore;
use crate::sync::{DEFAULT_REDIRECT_TARGET, FilterSync};
use crate::{Error, Result};

/// Directory holding the snapshot and the published ruleset
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("focus")
}

/// Default location of focus.toml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("focus")
        .join("focus.toml")
}

/// Default location of the daemon socket
pub fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("focusd.sock")
}

/// Where the persisted snapshot lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub path: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            path: default_data_dir().join("filters.toml"),
        }
    }
}

/// Which enforcement engine backs the core
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineBackend {
    /// Publish the rule table as a JSON ruleset file
    #[default]
    Ruleset,
    /// Keep the table in memory only
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementSection {
    pub backend: EngineBackend,
    pub ruleset_path: PathBuf,
    pub redirect_target: String,
}

impl Default for EnforcementSection {
    fn default() -> Self {
        Self {
            backend: EngineBackend::default(),
            ruleset_path: default_data_dir().join("ruleset.json"),
            redirect_target: DEFAULT_REDIRECT_TARGET.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub socket: PathBuf,
    /// Requests allowed to wait while another command runs
    pub queue_depth: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            socket: default_socket_path(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

/// Parsed focus.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageSection,
    pub enforcement: EnforcementSection,
    pub server: ServerSection,
}

impl Config {
    /// Parse a config from TOML content
    ///
    /// # Example
    ///
    /// ```
    /// use focus_core::config::{Config, EngineBackend};
    ///
    /// let config = Config::parse(r#"
    /// [enforcement]
    /// backend = "memory"
    /// "#).unwrap();
    /// assert_eq!(config.enforcement.backend, EngineBackend::Memory);
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&content)
    }

    /// Load the config at `path`, or defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.enforcement.redirect_target.trim().is_empty() {
            return Err(Error::Config {
                message: "enforcement.redirect_target must not be empty".to_string(),
            });
        }
        if self.server.queue_depth == 0 {
            return Err(Error::Config {
                message: "server.queue_depth must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Construct the sync core this config describes
    ///
    /// The core is returned unstarted.
    pub async fn build_sync(&self) -> Result<FilterSync> {
        let store = FileStore::new(&self.storage.path);
        let sync = match self.enforcement.backend {
            EngineBackend::Ruleset => {
                let engine = RulesetEngine::open(&self.enforcement.ruleset_path).await?;
                FilterSync::new(store, engine)
            }
            EngineBackend::Memory => FilterSync::new(store, MemoryEngine::new()),
        };
        Ok(sync.with_redirect_target(&self.enforcement.redirect_target))
    }
}
