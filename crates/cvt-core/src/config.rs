//! Configuration loading.
//!
//! Settings come from a TOML file, then environment variables override
//! individual fields. A missing file is not an error; every field has a
//! default. The tenant scope is deliberately absent: it is passed on each call.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Default values.
pub mod defaults {
    pub const STORAGE_BACKEND: &str = "redb";
    pub const STORAGE_PATH: &str = "./data/cvt.redb";
    pub const CACHE_CAPACITY: usize = 1024;
    pub const STALE_TIME_SECS: f64 = 30.0;
    pub const LOG_FILTER: &str = "cvt=info";
    pub const CONFIG_FILE: &str = "cvt.toml";
}

/// Environment variable names.
pub mod env_vars {
    pub const STORAGE_BACKEND: &str = "CVT_STORAGE_BACKEND";
    pub const STORAGE_PATH: &str = "CVT_STORAGE_PATH";
    pub const STALE_TIME: &str = "CVT_STALE_TIME";
    pub const LOG_JSON: &str = "CVT_LOG_JSON";
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CvtConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cvt: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backing store selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend identifier, `redb` or `memory`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Database file for persistent backends.
    #[serde(default = "default_path")]
    pub path: String,
    /// Read cache entries for the redb backend. 0 disables caching.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Staleness threshold used when a batch caller does not give one.
    #[serde(default = "default_stale_time")]
    pub stale_time_secs: f64,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_backend() -> String {
    defaults::STORAGE_BACKEND.to_string()
}
fn default_path() -> String {
    defaults::STORAGE_PATH.to_string()
}
fn default_cache_capacity() -> usize {
    defaults::CACHE_CAPACITY
}
fn default_stale_time() -> f64 {
    defaults::STALE_TIME_SECS
}
fn default_log_filter() -> String {
    defaults::LOG_FILTER.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_path(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: default_stale_time(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: default_log_filter(),
        }
    }
}

impl CvtConfig {
    /// Parse TOML configuration.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CvtConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, falling back to defaults if it does not exist, then
    /// apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// [`load`](Self::load) with the environment lookup supplied by the caller.
    pub fn load_with<F>(path: impl AsRef<Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
            info!(category = "config", path = %path.display(), "Loading config file");
            Self::from_toml_str(&content)?
        } else {
            debug!(category = "config", path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides(lookup)?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup(env_vars::STORAGE_BACKEND) {
            self.storage.backend = backend;
        }
        if let Some(path) = lookup(env_vars::STORAGE_PATH) {
            self.storage.path = path;
        }
        if let Some(stale) = lookup(env_vars::STALE_TIME) {
            self.cvt.stale_time_secs = stale.parse().map_err(|_| {
                Error::Config(format!("{} must be a number, got '{}'", env_vars::STALE_TIME, stale))
            })?;
        }
        if let Some(json) = lookup(env_vars::LOG_JSON) {
            match json.parse() {
                Ok(json) => self.logging.json = json,
                Err(_) => {
                    warn!(category = "config", value = %json, "Ignoring non-boolean {}", env_vars::LOG_JSON)
                }
            }
        }
        self.validate()
    }

    /// Reject values no backend or engine could work with.
    pub fn validate(&self) -> Result<()> {
        if self.storage.backend.trim().is_empty() {
            return Err(Error::Config("storage.backend must not be empty".into()));
        }
        if !self.cvt.stale_time_secs.is_finite() || self.cvt.stale_time_secs < 0.0 {
            return Err(Error::Config(format!(
                "cvt.stale_time_secs must be a non-negative number, got {}",
                self.cvt.stale_time_secs
            )));
        }
        Ok(())
    }

    /// Backend settings in the shape `create_backend` expects.
    pub fn backend_settings(&self) -> serde_json::Value {
        serde_json::json!({
            "path": self.storage.path,
            "cache_capacity": self.storage.cache_capacity,
        })
    }
}
