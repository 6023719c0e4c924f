//! Configuration management
//!
//! This module provides YAML-based configuration with support for:
//! - Environment variable overrides (`TENANTRY_*`)
//! - Default values for all settings
//! - A `.env` file in development

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main core configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CoreConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend (organization API + identity provider) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Base URL of the managed backend, e.g. `https://api.example.com`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout applied by the authorization propagator
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Identity-session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Fallback deadline for leaving the `Initializing` phase even when the
    /// identity provider never answers
    #[serde(default = "default_init_fallback_secs")]
    pub init_fallback_secs: u64,
}

/// Organization directory cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryConfig {
    /// TTL for the per-identity organization list cache
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Maximum number of cached identities
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
}

/// Local persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    /// Path of the last-selected-organization file. When unset, a default
    /// under the platform data directory is used.
    #[serde(default)]
    pub selection_file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_init_fallback_secs() -> u64 {
    5
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            init_fallback_secs: default_init_fallback_secs(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_entries: default_cache_max_entries(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SessionConfig {
    pub fn init_fallback(&self) -> Duration {
        Duration::from_secs(self.init_fallback_secs)
    }
}

impl CoreConfig {
    /// Load configuration from the default locations.
    ///
    /// Resolution order: `TENANTRY_CONFIG` env var, `./tenantry.yaml`, the
    /// platform config dir, then built-in defaults. Environment variables
    /// override whatever was loaded.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("TENANTRY_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => Self::load_from(path)?,
            _ => CoreConfig::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific YAML file
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from("tenantry.yaml");
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir().map(|d| d.join("tenantry").join("config.yaml"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TENANTRY_BACKEND_URL") {
            self.backend.base_url = url;
        }
        if let Ok(secs) = std::env::var("TENANTRY_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.backend.request_timeout_secs = secs;
            }
        }
        if let Ok(secs) = std::env::var("TENANTRY_INIT_FALLBACK_SECS") {
            if let Ok(secs) = secs.parse() {
                self.session.init_fallback_secs = secs;
            }
        }
        if let Ok(path) = std::env::var("TENANTRY_SELECTION_FILE") {
            self.storage.selection_file = Some(PathBuf::from(path));
        }
        if let Ok(level) = std::env::var("TENANTRY_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.backend.base_url.is_empty() {
            anyhow::bail!("backend.base_url must not be empty");
        }
        if self.backend.request_timeout_secs == 0 {
            anyhow::bail!("backend.request_timeout_secs must be greater than zero");
        }
        if self.session.init_fallback_secs == 0 {
            anyhow::bail!("session.init_fallback_secs must be greater than zero");
        }
        Ok(())
    }
}
