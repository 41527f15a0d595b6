//! Configuration loading for the `huginn` command.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//!
//! When no file exists at the standard locations the defaults below apply.
//! `HUGINN_REDIS_URL` overrides `redis.url` in every case.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::{DEFAULT_NAMESPACE, LocalCacheConfig};
use crate::resolver::DEFAULT_MAX_HOPS;
use crate::{HuginnError, Result};

const REDIS_URL_ENV: &str = "HUGINN_REDIS_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub forwarding: ForwardingConfig,
}

/// Shared cache and change channel.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Connection URL (default: redis://127.0.0.1:6379).
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Hash key holding model records (default: api:models).
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Pub/sub channel carrying change events.
    #[serde(default = "default_change_channel")]
    pub change_channel: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            namespace: default_namespace(),
            change_channel: default_change_channel(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_change_channel() -> String {
    "huginn:model:changes".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Local cache capacity (default: 10000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

fn default_max_entries() -> u64 {
    LocalCacheConfig::default().max_entries
}

impl From<&CacheConfig> for LocalCacheConfig {
    fn from(config: &CacheConfig) -> Self {
        LocalCacheConfig::new().max_entries(config.max_entries)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForwardingConfig {
    /// Hop limit for forwarding chains (default: 8).
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
        }
    }
}

fn default_max_hops() -> usize {
    DEFAULT_MAX_HOPS
}

impl Config {
    /// Load configuration from the standard locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path)?,
            None => Config::default(),
        };
        if let Ok(url) = std::env::var(REDIS_URL_ENV) {
            config.redis.url = url;
        }
        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path, if any.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}
