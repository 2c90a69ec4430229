//! # Configuration Management for campus-query
//!
//! This crate provides centralized configuration structures for the query
//! cache, per-resource freshness overrides and the signal system.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{AppConfig, CacheConfig, ResourceConfig};
//!
//! let mut config = AppConfig::default();
//! config.cache = CacheConfig::new(120_000, 600_000, 300_000, 60_000);
//! config
//!     .resources
//!     .insert("transfers".to_string(), ResourceConfig::with_stale_time_ms(30_000));
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [cache]
//! volatile_stale_time_ms = 120000
//! static_stale_time_ms = 600000
//! gc_time_ms = 300000
//! gc_interval_ms = 60000
//!
//! [signal]
//! max_subscribers_per_key = 64
//!
//! [resources.transfers]
//! stale_time_ms = 30000
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from CAMPUS_QUERY_CONFIG or ./campus-query.toml
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use std::{env, path::Path};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./campus-query.toml";
const CONFIG_PATH_ENV: &str = "CAMPUS_QUERY_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    /// Freshness overrides keyed by resource name
    #[serde(default)]
    pub resources: HashMap<String, ResourceConfig>,
}

/// Cache timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Stale time for volatile lists (students, transfers, ...)
    pub volatile_stale_time_ms: u64,
    /// Stale time for near-static lookups (course catalog, statuses)
    pub static_stale_time_ms: u64,
    /// Inactivity window after which an unobserved entry is collected
    pub gc_time_ms: u64,
    /// How often the garbage collector sweeps the store
    pub gc_interval_ms: u64,
}

/// Signal system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub max_subscribers_per_key: usize,
}

/// Per-resource freshness override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub stale_time_ms: Option<u64>,
    pub gc_time_ms: Option<u64>,
}

impl AppConfig {
    /// Load configuration from the file named by CAMPUS_QUERY_CONFIG (also
    /// read from `.env`) or from the default path
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is not an error
        dotenvy::dotenv().ok();

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            Self::from_file(&config_path)
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::from_file(DEFAULT_CONFIG_PATH)
        } else {
            Err(ConfigError::Invalid(format!(
                "Config path must be specified in .env file as {} or in {} file",
                CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH
            )))
        }
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.volatile_stale_time_ms == 0 {
            return Err(ConfigError::Invalid(
                "Cache volatile_stale_time_ms must be greater than 0".to_string(),
            ));
        }
        if self.cache.static_stale_time_ms == 0 {
            return Err(ConfigError::Invalid(
                "Cache static_stale_time_ms must be greater than 0".to_string(),
            ));
        }
        if self.cache.gc_time_ms == 0 {
            return Err(ConfigError::Invalid(
                "Cache gc_time_ms must be greater than 0".to_string(),
            ));
        }
        if self.cache.gc_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "Cache gc_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.signal.max_subscribers_per_key == 0 {
            return Err(ConfigError::Invalid(
                "Signal max_subscribers_per_key must be greater than 0".to_string(),
            ));
        }

        for (name, resource) in &self.resources {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "Resource override name cannot be empty".to_string(),
                ));
            }
            if resource.stale_time_ms == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "Resource '{}' stale_time_ms must be greater than 0",
                    name
                )));
            }
            if resource.gc_time_ms == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "Resource '{}' gc_time_ms must be greater than 0",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Freshness override for a resource, if one is configured
    pub fn resource(&self, name: &str) -> Option<&ResourceConfig> {
        self.resources.get(name)
    }
}

impl CacheConfig {
    /// Create a new cache configuration
    pub fn new(
        volatile_stale_time_ms: u64,
        static_stale_time_ms: u64,
        gc_time_ms: u64,
        gc_interval_ms: u64,
    ) -> Self {
        Self {
            volatile_stale_time_ms,
            static_stale_time_ms,
            gc_time_ms,
            gc_interval_ms,
        }
    }

    pub fn volatile_stale_time(&self) -> Duration {
        Duration::from_millis(self.volatile_stale_time_ms)
    }

    pub fn static_stale_time(&self) -> Duration {
        Duration::from_millis(self.static_stale_time_ms)
    }

    pub fn gc_time(&self) -> Duration {
        Duration::from_millis(self.gc_time_ms)
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_millis(self.gc_interval_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            volatile_stale_time_ms: 2 * 60 * 1000,
            static_stale_time_ms: 10 * 60 * 1000,
            gc_time_ms: 5 * 60 * 1000,
            gc_interval_ms: 60 * 1000,
        }
    }
}

impl SignalConfig {
    /// Create a new signal configuration
    pub fn new(max_subscribers_per_key: usize) -> Self {
        Self {
            max_subscribers_per_key,
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            max_subscribers_per_key: 64,
        }
    }
}

impl ResourceConfig {
    pub fn with_stale_time_ms(stale_time_ms: u64) -> Self {
        Self {
            stale_time_ms: Some(stale_time_ms),
            gc_time_ms: None,
        }
    }

    pub fn stale_time(&self) -> Option<Duration> {
        self.stale_time_ms.map(Duration::from_millis)
    }

    pub fn gc_time(&self) -> Option<Duration> {
        self.gc_time_ms.map(Duration::from_millis)
    }
}
