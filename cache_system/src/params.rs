//! Query options
//!
//! This module defines the per-query options that control freshness,
//! garbage collection and whether a query runs at all.

use config::{CacheConfig, ResourceConfig};
use std::time::Duration;

/// How quickly a resource's data goes out of date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Lists that change often (students, transfers)
    Volatile,
    /// Near-static lookups (course catalog, status lists)
    Static,
}

impl Freshness {
    pub fn stale_time(&self, config: &CacheConfig) -> Duration {
        match self {
            Freshness::Volatile => config.volatile_stale_time(),
            Freshness::Static => config.static_stale_time(),
        }
    }
}

/// Options for a single `query` call
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// How long a successful result stays fresh
    pub stale_time: Duration,
    /// How long an unobserved entry survives without being read
    pub gc_time: Duration,
    /// Disabled queries return an idle state and never fetch
    pub enabled: bool,
    /// Wait for a refetch instead of returning stale data immediately
    pub blocking: bool,
}

impl QueryOptions {
    pub fn new(stale_time: Duration, gc_time: Duration) -> Self {
        Self {
            stale_time,
            gc_time,
            enabled: true,
            blocking: false,
        }
    }

    /// Options for a resource of the given freshness, with optional overrides
    pub fn from_config(
        config: &CacheConfig,
        freshness: Freshness,
        overrides: Option<&ResourceConfig>,
    ) -> Self {
        let stale_time = overrides
            .and_then(ResourceConfig::stale_time)
            .unwrap_or_else(|| freshness.stale_time(config));
        let gc_time = overrides
            .and_then(ResourceConfig::gc_time)
            .unwrap_or_else(|| config.gc_time());
        Self::new(stale_time, gc_time)
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = gc_time;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default(), Freshness::Volatile, None)
    }
}
