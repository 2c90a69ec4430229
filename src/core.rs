//! Core campus-query functionality
//!
//! This module contains the `QueryClient`, the process-wide handle that owns
//! the cache, the signal manager, the background garbage collector and the
//! registered resource façades.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use cache_system::{
    CacheInvalidator, CacheManager, CacheStats, GarbageCollector, InvalidationRule,
};
use config::AppConfig;
use query_hooks::{Resource, ResourceApi, ResourceQuery};
use signal_system::{CacheEvent, SignalManager, SubscriptionId};

use crate::errors::ClientError;

/// Main query client that coordinates caching, invalidation and resource façades
pub struct QueryClient {
    cache: CacheManager,
    signals: Arc<SignalManager>,
    config: AppConfig,
    resources: HashMap<String, Box<dyn Any + Send + Sync>>,
    collector: Option<GarbageCollector>,
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("cache", &self.cache)
            .field("resources", &self.list_resources())
            .field("gc_running", &self.is_gc_running())
            .finish()
    }
}

impl QueryClient {
    /// Create a client from a validated configuration
    pub fn new(config: AppConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let signals = Arc::new(SignalManager::with_config(&config.signal));
        let cache = CacheManager::new(config.cache.clone(), Arc::clone(&signals));
        tracing::info!(
            "Query client ready (volatile stale {:?}, static stale {:?}, gc {:?})",
            config.cache.volatile_stale_time(),
            config.cache.static_stale_time(),
            config.cache.gc_time()
        );

        Ok(Self {
            cache,
            signals,
            config,
            resources: HashMap::new(),
            collector: None,
        })
    }

    /// Create a client with the default configuration
    pub fn with_defaults() -> Self {
        let config = AppConfig::default();
        let signals = Arc::new(SignalManager::with_config(&config.signal));
        let cache = CacheManager::new(config.cache.clone(), Arc::clone(&signals));
        Self {
            cache,
            signals,
            config,
            resources: HashMap::new(),
            collector: None,
        }
    }

    /// Create a client from `CAMPUS_QUERY_CONFIG` or `./campus-query.toml`
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(AppConfig::load()?)
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn signals(&self) -> &Arc<SignalManager> {
        &self.signals
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        self.cache.stats()
    }

    /// Build a façade for `R` honoring the configured overrides, without registering it
    pub fn resource_query<R, A>(&self, api: Arc<A>) -> ResourceQuery<R, A>
    where
        R: Resource,
        A: ResourceApi<R>,
    {
        ResourceQuery::with_overrides(self.cache.clone(), api, self.config.resource(R::NAME))
    }

    /// Register the façade for `R` under its resource name
    pub fn register_resource<R, A>(&mut self, api: Arc<A>) -> Result<ResourceQuery<R, A>, ClientError>
    where
        R: Resource,
        A: ResourceApi<R>,
    {
        if self.resources.contains_key(R::NAME) {
            return Err(ClientError::ResourceAlreadyRegistered(R::NAME.to_string()));
        }

        let query = self.resource_query::<R, A>(api);
        self.resources
            .insert(R::NAME.to_string(), Box::new(query.clone()));
        debug_log!("Registered resource {}", R::NAME);
        Ok(query)
    }

    /// Get a registered façade
    pub fn resource<R, A>(&self) -> Result<&ResourceQuery<R, A>, ClientError>
    where
        R: Resource,
        A: ResourceApi<R>,
    {
        self.resources
            .get(R::NAME)
            .and_then(|query| query.downcast_ref::<ResourceQuery<R, A>>())
            .ok_or_else(|| ClientError::ResourceNotFound(R::NAME.to_string()))
    }

    /// List all registered resource names
    pub fn list_resources(&self) -> Vec<&String> {
        let mut names: Vec<&String> = self.resources.keys().collect();
        names.sort();
        names
    }

    /// Remove a façade by name. Its cached queries are left to garbage collection.
    pub fn unregister_resource(&mut self, name: &str) -> Result<(), ClientError> {
        self.resources
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ClientError::ResourceNotFound(name.to_string()))
    }

    /// Mark every query of a resource family stale
    pub fn invalidate_resource(&self, name: &str) -> usize {
        self.cache.invalidate_resource(name)
    }

    pub fn invalidate_all(&self) -> usize {
        self.cache.invalidate_all()
    }

    pub fn invalidate(&self, rule: &InvalidationRule) -> usize {
        self.cache.invalidate(rule)
    }

    /// Observe every cache event, across all keys
    pub fn add_listener<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.signals.add_listener(callback)
    }

    /// Start the background garbage collector. Must be called inside a tokio runtime.
    pub fn start_gc(&mut self) {
        if self.is_gc_running() {
            return;
        }
        self.collector = Some(GarbageCollector::start(
            self.cache.clone(),
            self.config.cache.gc_interval(),
        ));
    }

    pub fn is_gc_running(&self) -> bool {
        self.collector
            .as_ref()
            .is_some_and(GarbageCollector::is_running)
    }

    /// Stop background work
    pub async fn shutdown(&mut self) {
        if let Some(collector) = self.collector.take() {
            collector.shutdown().await;
        }
        tracing::info!("Query client shut down");
    }
}
