//! Fetch coordinator
//!
//! `CacheManager` answers queries from the entry store when the data is fresh
//! and otherwise runs the producer. Concurrent reads of one key share a single
//! in-flight request. Every request carries a per-key generation and only the
//! latest generation may write its result.

use std::any::type_name;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use config::CacheConfig;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use query_key::{QueryDescriptor, QueryKey};
use signal_system::{CacheEvent, SignalManager, SubscriptionId};
use tokio::time::Instant;

use crate::entry::{CacheEntry, EntryPatch, Payload, QueryStatus};
use crate::errors::CacheError;
use crate::params::QueryOptions;
use crate::stats::CacheStats;
use crate::store::EntryStore;

/// Async function producing the data for a descriptor (usually an API call)
pub type Producer<T> =
    Arc<dyn Fn(QueryDescriptor) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// Wrap an async closure as a `Producer`
pub fn producer<T, F, Fut>(f: F) -> Producer<T>
where
    F: Fn(QueryDescriptor) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    Arc::new(move |descriptor| f(descriptor).boxed())
}

type FetchOutcome = Result<Payload, CacheError>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

struct InFlightRequest {
    generation: u64,
    started_at: Instant,
    future: SharedFetch,
}

#[derive(Default)]
struct FlightSlot {
    latest_generation: u64,
    request: Option<InFlightRequest>,
}

/// In-memory query cache with request de-duplication
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<EntryStore>,
    flights: Arc<Mutex<HashMap<QueryKey, FlightSlot>>>,
    // Shared by all keys so a key's generations keep increasing even after
    // its bookkeeping was dropped by garbage collection.
    generations: Arc<AtomicU64>,
    signals: Arc<SignalManager>,
    stats: Arc<CacheStats>,
    config: Arc<CacheConfig>,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("config", &self.config)
            .field("entries", &self.store.len())
            .field("in_flight", &self.in_flight_count())
            .finish()
    }
}

impl CacheManager {
    pub fn new(config: CacheConfig, signals: Arc<SignalManager>) -> Self {
        let store = Arc::new(EntryStore::new(Arc::clone(&signals), config.gc_time()));
        Self {
            store,
            flights: Arc::new(Mutex::new(HashMap::new())),
            generations: Arc::new(AtomicU64::new(0)),
            signals,
            stats: Arc::new(CacheStats::new()),
            config: Arc::new(config),
        }
    }

    /// Create a manager with default configuration and its own signal manager
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default(), Arc::new(SignalManager::new()))
    }

    /// Read a query, fetching it if it is missing or stale.
    ///
    /// Returns `Err` only for misuse (a descriptor that cannot be keyed, or a
    /// payload type that does not match the cached one). Producer failures are
    /// reported through `QueryState::status`.
    pub async fn query<T>(
        &self,
        descriptor: QueryDescriptor,
        producer: Producer<T>,
        options: QueryOptions,
    ) -> Result<QueryState<T>, CacheError>
    where
        T: Send + Sync + 'static,
    {
        let key = descriptor.key()?;
        let refetch = Refetch {
            manager: self.clone(),
            descriptor: descriptor.clone(),
            producer: Arc::clone(&producer),
            options: options.clone(),
        };

        if !options.enabled {
            return Ok(QueryState::idle(key, refetch));
        }

        self.store.touch(&key, options.gc_time);
        let now = Instant::now();

        if let Some(entry) = self.store.get(&key) {
            if entry.is_fresh(now) {
                self.stats.record_hit();
                debug_log!("Cache hit for {}", key);
                return QueryState::from_entry(&entry, now, refetch);
            }

            if entry.has_data() && !options.blocking {
                self.stats.record_stale_hit();
                debug_log!("Serving stale data for {} while revalidating", key);
                let _ = self.start_or_join(&key, &descriptor, &producer, &options, false);
                let entry = self.store.get(&key).unwrap_or(entry);
                return QueryState::from_entry(&entry, Instant::now(), refetch);
            }
        }

        self.stats.record_miss();
        self.fetch(key, descriptor, producer, options, false, refetch)
            .await
    }

    /// Fetch regardless of freshness and wait for the result
    pub async fn refetch<T>(
        &self,
        descriptor: QueryDescriptor,
        producer: Producer<T>,
        options: QueryOptions,
    ) -> Result<QueryState<T>, CacheError>
    where
        T: Send + Sync + 'static,
    {
        let key = descriptor.key()?;
        let refetch = Refetch {
            manager: self.clone(),
            descriptor: descriptor.clone(),
            producer: Arc::clone(&producer),
            options: options.clone(),
        };

        if !options.enabled {
            return Ok(QueryState::idle(key, refetch));
        }

        self.store.touch(&key, options.gc_time);
        self.fetch(key, descriptor, producer, options, true, refetch)
            .await
    }

    /// Typed snapshot of cached data without fetching
    pub fn get_query_data<T>(&self, descriptor: &QueryDescriptor) -> Result<Option<Arc<T>>, CacheError>
    where
        T: Send + Sync + 'static,
    {
        let key = descriptor.key()?;
        match self.store.get(&key).and_then(|entry| entry.data) {
            Some(data) => downcast::<T>(&key, data).map(Some),
            None => Ok(None),
        }
    }

    /// Write data for a query directly, as if it had just been fetched.
    ///
    /// Any request still in flight for the key is superseded by this write.
    pub fn set_query_data<T>(
        &self,
        descriptor: &QueryDescriptor,
        data: T,
        options: &QueryOptions,
    ) -> Result<(), CacheError>
    where
        T: Send + Sync + 'static,
    {
        let key = descriptor.key()?;
        let payload: Payload = Arc::new(data);

        let event = {
            let mut flights = self.flights.lock();
            let slot = flights.entry(key.clone()).or_default();
            slot.latest_generation = self.next_generation();
            let (_, event) = self.store.write(
                &key,
                EntryPatch::success(payload, Instant::now(), options.stale_time)
                    .with_gc_time(options.gc_time),
                signal_system::EventType::Updated,
            );
            event
        };
        self.store.notify(&event);
        Ok(())
    }

    /// Subscribe to changes of the entry behind a descriptor
    pub fn subscribe<F>(&self, descriptor: &QueryDescriptor, callback: F) -> Result<SubscriptionId, CacheError>
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        let key = descriptor.key()?;
        Ok(self.signals.subscribe(key, callback)?)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.signals.unsubscribe(id)
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.flights
            .lock()
            .get(key)
            .is_some_and(|slot| slot.request.is_some())
    }

    /// When the request currently in flight for a key was started
    pub fn fetch_started_at(&self, key: &QueryKey) -> Option<Instant> {
        self.flights
            .lock()
            .get(key)
            .and_then(|slot| slot.request.as_ref().map(|request| request.started_at))
    }

    pub fn in_flight_count(&self) -> usize {
        self.flights
            .lock()
            .values()
            .filter(|slot| slot.request.is_some())
            .count()
    }

    pub fn store(&self) -> &Arc<EntryStore> {
        &self.store
    }

    pub fn signals(&self) -> &Arc<SignalManager> {
        &self.signals
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    async fn fetch<T>(
        &self,
        key: QueryKey,
        descriptor: QueryDescriptor,
        producer: Producer<T>,
        options: QueryOptions,
        force: bool,
        refetch: Refetch<T>,
    ) -> Result<QueryState<T>, CacheError>
    where
        T: Send + Sync + 'static,
    {
        let (mut generation, mut future) =
            self.start_or_join(&key, &descriptor, &producer, &options, force);

        loop {
            // The outcome has already been written (or discarded) by the fetch task.
            let _ = future.await;

            // A newer request superseded ours: follow it so the caller sees the latest result.
            let newer = self.flights.lock().get(&key).and_then(|slot| {
                slot.request
                    .as_ref()
                    .filter(|request| request.generation > generation)
                    .map(|request| (request.generation, request.future.clone()))
            });
            match newer {
                Some((next_generation, next_future)) => {
                    generation = next_generation;
                    future = next_future;
                }
                None => break,
            }
        }

        match self.store.get(&key) {
            Some(entry) => QueryState::from_entry(&entry, Instant::now(), refetch),
            None => Ok(QueryState::idle(key, refetch)),
        }
    }

    /// Join the in-flight request for a key, or start one.
    ///
    /// With `force`, a new request is always started; any request already in
    /// flight keeps running but its result will be discarded.
    fn start_or_join<T>(
        &self,
        key: &QueryKey,
        descriptor: &QueryDescriptor,
        producer: &Producer<T>,
        options: &QueryOptions,
        force: bool,
    ) -> (u64, SharedFetch)
    where
        T: Send + Sync + 'static,
    {
        let mut flights = self.flights.lock();
        let slot = flights.entry(key.clone()).or_default();

        if !force {
            if let Some(request) = &slot.request {
                self.stats.record_join();
                debug_log!("Joining in-flight request {} for {}", request.generation, key);
                return (request.generation, request.future.clone());
            }
        }

        let generation = self.next_generation();
        slot.latest_generation = generation;
        let (invalidations, event) = self.store.begin_fetch(key, options.gc_time);

        let task = {
            let manager = self.clone();
            let key = key.clone();
            let descriptor = descriptor.clone();
            let producer = Arc::clone(producer);
            let stale_time = options.stale_time;

            async move {
                let outcome = match AssertUnwindSafe(async move { producer(descriptor).await })
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(data)) => {
                        let payload: Payload = Arc::new(data);
                        Ok(payload)
                    }
                    Ok(Err(err)) => {
                        tracing::warn!("Fetch for {} failed: {:#}", key, err);
                        Err(CacheError::producer(err))
                    }
                    Err(_) => {
                        tracing::error!("Producer for {} panicked", key);
                        Err(CacheError::ProducerPanicked(key.to_string()))
                    }
                };
                manager.settle(&key, generation, invalidations, stale_time, outcome.clone());
                outcome
            }
        };

        let handle = tokio::spawn(task);
        let future: SharedFetch = async move {
            handle
                .await
                .unwrap_or_else(|err| Err(CacheError::TaskFailed(err.to_string())))
        }
        .boxed()
        .shared();

        slot.request = Some(InFlightRequest {
            generation,
            started_at: Instant::now(),
            future: future.clone(),
        });
        drop(flights);

        self.stats.record_fetch();
        debug_log!("Started request {} for {}", generation, key);
        self.store.notify(&event);
        (generation, future)
    }

    fn settle(
        &self,
        key: &QueryKey,
        generation: u64,
        invalidations: u64,
        stale_time: std::time::Duration,
        outcome: FetchOutcome,
    ) {
        if outcome.is_err() {
            self.stats.record_failure();
        }

        let event = {
            let mut flights = self.flights.lock();
            let Some(slot) = flights.get_mut(key) else {
                return;
            };

            if slot
                .request
                .as_ref()
                .is_some_and(|request| request.generation == generation)
            {
                slot.request = None;
            }

            if slot.latest_generation != generation {
                self.stats.record_discard();
                debug_log!(
                    "Discarding response {} for {} (latest is {})",
                    generation,
                    key,
                    slot.latest_generation
                );
                return;
            }

            self.store.settle(key, outcome, invalidations, stale_time)
        };

        self.store.notify(&event);
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, AtomicOrdering::Relaxed) + 1
    }

    /// Drop generation bookkeeping for keys that are gone and idle
    pub(crate) fn forget_keys(&self, keys: &[QueryKey]) {
        let mut flights = self.flights.lock();
        for key in keys {
            if flights.get(key).is_some_and(|slot| slot.request.is_none()) {
                flights.remove(key);
            }
        }
    }

    /// Detach keys whose entries were evicted from any request still in flight.
    ///
    /// The request keeps running, but its result is discarded on settle
    /// instead of recreating the evicted entry.
    pub(crate) fn supersede_keys(&self, keys: &[QueryKey]) {
        let mut flights = self.flights.lock();
        for key in keys {
            let in_flight = match flights.get_mut(key) {
                Some(slot) => {
                    if slot.request.take().is_some() {
                        slot.latest_generation = self.next_generation();
                        true
                    } else {
                        false
                    }
                }
                None => continue,
            };
            if !in_flight {
                flights.remove(key);
            }
        }
    }

    pub(crate) fn busy_keys(&self) -> Vec<QueryKey> {
        self.flights
            .lock()
            .iter()
            .filter(|(_, slot)| slot.request.is_some())
            .map(|(key, _)| key.clone())
            .collect()
    }
}

fn downcast<T>(key: &QueryKey, data: Payload) -> Result<Arc<T>, CacheError>
where
    T: Send + Sync + 'static,
{
    data.downcast::<T>().map_err(|_| CacheError::TypeMismatch {
        key: key.to_string(),
        expected: type_name::<T>(),
    })
}

/// Handle that re-runs a query regardless of freshness
pub struct Refetch<T> {
    manager: CacheManager,
    descriptor: QueryDescriptor,
    producer: Producer<T>,
    options: QueryOptions,
}

impl<T> Clone for Refetch<T> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            descriptor: self.descriptor.clone(),
            producer: Arc::clone(&self.producer),
            options: self.options.clone(),
        }
    }
}

impl<T> Refetch<T>
where
    T: Send + Sync + 'static,
{
    pub async fn run(&self) -> Result<QueryState<T>, CacheError> {
        self.manager
            .refetch(
                self.descriptor.clone(),
                Arc::clone(&self.producer),
                self.options.clone(),
            )
            .await
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }
}

/// What a consumer sees for one query
pub struct QueryState<T> {
    pub key: QueryKey,
    /// Read-only data, possibly stale
    pub data: Option<Arc<T>>,
    pub status: QueryStatus,
    /// Last fetch error, kept until a successful fetch replaces it
    pub error: Option<CacheError>,
    pub is_stale: bool,
    pub is_fetching: bool,
    pub fetched_at: Option<Instant>,
    refetch: Refetch<T>,
}

impl<T> QueryState<T>
where
    T: Send + Sync + 'static,
{
    fn idle(key: QueryKey, refetch: Refetch<T>) -> Self {
        Self {
            key,
            data: None,
            status: QueryStatus::Idle,
            error: None,
            is_stale: false,
            is_fetching: false,
            fetched_at: None,
            refetch,
        }
    }

    fn from_entry(entry: &CacheEntry, now: Instant, refetch: Refetch<T>) -> Result<Self, CacheError> {
        let data = match &entry.data {
            Some(data) => Some(downcast::<T>(&entry.key, Arc::clone(data))?),
            None => None,
        };

        Ok(Self {
            key: entry.key.clone(),
            data,
            status: entry.status,
            error: entry.error.clone(),
            is_stale: entry.is_stale(now),
            is_fetching: entry.is_fetching,
            fetched_at: entry.fetched_at,
            refetch,
        })
    }

    /// Re-run the query regardless of freshness (the "try again" affordance)
    pub async fn refetch(&self) -> Result<QueryState<T>, CacheError> {
        self.refetch.run().await
    }

    /// Detached refetch handle
    pub fn refetcher(&self) -> Refetch<T> {
        self.refetch.clone()
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_deref()
    }

    pub fn is_idle(&self) -> bool {
        self.status == QueryStatus::Idle
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            data: self.data.clone(),
            status: self.status,
            error: self.error.clone(),
            is_stale: self.is_stale,
            is_fetching: self.is_fetching,
            fetched_at: self.fetched_at,
            refetch: self.refetch.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for QueryState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryState")
            .field("key", &self.key)
            .field("data", &self.data)
            .field("status", &self.status)
            .field("error", &self.error)
            .field("is_stale", &self.is_stale)
            .field("is_fetching", &self.is_fetching)
            .finish()
    }
}
