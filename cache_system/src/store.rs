//! Entry store
//!
//! The only shared mutable state of the cache. Every write to a key happens
//! under one lock acquisition, and the matching notification is sent after the
//! lock is released, so subscribers never observe a half-applied write and may
//! call back into the cache from their callback.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use query_key::QueryKey;
use signal_system::{CacheEvent, EventType, SignalManager};
use tokio::time::Instant;

use crate::entry::{CacheEntry, EntryPatch, Payload, QueryStatus};
use crate::errors::CacheError;

pub struct EntryStore {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    signals: Arc<SignalManager>,
    default_gc_time: Duration,
}

impl std::fmt::Debug for EntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStore")
            .field("entries", &self.len())
            .field("default_gc_time", &self.default_gc_time)
            .finish()
    }
}

impl EntryStore {
    pub fn new(signals: Arc<SignalManager>, default_gc_time: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            signals,
            default_gc_time,
        }
    }

    /// Snapshot of the entry for a key
    pub fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Apply a partial update, creating the entry if needed, and notify the key's subscribers
    pub fn set(&self, key: &QueryKey, patch: EntryPatch) -> CacheEntry {
        let (entry, event) = self.write(key, patch, EventType::Updated);
        self.notify(&event);
        entry
    }

    /// Remove an entry and notify the key's subscribers
    pub fn remove(&self, key: &QueryKey) -> Option<CacheEntry> {
        let removed = self.entries.write().remove(key);
        if removed.is_some() {
            self.notify(&CacheEvent::new(EventType::Evicted, key.clone()));
        }
        removed
    }

    /// Mark every matching entry stale, keeping its data. Returns the affected keys.
    pub fn mark_stale<F>(&self, predicate: F) -> Vec<QueryKey>
    where
        F: Fn(&QueryKey) -> bool,
    {
        let now = Instant::now();
        let affected: Vec<QueryKey> = {
            let mut entries = self.entries.write();
            entries
                .iter_mut()
                .filter(|(key, _)| predicate(key))
                .map(|(key, entry)| {
                    entry.stale_at = Some(now);
                    entry.invalidated_at = Some(now);
                    entry.invalidations += 1;
                    key.clone()
                })
                .collect()
        };

        for key in &affected {
            self.notify(&CacheEvent::new(EventType::Invalidated, key.clone()));
        }
        affected
    }

    /// Remove every matching entry. Returns the removed keys.
    pub fn remove_where<F>(&self, predicate: F) -> Vec<QueryKey>
    where
        F: Fn(&QueryKey) -> bool,
    {
        let removed: Vec<QueryKey> = {
            let mut entries = self.entries.write();
            let keys: Vec<QueryKey> = entries.keys().filter(|key| predicate(key)).cloned().collect();
            for key in &keys {
                entries.remove(key);
            }
            keys
        };

        for key in &removed {
            self.notify(&CacheEvent::new(EventType::Evicted, key.clone()));
        }
        removed
    }

    /// Record a read so the entry is not collected while in use
    pub fn touch(&self, key: &QueryKey, gc_time: Duration) {
        if let Some(entry) = self.entries.write().get_mut(key) {
            entry.last_accessed = Instant::now();
            entry.gc_time = gc_time;
        }
    }

    /// Evict entries that nobody observes and nobody has read for their gc time.
    ///
    /// `busy` reports keys that must be kept regardless (in-flight requests).
    pub fn collect_garbage<F>(&self, busy: F) -> Vec<QueryKey>
    where
        F: Fn(&QueryKey) -> bool,
    {
        let now = Instant::now();
        let collected: Vec<QueryKey> = {
            let mut entries = self.entries.write();
            let keys: Vec<QueryKey> = entries
                .iter()
                .filter(|(key, entry)| {
                    entry.is_collectable(now) && !busy(key) && !self.signals.has_subscribers(key)
                })
                .map(|(key, _)| key.clone())
                .collect();
            for key in &keys {
                entries.remove(key);
            }
            keys
        };

        for key in &collected {
            self.notify(&CacheEvent::new(EventType::Evicted, key.clone()));
        }
        collected
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry without notifying subscribers
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn signals(&self) -> &Arc<SignalManager> {
        &self.signals
    }

    /// Apply a patch without notifying. The caller must pass the returned event to `notify`.
    pub(crate) fn write(
        &self,
        key: &QueryKey,
        patch: EntryPatch,
        event_type: EventType,
    ) -> (CacheEntry, CacheEvent) {
        let mut entries = self.entries.write();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(key.clone(), Instant::now(), self.default_gc_time));
        entry.apply(patch);
        (entry.clone(), CacheEvent::new(event_type, key.clone()))
    }

    /// Mark a fetch as started. Entries without data move to `Loading`.
    ///
    /// Returns the entry's invalidation count, to be handed back to `settle`.
    pub(crate) fn begin_fetch(&self, key: &QueryKey, gc_time: Duration) -> (u64, CacheEvent) {
        let mut entries = self.entries.write();
        let now = Instant::now();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(key.clone(), now, gc_time));
        entry.is_fetching = true;
        entry.last_accessed = now;
        if !entry.has_data() {
            entry.status = QueryStatus::Loading;
        }
        (
            entry.invalidations,
            CacheEvent::new(EventType::Fetching, key.clone()),
        )
    }

    /// Store the outcome of a fetch.
    ///
    /// If the entry was invalidated after the request started (its count no
    /// longer matches `invalidations_at_start`), the data is stored already
    /// stale so the next read fetches again.
    pub(crate) fn settle(
        &self,
        key: &QueryKey,
        outcome: Result<Payload, CacheError>,
        invalidations_at_start: u64,
        stale_time: Duration,
    ) -> CacheEvent {
        let mut entries = self.entries.write();
        let now = Instant::now();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(key.clone(), now, self.default_gc_time));

        match outcome {
            Ok(data) => {
                let invalidated_meanwhile = entry.invalidations != invalidations_at_start;
                let mut patch = EntryPatch::success(data, now, stale_time);
                if invalidated_meanwhile {
                    patch = patch.with_stale_at(Some(now));
                }
                entry.apply(patch);
                CacheEvent::new(EventType::Succeeded, key.clone())
            }
            Err(error) => {
                entry.apply(EntryPatch::failure(error));
                CacheEvent::new(EventType::Failed, key.clone())
            }
        }
    }

    pub(crate) fn notify(&self, event: &CacheEvent) {
        self.signals.emit(event);
    }
}
