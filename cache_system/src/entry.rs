//! Cache entries
//!
//! An entry is the store's record for one query key. Callers only ever see
//! snapshots of it; writes go through `EntryPatch`.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use query_key::QueryKey;
use tokio::time::Instant;

use crate::errors::CacheError;

/// Type-erased, shared, read-only payload
pub type Payload = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of a cached query
#[derive(Clone)]
pub struct CacheEntry {
    pub key: QueryKey,
    pub data: Option<Payload>,
    pub status: QueryStatus,
    pub error: Option<CacheError>,
    pub fetched_at: Option<Instant>,
    /// Instant from which the entry is no longer fresh
    pub stale_at: Option<Instant>,
    pub is_fetching: bool,
    /// Last time the entry was marked stale by an invalidation
    pub invalidated_at: Option<Instant>,
    /// Number of invalidations so far; a fetch compares it before and after
    pub invalidations: u64,
    pub last_accessed: Instant,
    pub gc_time: Duration,
    /// Number of times data was written
    pub data_updates: u64,
}

impl CacheEntry {
    pub fn new(key: QueryKey, now: Instant, gc_time: Duration) -> Self {
        Self {
            key,
            data: None,
            status: QueryStatus::Idle,
            error: None,
            fetched_at: None,
            stale_at: None,
            is_fetching: false,
            invalidated_at: None,
            invalidations: 0,
            last_accessed: now,
            gc_time,
            data_updates: 0,
        }
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        self.data.is_some() && matches!(self.stale_at, Some(stale_at) if now < stale_at)
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        !self.is_fresh(now)
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Whether the garbage collector may drop this entry
    pub fn is_collectable(&self, now: Instant) -> bool {
        !self.is_fetching && now.saturating_duration_since(self.last_accessed) >= self.gc_time
    }

    pub(crate) fn apply(&mut self, patch: EntryPatch) {
        if let Some(data) = patch.data {
            self.data = Some(data);
            self.data_updates += 1;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(error) = patch.error {
            self.error = error;
        }
        if let Some(fetched_at) = patch.fetched_at {
            self.fetched_at = Some(fetched_at);
        }
        if let Some(stale_at) = patch.stale_at {
            self.stale_at = stale_at;
        }
        if let Some(is_fetching) = patch.is_fetching {
            self.is_fetching = is_fetching;
        }
        if let Some(gc_time) = patch.gc_time {
            self.gc_time = gc_time;
        }
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("has_data", &self.has_data())
            .field("status", &self.status)
            .field("error", &self.error)
            .field("fetched_at", &self.fetched_at)
            .field("stale_at", &self.stale_at)
            .field("is_fetching", &self.is_fetching)
            .field("data_updates", &self.data_updates)
            .finish()
    }
}

/// Partial entry update. Unset fields are left untouched.
#[derive(Clone, Default)]
pub struct EntryPatch {
    pub data: Option<Payload>,
    pub status: Option<QueryStatus>,
    pub error: Option<Option<CacheError>>,
    pub fetched_at: Option<Instant>,
    pub stale_at: Option<Option<Instant>>,
    pub is_fetching: Option<bool>,
    pub gc_time: Option<Duration>,
}

impl EntryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful fetch: data stored and fresh for `stale_time`
    pub fn success(data: Payload, now: Instant, stale_time: Duration) -> Self {
        Self {
            data: Some(data),
            status: Some(QueryStatus::Success),
            error: Some(None),
            fetched_at: Some(now),
            stale_at: Some(Some(now + stale_time)),
            is_fetching: Some(false),
            gc_time: None,
        }
    }

    /// Failed fetch: previous data is kept, the entry is no longer fresh
    pub fn failure(error: CacheError) -> Self {
        Self {
            status: Some(QueryStatus::Error),
            error: Some(Some(error)),
            stale_at: Some(None),
            is_fetching: Some(false),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_status(mut self, status: QueryStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_error(mut self, error: Option<CacheError>) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_fetched_at(mut self, fetched_at: Instant) -> Self {
        self.fetched_at = Some(fetched_at);
        self
    }

    pub fn with_stale_at(mut self, stale_at: Option<Instant>) -> Self {
        self.stale_at = Some(stale_at);
        self
    }

    pub fn with_fetching(mut self, is_fetching: bool) -> Self {
        self.is_fetching = Some(is_fetching);
        self
    }

    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = Some(gc_time);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_key::QueryDescriptor;

    fn key() -> QueryKey {
        QueryDescriptor::new("courses").key().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_freshness_window() {
        let now = Instant::now();
        let mut entry = CacheEntry::new(key(), now, Duration::from_secs(300));
        assert!(entry.is_stale(now));

        entry.apply(EntryPatch::success(
            Arc::new(vec![1u32, 2, 3]),
            now,
            Duration::from_secs(60),
        ));
        assert!(entry.is_fresh(now + Duration::from_secs(59)));
        assert!(entry.is_stale(now + Duration::from_secs(60)));
        assert_eq!(entry.data_updates, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_data() {
        let now = Instant::now();
        let mut entry = CacheEntry::new(key(), now, Duration::from_secs(300));
        entry.apply(EntryPatch::success(Arc::new("catalog"), now, Duration::from_secs(60)));
        entry.apply(EntryPatch::failure(CacheError::producer(anyhow::anyhow!("502"))));

        assert_eq!(entry.status, QueryStatus::Error);
        assert!(entry.has_data());
        assert!(entry.error.is_some());
        assert!(entry.is_stale(now));
    }

    #[tokio::test(start_paused = true)]
    async fn test_collectable_after_gc_time() {
        let now = Instant::now();
        let mut entry = CacheEntry::new(key(), now, Duration::from_secs(10));
        assert!(!entry.is_collectable(now + Duration::from_secs(9)));
        assert!(entry.is_collectable(now + Duration::from_secs(10)));

        entry.is_fetching = true;
        assert!(!entry.is_collectable(now + Duration::from_secs(60)));
    }
}
