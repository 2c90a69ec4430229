//! Cache statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing how the cache served queries
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Reads answered from fresh data
    hits: AtomicU64,
    /// Reads answered from stale data while a refetch ran in the background
    stale_hits: AtomicU64,
    /// Reads that had to wait for a fetch
    misses: AtomicU64,
    /// Producer invocations
    fetches: AtomicU64,
    /// Reads that joined an already in-flight request
    joined: AtomicU64,
    /// Responses dropped because a newer request superseded them
    discarded: AtomicU64,
    /// Producer failures
    failures: AtomicU64,
    /// Entries marked stale by invalidation
    invalidations: AtomicU64,
    /// Entries removed by eviction or garbage collection
    evictions: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_hit(&self) {
        self.stale_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_join(&self) {
        self.joined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidations(&self, count: u64) {
        self.invalidations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn stale_hits(&self) -> u64 {
        self.stale_hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn joined(&self) -> u64 {
        self.joined.load(Ordering::Relaxed)
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Share of reads served without waiting (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let served = (self.hits() + self.stale_hits()) as f64;
        let total = served + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            served / total
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.hits() + self.stale_hits() + self.misses()
    }

    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.stale_hits,
            &self.misses,
            &self.fetches,
            &self.joined,
            &self.discarded,
            &self.failures,
            &self.invalidations,
            &self.evictions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_recording() {
        let stats = CacheStats::new();

        stats.record_hit();
        stats.record_stale_hit();
        stats.record_miss();
        stats.record_fetch();
        stats.record_join();

        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.stale_hits(), 1);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.total_requests(), 3);
        assert_eq!(stats.joined(), 1);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);

        stats.record_hit();
        stats.record_miss();
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_invalidations(3);
        stats.record_evictions(2);

        stats.reset();

        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.invalidations(), 0);
        assert_eq!(stats.evictions(), 0);
    }
}
