//! Query cache and fetch coordination
//!
//! This crate provides the in-memory entry store, the fetch coordinator that
//! de-duplicates concurrent requests and discards superseded responses, and
//! the invalidation rules applied after mutations.

#[cfg(feature = "debug-logging")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub mod entry;
pub mod errors;
pub mod gc;
pub mod invalidation;
pub mod manager;
pub mod params;
pub mod prelude;
pub mod stats;
pub mod store;

// Re-export centralized config
pub use config::CacheConfig;

pub use entry::{CacheEntry, EntryPatch, Payload, QueryStatus};
pub use errors::CacheError;
pub use gc::GarbageCollector;
pub use invalidation::{CacheInvalidator, InvalidationEvent, InvalidationRule};
pub use manager::{producer, CacheManager, Producer, QueryState, Refetch};
pub use params::{Freshness, QueryOptions};
pub use stats::CacheStats;
pub use store::EntryStore;
