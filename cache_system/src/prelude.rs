//! Convenience re-exports for common cache-system usage

// Core cache system components
pub use crate::entry::{CacheEntry, EntryPatch, QueryStatus};
pub use crate::errors::CacheError;
pub use crate::gc::GarbageCollector;
pub use crate::invalidation::{CacheInvalidator, InvalidationEvent, InvalidationRule};
pub use crate::manager::{producer, CacheManager, Producer, QueryState, Refetch};
pub use crate::params::{Freshness, QueryOptions};
pub use crate::stats::CacheStats;
pub use crate::store::EntryStore;

// Re-export centralized config
pub use config::CacheConfig;

// Key types used in every query
pub use query_key::{QueryDescriptor, QueryKey};

// Common external dependencies
pub use anyhow;
pub use tokio;
