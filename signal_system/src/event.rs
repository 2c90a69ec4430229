//! Cache event types and definitions
//!
//! This module defines the structure of the change notifications
//! that flow from the entry store to subscribers.

use query_key::QueryKey;
use serde::{Deserialize, Serialize};

/// Kind of change applied to a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// A fetch started for the key
    Fetching,
    /// A fetch settled successfully and its data was stored
    Succeeded,
    /// A fetch settled with an error
    Failed,
    /// The entry was patched directly
    Updated,
    /// The entry was marked stale
    Invalidated,
    /// The entry was removed from the store
    Evicted,
}

/// Change notification for a single cache key
#[derive(Debug, Clone)]
pub struct CacheEvent {
    pub event_type: EventType,
    pub key: QueryKey,
    /// Event timestamp (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl CacheEvent {
    pub fn new(event_type: EventType, key: QueryKey) -> Self {
        Self {
            event_type,
            key,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn resource(&self) -> &str {
        self.key.resource()
    }
}
