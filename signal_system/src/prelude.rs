//! Convenience re-exports for common signal-system usage

pub use crate::event::{CacheEvent, EventType};
pub use crate::manager::{SignalError, SignalManager};
pub use crate::types::{EventCallback, SubscriptionId};

pub use query_key::QueryKey;
