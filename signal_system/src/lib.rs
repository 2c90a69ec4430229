//! Signal system for cache change notifications
//!
//! This crate lets consumers subscribe to the cache keys they render and be
//! notified once per change to exactly those keys.

pub mod event;
pub mod manager;
pub mod prelude;
pub mod types;

pub use event::{CacheEvent, EventType};
pub use manager::{SignalError, SignalManager};
pub use types::{EventCallback, SubscriptionId};
