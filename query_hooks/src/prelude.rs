//! Convenience re-exports for common query-hooks usage

// Core traits
pub use crate::traits::{MemoryBacked, Resource, ResourceApi};

// Façade and parameters
pub use crate::facade::ResourceQuery;
pub use crate::params::{Filter, ListParams, Page};

// Error types
pub use crate::errors::HookError;

// In-memory backend
pub use crate::memory::InMemoryApi;

// Campus resources
pub use crate::resources::*;

// Cache types every screen sees
pub use cache_system::{Freshness, QueryOptions, QueryState, QueryStatus};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use uuid::Uuid;
