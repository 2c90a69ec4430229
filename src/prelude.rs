//! Convenience re-exports for common campus-query usage
//!
//! # Example
//!
//! ```rust
//! use campus_query::prelude::*;
//!
//! let client = QueryClient::with_defaults();
//! assert!(client.list_resources().is_empty());
//! ```

// Core components
pub use crate::core::QueryClient;
pub use crate::errors::ClientError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, ResourceConfig, SignalConfig};

// Resource façades, params and campus resources
pub use query_hooks::prelude::*;

// Signal system for event handling
pub use signal_system::prelude::*;

// Cache system
pub use cache_system::prelude::*;

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use tokio;
