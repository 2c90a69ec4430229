//! # campus-query
//!
//! Client-side query cache and pagination/filter coordination for the campus
//! console: keyed, de-duplicated reads with stale-while-revalidate, and
//! invalidation of every affected list after a mutation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use campus_query::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = QueryClient::new(AppConfig::default())?;
//!     client.start_gc();
//!
//!     let api = Arc::new(InMemoryApi::<Students>::default());
//!     let students = client.register_resource::<Students, _>(api)?;
//!
//!     let page = students.list(&ListParams::new().page(1).limit(10)).await?;
//!     if let Some(page) = page.data() {
//!         println!("{} of {} students", page.len(), page.total);
//!     }
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::QueryClient;
pub use crate::errors::ClientError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, ResourceConfig, SignalConfig};

// Re-export internal crates used by the public API
pub use cache_system;
pub use query_hooks;
pub use query_key;
pub use signal_system;

// Re-export external dependencies used in public API
pub use async_trait;
