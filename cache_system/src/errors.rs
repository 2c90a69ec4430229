//! Error types for cache operations
//!
//! This module defines all error types that can occur while deriving keys,
//! running producers and reading typed data out of the store.

use std::sync::Arc;

use query_key::KeyError;
use signal_system::SignalError;
use thiserror::Error;

/// Cache system errors
///
/// Cloneable so one producer failure can be handed to every caller that
/// joined the same in-flight request.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    #[error("Invalid query descriptor: {0}")]
    InvalidDescriptor(#[from] KeyError),

    #[error("Fetch failed: {0}")]
    Producer(Arc<anyhow::Error>),

    #[error("Producer panicked while fetching {0}")]
    ProducerPanicked(String),

    #[error("Fetch task failed: {0}")]
    TaskFailed(String),

    #[error("Cached data for {key} is not of type {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Subscription error: {0}")]
    Signal(#[from] SignalError),
}

impl CacheError {
    pub fn producer(err: anyhow::Error) -> Self {
        CacheError::Producer(Arc::new(err))
    }

    /// Underlying producer error, if this is a fetch failure
    pub fn producer_error(&self) -> Option<&anyhow::Error> {
        match self {
            CacheError::Producer(err) => Some(err),
            _ => None,
        }
    }

    /// True for programmer errors that are returned before any fetch
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            CacheError::InvalidDescriptor(_) | CacheError::TypeMismatch { .. }
        )
    }
}
