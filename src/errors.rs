//! Error types for the campus-query crate
//!
//! This module contains all error types that can be returned by `QueryClient` operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Resource not registered: {0}")]
    ResourceNotFound(String),

    #[error("Resource already registered: {0}")]
    ResourceAlreadyRegistered(String),
}
