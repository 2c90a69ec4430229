//! Error types for key derivation
//!
//! Every variant here is a programmer error: the descriptor could not be
//! turned into a canonical key, so no fetch is attempted.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeyError {
    #[error("Resource name cannot be empty")]
    EmptyResourceName,

    #[error("Parameter name cannot be empty (resource: {0})")]
    EmptyParamName(String),

    #[error("Parameter '{param}' must be a primitive value, got a nested {kind}")]
    NonPrimitive { param: String, kind: &'static str },

    #[error("Parameter '{param}' must be an integer, got '{value}'")]
    NonIntegral { param: String, value: String },

    #[error("Parameter '{param}' is not a finite number")]
    NonFinite { param: String },

    #[error("Query parameters must be a JSON object, got {0}")]
    ParamsNotObject(&'static str),
}
