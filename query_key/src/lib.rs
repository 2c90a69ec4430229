//! Query key derivation for the campus-query cache
//!
//! This crate turns the logical identity of a query (a resource name plus its
//! page/filter/search parameters) into a canonical cache key.

pub mod codec;
pub mod descriptor;
pub mod errors;
pub mod types;

pub use codec::{derive_key, is_integral_param, QueryKey, INTEGRAL_PARAMS};
pub use descriptor::QueryDescriptor;
pub use errors::KeyError;
pub use types::ParamValue;
