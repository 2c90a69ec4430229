//! Traits describing a remote resource
//!
//! A `Resource` names a family of queries and fixes its payload types; a
//! `ResourceApi` is the request layer that fetches and mutates it.

pub mod api;
pub mod resource;

pub use api::ResourceApi;
pub use resource::{MemoryBacked, Resource};
