//! Query Hooks - per-resource query façades for the campus console
//!
//! This crate provides the traits describing a remote resource and its API,
//! the typed list parameters every screen shares, and the generic
//! `ResourceQuery` façade that runs reads through the cache and invalidates
//! after mutations.

#[cfg(feature = "debug-logging")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub mod errors;
pub mod facade;
pub mod memory;
pub mod params;
pub mod prelude;
pub mod resources;
pub mod traits;

pub use errors::HookError;
pub use facade::ResourceQuery;
pub use memory::{ApiCalls, InMemoryApi};
pub use params::{Filter, ListParams, Page};
pub use resources::{
    CourseQuery, Courses, StudentQuery, Students, TeacherQuery, Teachers, TransferQuery, Transfers,
};
pub use traits::*;
