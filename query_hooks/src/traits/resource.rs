//! Resource descriptions

use cache_system::Freshness;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use uuid::Uuid;

use crate::params::ListParams;

/// A remote collection shown by list, detail and statistics screens
pub trait Resource: Send + Sync + 'static {
    /// Resource name; list queries are keyed by it directly
    const NAME: &'static str;

    /// How quickly cached reads of this resource go out of date
    const FRESHNESS: Freshness;

    /// One record as returned by the API
    type Item: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// Payload for create and update requests
    type Draft: Clone + Debug + Send + Sync + Serialize + 'static;

    /// Aggregate counters shown on the resource's dashboard
    type Stats: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static;

    fn id(item: &Self::Item) -> Uuid;

    /// Other resources whose cached queries a mutation of this one makes stale
    fn dependents() -> &'static [&'static str] {
        &[]
    }

    fn detail_name() -> String {
        format!("{}/detail", Self::NAME)
    }

    fn statistics_name() -> String {
        format!("{}/statistics", Self::NAME)
    }
}

/// Record-level behavior needed to serve a resource from memory
pub trait MemoryBacked: Resource {
    fn create_item(id: Uuid, draft: Self::Draft) -> Self::Item;

    fn update_item(item: &mut Self::Item, draft: Self::Draft);

    /// Whether a record passes the search and filters of a list query
    fn matches(item: &Self::Item, params: &ListParams) -> bool;

    fn summarize(items: &[Self::Item]) -> Self::Stats;
}
