//! Request layer for a resource

use async_trait::async_trait;
use uuid::Uuid;

use super::resource::Resource;
use crate::params::{ListParams, Page};

/// Remote operations on one resource.
///
/// Implementations return `Err` for transport failures and non-success
/// responses; the cache records them as query state.
#[async_trait]
pub trait ResourceApi<R: Resource>: Send + Sync + 'static {
    /// One page of records matching the params
    async fn list(&self, params: &ListParams) -> anyhow::Result<Page<R::Item>>;

    /// A single record by id
    async fn get(&self, id: Uuid) -> anyhow::Result<R::Item>;

    async fn statistics(&self) -> anyhow::Result<R::Stats>;

    async fn create(&self, draft: R::Draft) -> anyhow::Result<R::Item>;

    async fn update(&self, id: Uuid, draft: R::Draft) -> anyhow::Result<R::Item>;

    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
}
