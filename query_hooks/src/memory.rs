//! In-memory resource API
//!
//! Serves a resource from a vector of records, with optional latency and
//! injected failures. Used by the demo and by tests that need a backend with
//! observable call counts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::params::{ListParams, Page};
use crate::traits::{MemoryBacked, ResourceApi};

/// Number of requests received per operation
#[derive(Debug, Default)]
pub struct ApiCalls {
    list: AtomicUsize,
    get: AtomicUsize,
    statistics: AtomicUsize,
    mutations: AtomicUsize,
}

impl ApiCalls {
    pub fn list(&self) -> usize {
        self.list.load(Ordering::SeqCst)
    }

    pub fn get(&self) -> usize {
        self.get.load(Ordering::SeqCst)
    }

    pub fn statistics(&self) -> usize {
        self.statistics.load(Ordering::SeqCst)
    }

    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }
}

pub struct InMemoryApi<R: MemoryBacked> {
    records: RwLock<Vec<R::Item>>,
    calls: ApiCalls,
    latency: Option<Duration>,
    failure: RwLock<Option<String>>,
}

impl<R: MemoryBacked> Default for InMemoryApi<R> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<R: MemoryBacked> InMemoryApi<R> {
    pub fn new(records: Vec<R::Item>) -> Self {
        Self {
            records: RwLock::new(records),
            calls: ApiCalls::default(),
            latency: None,
            failure: RwLock::new(None),
        }
    }

    /// Delay every response by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every following request fail with `message` until cleared with `None`
    pub fn set_failure(&self, message: Option<&str>) {
        *self.failure.write() = message.map(str::to_string);
    }

    pub fn calls(&self) -> &ApiCalls {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn records(&self) -> Vec<R::Item> {
        self.records.read().clone()
    }

    async fn respond(&self, counter: &AtomicUsize) -> anyhow::Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let failure = self.failure.read().clone();
        match failure {
            Some(message) => Err(anyhow::anyhow!(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<R: MemoryBacked> ResourceApi<R> for InMemoryApi<R> {
    async fn list(&self, params: &ListParams) -> anyhow::Result<Page<R::Item>> {
        self.respond(&self.calls.list).await?;
        let records = self.records.read();
        let matching: Vec<&R::Item> = records
            .iter()
            .filter(|item| R::matches(item, params))
            .collect();
        let items = matching
            .iter()
            .skip(params.offset())
            .take(params.limit as usize)
            .map(|item| (*item).clone())
            .collect();
        Ok(Page::new(
            items,
            matching.len() as u64,
            params.page.max(1),
            params.limit,
        ))
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<R::Item> {
        self.respond(&self.calls.get).await?;
        self.records
            .read()
            .iter()
            .find(|item| R::id(item) == id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("404 Not Found: {} {}", R::NAME, id))
    }

    async fn statistics(&self) -> anyhow::Result<R::Stats> {
        self.respond(&self.calls.statistics).await?;
        Ok(R::summarize(&self.records.read()))
    }

    async fn create(&self, draft: R::Draft) -> anyhow::Result<R::Item> {
        self.respond(&self.calls.mutations).await?;
        let item = R::create_item(Uuid::new_v4(), draft);
        self.records.write().push(item.clone());
        Ok(item)
    }

    async fn update(&self, id: Uuid, draft: R::Draft) -> anyhow::Result<R::Item> {
        self.respond(&self.calls.mutations).await?;
        let mut records = self.records.write();
        let item = records
            .iter_mut()
            .find(|item| R::id(item) == id)
            .ok_or_else(|| anyhow::anyhow!("404 Not Found: {} {}", R::NAME, id))?;
        R::update_item(item, draft);
        Ok(item.clone())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        self.respond(&self.calls.mutations).await?;
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|item| R::id(item) != id);
        if records.len() == before {
            anyhow::bail!("404 Not Found: {} {}", R::NAME, id);
        }
        Ok(())
    }
}
