//! Cache invalidation support
//!
//! Provides the rules used after a mutation to force the next read of the
//! affected queries to refetch. Invalidation never drops data: matching
//! entries are only marked stale so screens keep rendering them until the
//! refetch lands.

use std::sync::Arc;

use query_key::{KeyError, QueryDescriptor, QueryKey};

use crate::manager::CacheManager;

/// Which cached queries an invalidation applies to
#[derive(Clone)]
pub enum InvalidationRule {
    /// One specific query
    Exact(QueryKey),
    /// Every query of one resource, whatever its params
    Resource(String),
    /// A resource and its sub-queries (`students`, `students/detail`, `students/statistics`)
    Family(String),
    /// Any predicate over the resource name
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
    /// Everything in the cache
    All,
}

impl InvalidationRule {
    pub fn exact(descriptor: &QueryDescriptor) -> Result<Self, KeyError> {
        descriptor.key().map(InvalidationRule::Exact)
    }

    pub fn resource(name: impl Into<String>) -> Self {
        InvalidationRule::Resource(name.into())
    }

    pub fn family(name: impl Into<String>) -> Self {
        InvalidationRule::Family(name.into())
    }

    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        InvalidationRule::Predicate(Arc::new(predicate))
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            InvalidationRule::Exact(exact) => exact == key,
            InvalidationRule::Resource(name) => key.resource() == name,
            InvalidationRule::Family(name) => in_family(key.resource(), name),
            InvalidationRule::Predicate(predicate) => predicate(key.resource()),
            InvalidationRule::All => true,
        }
    }
}

impl std::fmt::Debug for InvalidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationRule::Exact(key) => f.debug_tuple("Exact").field(key).finish(),
            InvalidationRule::Resource(name) => f.debug_tuple("Resource").field(name).finish(),
            InvalidationRule::Family(name) => f.debug_tuple("Family").field(name).finish(),
            InvalidationRule::Predicate(_) => f.write_str("Predicate(..)"),
            InvalidationRule::All => f.write_str("All"),
        }
    }
}

fn in_family(resource: &str, family: &str) -> bool {
    resource == family
        || resource
            .strip_prefix(family)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Mutations that make cached queries of a resource untrustworthy
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidationEvent {
    Created { resource: String },
    Updated { resource: String, id: String },
    Deleted { resource: String, id: String },
    /// Force invalidation of everything
    InvalidateAll,
}

impl InvalidationEvent {
    pub fn created(resource: impl Into<String>) -> Self {
        Self::Created {
            resource: resource.into(),
        }
    }

    pub fn updated(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::Updated {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn deleted(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::Deleted {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    /// Rule covering every list, detail and statistics query of the mutated resource
    pub fn rule(&self) -> InvalidationRule {
        match self {
            Self::Created { resource }
            | Self::Updated { resource, .. }
            | Self::Deleted { resource, .. } => InvalidationRule::family(resource.clone()),
            Self::InvalidateAll => InvalidationRule::All,
        }
    }
}

/// Components that can trigger cache invalidation
pub trait CacheInvalidator: Send + Sync {
    /// Mark every query of a resource family stale
    fn invalidate_resource(&self, resource: &str) -> usize;

    /// Mark every cached query stale
    fn invalidate_all(&self) -> usize;
}

impl CacheManager {
    /// Mark every matching entry stale. Data stays readable until replaced.
    pub fn invalidate(&self, rule: &InvalidationRule) -> usize {
        let affected = self.store().mark_stale(|key| rule.matches(key));
        self.stats().record_invalidations(affected.len() as u64);
        tracing::debug!("Invalidated {} entries matching {:?}", affected.len(), rule);
        affected.len()
    }

    /// Remove every matching entry outright
    pub fn evict(&self, rule: &InvalidationRule) -> usize {
        let removed = self.store().remove_where(|key| rule.matches(key));
        self.supersede_keys(&removed);
        self.stats().record_evictions(removed.len() as u64);
        tracing::debug!("Evicted {} entries matching {:?}", removed.len(), rule);
        removed.len()
    }

    /// Apply the invalidation implied by a mutation
    pub fn handle_event(&self, event: &InvalidationEvent) -> usize {
        self.invalidate(&event.rule())
    }
}

impl CacheInvalidator for CacheManager {
    fn invalidate_resource(&self, resource: &str) -> usize {
        self.invalidate(&InvalidationRule::family(resource))
    }

    fn invalidate_all(&self) -> usize {
        self.invalidate(&InvalidationRule::All)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{producer, Producer};
    use crate::params::QueryOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn list(page: i64) -> QueryDescriptor {
        QueryDescriptor::new("students").with_param("page", page)
    }

    fn stats() -> QueryDescriptor {
        QueryDescriptor::new("students/statistics")
    }

    fn counting(calls: &Arc<AtomicUsize>) -> Producer<usize> {
        let calls = Arc::clone(calls);
        producer(move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok::<_, anyhow::Error>(n) }
        })
    }

    #[test]
    fn test_family_matching() {
        let key = |name: &str| QueryDescriptor::new(name).key().unwrap();
        let rule = InvalidationRule::family("students");

        assert!(rule.matches(&key("students")));
        assert!(rule.matches(&key("students/statistics")));
        assert!(!rule.matches(&key("student-grades")));
        assert!(!rule.matches(&key("teachers")));

        let resource = InvalidationRule::resource("students");
        assert!(!resource.matches(&key("students/statistics")));
    }

    #[test]
    fn test_event_rule() {
        let event = InvalidationEvent::deleted("students", 7);
        match event.rule() {
            InvalidationRule::Family(name) => assert_eq!(name, "students"),
            other => panic!("Expected Family rule, got {:?}", other),
        }
        assert!(matches!(
            InvalidationEvent::InvalidateAll.rule(),
            InvalidationRule::All
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidated_query_refetches_and_keeps_data_visible() {
        let cache = CacheManager::with_defaults();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .query(list(1), counting(&calls), QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(first.data(), Some(&1));

        assert_eq!(cache.invalidate_resource("students"), 1);

        // Still within stale time, but invalidated: stale data now, refetch in background
        let stale = cache
            .query(list(1), counting(&calls), QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(stale.data(), Some(&1));
        assert!(stale.is_stale);
        assert!(stale.is_fetching);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let fresh = cache
            .query(list(1), counting(&calls), QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(fresh.data(), Some(&2));
        assert!(!fresh.is_stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_rule_leaves_other_pages_fresh() {
        let cache = CacheManager::with_defaults();
        let calls = Arc::new(AtomicUsize::new(0));
        for page in 1..=2 {
            cache
                .query(list(page), counting(&calls), QueryOptions::default())
                .await
                .unwrap();
        }

        let rule = InvalidationRule::exact(&list(2)).unwrap();
        assert_eq!(cache.invalidate(&rule), 1);

        let page_one = cache
            .query(list(1), counting(&calls), QueryOptions::default())
            .await
            .unwrap();
        assert!(!page_one.is_stale);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutation_event_covers_lists_and_statistics() {
        let cache = CacheManager::with_defaults();
        let calls = Arc::new(AtomicUsize::new(0));
        cache
            .query(list(1), counting(&calls), QueryOptions::default())
            .await
            .unwrap();
        cache
            .query(stats(), counting(&calls), QueryOptions::default())
            .await
            .unwrap();
        cache
            .query(
                QueryDescriptor::new("teachers"),
                counting(&calls),
                QueryOptions::default(),
            )
            .await
            .unwrap();

        let affected = cache.handle_event(&InvalidationEvent::created("students"));
        assert_eq!(affected, 2);
        assert_eq!(cache.stats().invalidations(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_removes_entries() {
        let cache = CacheManager::with_defaults();
        let calls = Arc::new(AtomicUsize::new(0));
        cache
            .query(list(1), counting(&calls), QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(cache.evict(&InvalidationRule::All), 1);
        assert!(cache.store().is_empty());
        assert!(cache.get_query_data::<usize>(&list(1)).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicted_detail_ignores_response_in_flight() {
        let cache = CacheManager::with_defaults();
        let detail = QueryDescriptor::new("students/detail").with_param("id", "s-1");
        let detail_key = detail.key().unwrap();
        let gate = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let gated: Producer<String> = {
            let gate = Arc::clone(&gate);
            let calls = Arc::clone(&calls);
            producer(move |_| {
                let gate = Arc::clone(&gate);
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    gate.notified().await;
                    Ok::<_, anyhow::Error>("before delete".to_string())
                }
            })
        };

        let pending = tokio::spawn({
            let cache = cache.clone();
            let detail = detail.clone();
            async move { cache.query(detail, gated, QueryOptions::default()).await }
        });
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(cache.is_fetching(&detail_key));

        // Delete: the family goes stale and the detail is evicted mid-fetch
        cache.invalidate(&InvalidationRule::family("students"));
        assert_eq!(cache.evict(&InvalidationRule::exact(&detail).unwrap()), 1);
        assert!(!cache.is_fetching(&detail_key));

        gate.notify_one();
        let late = pending.await.unwrap().unwrap();
        assert!(late.data().is_none());
        assert!(cache.store().is_empty());
        assert_eq!(cache.stats().discarded(), 1);

        // The next read fetches again instead of serving the deleted record
        let after: Producer<String> = {
            let calls = Arc::clone(&calls);
            producer(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, anyhow::Error>("after delete".to_string()) }
            })
        };
        let state = cache
            .query(detail, after, QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(state.data().map(String::as_str), Some("after delete"));
        assert!(!state.is_stale);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicate_rule() {
        let cache = CacheManager::with_defaults();
        let calls = Arc::new(AtomicUsize::new(0));
        for name in ["students", "courses", "courses/statistics"] {
            cache
                .query(QueryDescriptor::new(name), counting(&calls), QueryOptions::default())
                .await
                .unwrap();
        }

        let rule = InvalidationRule::predicate(|resource| resource.starts_with("courses"));
        assert_eq!(cache.invalidate(&rule), 2);
    }
}
