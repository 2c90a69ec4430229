//! Generic resource façade
//!
//! `ResourceQuery` is what a screen talks to. Reads go through the cache with
//! the resource's freshness; mutations go straight to the API and, once they
//! succeed, mark every list, detail and statistics query of the resource (and
//! of its dependents) stale.

use std::marker::PhantomData;
use std::sync::Arc;

use cache_system::{producer, CacheManager, InvalidationRule, QueryOptions, QueryState};
use config::ResourceConfig;
use query_key::QueryDescriptor;
use signal_system::{CacheEvent, SubscriptionId};
use uuid::Uuid;

use crate::errors::HookError;
use crate::params::{ListParams, Page};
use crate::traits::{Resource, ResourceApi};

pub struct ResourceQuery<R, A>
where
    R: Resource,
    A: ResourceApi<R>,
{
    cache: CacheManager,
    api: Arc<A>,
    options: QueryOptions,
    _resource: PhantomData<fn() -> R>,
}

impl<R, A> Clone for ResourceQuery<R, A>
where
    R: Resource,
    A: ResourceApi<R>,
{
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            api: Arc::clone(&self.api),
            options: self.options.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R, A> std::fmt::Debug for ResourceQuery<R, A>
where
    R: Resource,
    A: ResourceApi<R>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceQuery")
            .field("resource", &R::NAME)
            .field("options", &self.options)
            .finish()
    }
}

impl<R, A> ResourceQuery<R, A>
where
    R: Resource,
    A: ResourceApi<R>,
{
    /// Façade using the cache's default timing for the resource's freshness
    pub fn new(cache: CacheManager, api: Arc<A>) -> Self {
        Self::with_overrides(cache, api, None)
    }

    /// Façade with per-resource timing overrides from configuration
    pub fn with_overrides(
        cache: CacheManager,
        api: Arc<A>,
        overrides: Option<&ResourceConfig>,
    ) -> Self {
        let options = QueryOptions::from_config(cache.config(), R::FRESHNESS, overrides);
        Self {
            cache,
            api,
            options,
            _resource: PhantomData,
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &'static str {
        R::NAME
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn list_descriptor(&self, params: &ListParams) -> QueryDescriptor {
        params.descriptor(R::NAME)
    }

    pub fn detail_descriptor(&self, id: Option<Uuid>) -> QueryDescriptor {
        QueryDescriptor::new(R::detail_name()).with_param("id", id)
    }

    pub fn statistics_descriptor(&self) -> QueryDescriptor {
        QueryDescriptor::new(R::statistics_name())
    }

    /// One page of the resource
    pub async fn list(&self, params: &ListParams) -> Result<QueryState<Page<R::Item>>, HookError> {
        let api = Arc::clone(&self.api);
        let request = params.clone();
        let fetch = producer(move |_| {
            let api = Arc::clone(&api);
            let request = request.clone();
            async move { api.list(&request).await }
        });

        Ok(self
            .cache
            .query(self.list_descriptor(params), fetch, self.options.clone())
            .await?)
    }

    /// Fetch one page regardless of freshness (the refresh button)
    pub async fn refetch_list(
        &self,
        params: &ListParams,
    ) -> Result<QueryState<Page<R::Item>>, HookError> {
        let api = Arc::clone(&self.api);
        let request = params.clone();
        let fetch = producer(move |_| {
            let api = Arc::clone(&api);
            let request = request.clone();
            async move { api.list(&request).await }
        });

        Ok(self
            .cache
            .refetch(self.list_descriptor(params), fetch, self.options.clone())
            .await?)
    }

    /// One record. Stays idle until an id is known.
    pub async fn detail(&self, id: Option<Uuid>) -> Result<QueryState<R::Item>, HookError> {
        let api = Arc::clone(&self.api);
        let fetch = producer(move |_| {
            let api = Arc::clone(&api);
            async move {
                match id {
                    Some(id) => api.get(id).await,
                    None => anyhow::bail!("{} detail requested without an id", R::NAME),
                }
            }
        });

        let options = self.options.clone().with_enabled(id.is_some());
        Ok(self
            .cache
            .query(self.detail_descriptor(id), fetch, options)
            .await?)
    }

    /// Dashboard counters for the resource
    pub async fn statistics(&self) -> Result<QueryState<R::Stats>, HookError> {
        let api = Arc::clone(&self.api);
        let fetch = producer(move |_| {
            let api = Arc::clone(&api);
            async move { api.statistics().await }
        });

        Ok(self
            .cache
            .query(self.statistics_descriptor(), fetch, self.options.clone())
            .await?)
    }

    pub async fn create(&self, draft: R::Draft) -> Result<R::Item, HookError> {
        let item = self
            .api
            .create(draft)
            .await
            .map_err(|error| HookError::mutation(R::NAME, "create", error))?;

        self.invalidate();
        debug_log!("Created {} {}", R::NAME, R::id(&item));
        Ok(item)
    }

    /// Update a record; its detail query is refreshed with the response
    pub async fn update(&self, id: Uuid, draft: R::Draft) -> Result<R::Item, HookError> {
        let item = self
            .api
            .update(id, draft)
            .await
            .map_err(|error| HookError::mutation(R::NAME, "update", error))?;

        self.invalidate();
        self.cache
            .set_query_data(&self.detail_descriptor(Some(id)), item.clone(), &self.options)?;
        debug_log!("Updated {} {}", R::NAME, id);
        Ok(item)
    }

    /// Delete a record; its detail query is dropped from the cache
    pub async fn delete(&self, id: Uuid) -> Result<(), HookError> {
        self.api
            .delete(id)
            .await
            .map_err(|error| HookError::mutation(R::NAME, "delete", error))?;

        self.invalidate();
        let detail = InvalidationRule::exact(&self.detail_descriptor(Some(id)))
            .map_err(cache_system::CacheError::from)?;
        self.cache.evict(&detail);
        debug_log!("Deleted {} {}", R::NAME, id);
        Ok(())
    }

    /// Mark every query of this resource and its dependents stale
    pub fn invalidate(&self) -> usize {
        let mut affected = self.cache.invalidate(&InvalidationRule::family(R::NAME));
        for dependent in R::dependents() {
            affected += self.cache.invalidate(&InvalidationRule::family(*dependent));
        }
        tracing::debug!("Invalidated {} cached {} queries", affected, R::NAME);
        affected
    }

    /// Cached page without fetching
    pub fn cached_list(&self, params: &ListParams) -> Result<Option<Arc<Page<R::Item>>>, HookError> {
        Ok(self.cache.get_query_data(&self.list_descriptor(params))?)
    }

    /// Be told whenever the cached page for `params` changes
    pub fn subscribe_list<F>(&self, params: &ListParams, callback: F) -> Result<SubscriptionId, HookError>
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        Ok(self.cache.subscribe(&self.list_descriptor(params), callback)?)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.cache.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryApi;
    use crate::params::Filter;
    use crate::resources::{
        Course, CourseDraft, Courses, Student, StudentDraft, StudentStatus, Students, TransferDraft,
        TransferStatus, Transfers,
    };
    use cache_system::QueryStatus;
    use std::time::Duration;

    fn roster(count: usize) -> Vec<Student> {
        (0..count)
            .map(|i| {
                let mut draft = StudentDraft::new(&format!("Student{i}"), "Doe", 9 + (i % 4) as u8);
                if i % 5 == 0 {
                    draft.status = StudentStatus::Graduated;
                }
                <Students as crate::traits::MemoryBacked>::create_item(Uuid::new_v4(), draft)
            })
            .collect()
    }

    fn students(count: usize) -> (StudentsQuery, Arc<InMemoryApi<Students>>) {
        let api = Arc::new(InMemoryApi::<Students>::new(roster(count)));
        let query = ResourceQuery::new(CacheManager::with_defaults(), Arc::clone(&api));
        (query, api)
    }

    type StudentsQuery = ResourceQuery<Students, InMemoryApi<Students>>;

    #[tokio::test(start_paused = true)]
    async fn test_list_reuses_cached_pages() {
        let (query, api) = students(42);

        let first = query.list(&ListParams::new()).await.unwrap();
        let page = first.data().unwrap();
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.total, 42);

        query.list(&ListParams::new().page(2)).await.unwrap();
        assert_eq!(api.calls().list(), 2);

        let again = query.list(&ListParams::new()).await.unwrap();
        assert!(!again.is_stale);
        assert_eq!(api.calls().list(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filters_are_part_of_the_key() {
        let (query, api) = students(20);

        let graduated = query
            .list(&ListParams::new().status(Filter::is("graduated")))
            .await
            .unwrap();
        assert_eq!(graduated.data().unwrap().total, 4);

        let all = query
            .list(&ListParams::new().status(Filter::parse("All")))
            .await
            .unwrap();
        assert_eq!(all.data().unwrap().total, 20);
        assert_eq!(api.calls().list(), 2);

        query.list(&ListParams::new()).await.unwrap();
        assert_eq!(api.calls().list(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detail_is_idle_without_id() {
        let (query, api) = students(3);

        let idle = query.detail(None).await.unwrap();
        assert_eq!(idle.status, QueryStatus::Idle);
        assert_eq!(api.calls().get(), 0);

        let id = api.records()[1].id;
        let detail = query.detail(Some(id)).await.unwrap();
        assert_eq!(detail.data().unwrap().id, id);
        assert_eq!(api.calls().get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_invalidates_lists_and_statistics() {
        let (query, api) = students(42);

        query.list(&ListParams::new()).await.unwrap();
        let stats = query.statistics().await.unwrap();
        assert_eq!(stats.data().unwrap().total, 42);

        let victim = api.records()[0].id;
        query.detail(Some(victim)).await.unwrap();
        query.delete(victim).await.unwrap();

        let stale = query.list(&ListParams::new()).await.unwrap();
        assert!(stale.is_stale);
        assert_eq!(stale.data().unwrap().total, 42);

        tokio::time::sleep(Duration::from_millis(1)).await;
        let fresh = query.list(&ListParams::new()).await.unwrap();
        assert_eq!(fresh.data().unwrap().total, 41);

        let stats = query
            .statistics()
            .await
            .unwrap()
            .refetch()
            .await
            .unwrap();
        assert_eq!(stats.data().unwrap().total, 41);

        // The deleted record's detail is gone, not just stale
        let detail_key = query.detail_descriptor(Some(victim)).key().unwrap();
        assert!(!query.cache.store().contains(&detail_key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_refreshes_detail() {
        let (query, api) = students(2);
        let target = api.records()[0].clone();
        query.detail(Some(target.id)).await.unwrap();

        let mut draft = StudentDraft::new("Ada", "Lovelace", 12);
        draft.email = target.email.clone();
        let updated = query.update(target.id, draft).await.unwrap();
        assert_eq!(updated.first_name, "Ada");

        let detail = query.detail(Some(target.id)).await.unwrap();
        assert!(!detail.is_stale);
        assert_eq!(detail.data().unwrap().first_name, "Ada");
        assert_eq!(api.calls().get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_mutation_leaves_cache_untouched() {
        let (query, api) = students(5);
        query.list(&ListParams::new()).await.unwrap();

        api.set_failure(Some("500 Internal Server Error"));
        let err = query
            .create(StudentDraft::new("Grace", "Hopper", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Mutation { operation: "create", .. }));
        assert!(err.to_string().contains("500"));

        api.set_failure(None);
        let cached = query.list(&ListParams::new()).await.unwrap();
        assert!(!cached.is_stale);
        assert_eq!(api.calls().list(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_failure_is_error_state() {
        let (query, api) = students(5);
        api.set_failure(Some("503 Service Unavailable"));

        let state = query.list(&ListParams::new()).await.unwrap();
        assert!(state.is_error());
        assert!(state.data.is_none());

        api.set_failure(None);
        let retried = state.refetch().await.unwrap();
        assert!(retried.is_success());
        assert_eq!(retried.data().unwrap().total, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_mutation_invalidates_dependents() {
        let cache = CacheManager::with_defaults();
        let students_api = Arc::new(InMemoryApi::<Students>::new(roster(3)));
        let courses_api = Arc::new(InMemoryApi::<Courses>::new(Vec::new()));
        let transfers_api = Arc::new(InMemoryApi::<Transfers>::new(Vec::new()));

        let students: StudentsQuery = ResourceQuery::new(cache.clone(), Arc::clone(&students_api));
        let courses: ResourceQuery<Courses, _> = ResourceQuery::new(cache.clone(), courses_api);
        let transfers: ResourceQuery<Transfers, _> = ResourceQuery::new(cache.clone(), transfers_api);

        let course: Course = courses
            .create(CourseDraft {
                code: "BIO-101".into(),
                title: "Biology".into(),
                category: "science".into(),
                credits: 3,
                capacity: 30,
                teacher_id: None,
                is_active: true,
            })
            .await
            .unwrap();

        students.list(&ListParams::new()).await.unwrap();
        courses.list(&ListParams::new()).await.unwrap();

        transfers
            .create(TransferDraft {
                student_id: students_api.records()[0].id,
                from_course_id: None,
                to_course_id: course.id,
                reason: "Schedule conflict".into(),
                status: TransferStatus::Pending,
            })
            .await
            .unwrap();

        assert!(students.list(&ListParams::new()).await.unwrap().is_stale);
        assert!(courses.list(&ListParams::new()).await.unwrap().is_stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_courses_stay_fresh_longer_than_students() {
        let cache = CacheManager::with_defaults();
        let courses: ResourceQuery<Courses, _> =
            ResourceQuery::new(cache.clone(), Arc::new(InMemoryApi::<Courses>::default()));
        let students: StudentsQuery = ResourceQuery::new(cache, Arc::new(InMemoryApi::new(roster(1))));

        courses.list(&ListParams::new()).await.unwrap();
        students.list(&ListParams::new()).await.unwrap();
        tokio::time::advance(Duration::from_secs(180)).await;

        assert!(!courses.list(&ListParams::new()).await.unwrap().is_stale);
        assert!(students.list(&ListParams::new()).await.unwrap().is_stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resource_overrides() {
        let overrides = config::ResourceConfig::with_stale_time_ms(1_000);
        let query: StudentsQuery = ResourceQuery::with_overrides(
            CacheManager::with_defaults(),
            Arc::new(InMemoryApi::new(roster(1))),
            Some(&overrides),
        );
        assert_eq!(query.options().stale_time, Duration::from_secs(1));
        assert_eq!(query.name(), "students");
    }
}
