//! Integration tests for the query client
//!
//! Covers resource registration, configuration overrides, event listeners,
//! background garbage collection and JSON-built descriptors.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use campus_query::prelude::*;
use serde_json::json;

#[test]
fn test_resource_registry() {
    let mut client = QueryClient::with_defaults();
    client
        .register_resource::<Students, _>(Arc::new(InMemoryApi::<Students>::default()))
        .unwrap();
    client
        .register_resource::<Courses, _>(Arc::new(InMemoryApi::<Courses>::default()))
        .unwrap();

    let duplicate =
        client.register_resource::<Students, _>(Arc::new(InMemoryApi::<Students>::default()));
    assert!(matches!(
        duplicate,
        Err(ClientError::ResourceAlreadyRegistered(name)) if name == "students"
    ));

    assert_eq!(client.list_resources(), vec!["courses", "students"]);
    assert!(client
        .resource::<Courses, InMemoryApi<Courses>>()
        .is_ok());

    client.unregister_resource("courses").unwrap();
    assert!(matches!(
        client.resource::<Courses, InMemoryApi<Courses>>(),
        Err(ClientError::ResourceNotFound(_))
    ));
    assert!(client.unregister_resource("courses").is_err());
}

#[test]
fn test_config_overrides_reach_facades() {
    let config = AppConfig::from_toml_str(
        r#"
        [cache]
        volatile_stale_time_ms = 60000

        [resources.transfers]
        stale_time_ms = 5000
        gc_time_ms = 20000
        "#,
    )
    .unwrap();
    let client = QueryClient::new(config).unwrap();

    let transfers =
        client.resource_query::<Transfers, _>(Arc::new(InMemoryApi::<Transfers>::default()));
    assert_eq!(transfers.options().stale_time, Duration::from_secs(5));
    assert_eq!(transfers.options().gc_time, Duration::from_secs(20));

    let students =
        client.resource_query::<Students, _>(Arc::new(InMemoryApi::<Students>::default()));
    assert_eq!(students.options().stale_time, Duration::from_secs(60));

    let courses = client.resource_query::<Courses, _>(Arc::new(InMemoryApi::<Courses>::default()));
    assert_eq!(courses.options().stale_time, Duration::from_secs(600));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = AppConfig::default();
    config.signal.max_subscribers_per_key = 0;
    assert!(matches!(
        QueryClient::new(config),
        Err(ClientError::Config(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_listeners_see_every_key() {
    let client = QueryClient::with_defaults();
    let events = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&events);
    client.add_listener(move |event| {
        if event.event_type == EventType::Succeeded {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let students =
        client.resource_query::<Students, _>(Arc::new(InMemoryApi::<Students>::default()));
    students.list(&ListParams::new()).await.unwrap();
    students.list(&ListParams::new().page(2)).await.unwrap();
    students.statistics().await.unwrap();

    assert_eq!(events.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_page_subscription_only_hears_its_page() {
    let client = QueryClient::with_defaults();
    let students =
        client.resource_query::<Students, _>(Arc::new(InMemoryApi::<Students>::default()));
    let heard = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&heard);
    let id = students
        .subscribe_list(&ListParams::new().page(2), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    students.list(&ListParams::new()).await.unwrap();
    assert_eq!(heard.load(Ordering::SeqCst), 0);

    students.list(&ListParams::new().page(2)).await.unwrap();
    // Fetching, then Succeeded
    assert_eq!(heard.load(Ordering::SeqCst), 2);

    assert!(students.unsubscribe(id));
    client.invalidate_all();
    assert_eq!(heard.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_background_gc_drops_unused_pages() {
    let mut config = AppConfig::default();
    config.cache.gc_time_ms = 30_000;
    config.cache.gc_interval_ms = 5_000;
    let mut client = QueryClient::new(config).unwrap();
    client.start_gc();
    assert!(client.is_gc_running());

    let api = Arc::new(InMemoryApi::<Students>::default());
    let students = client.resource_query::<Students, _>(Arc::clone(&api));
    students.list(&ListParams::new()).await.unwrap();
    assert_eq!(client.cache().store().len(), 1);

    tokio::time::sleep(Duration::from_secs(40)).await;
    assert!(client.cache().store().is_empty());
    assert!(client.stats().evictions() >= 1);

    // Collected pages are fetched again on the next read
    students.list(&ListParams::new()).await.unwrap();
    assert_eq!(api.calls().list(), 2);

    client.shutdown().await;
    assert!(!client.is_gc_running());
}

#[tokio::test(start_paused = true)]
async fn test_json_descriptors_share_keys_with_typed_params() {
    let client = QueryClient::with_defaults();
    let cache = client.cache();

    let from_json = QueryDescriptor::from_json(
        "students",
        &json!({ "status": "ALL", "limit": "10", "page": 1, "search": "", "category": null }),
    )
    .unwrap();
    assert_eq!(
        from_json.key().unwrap(),
        ListParams::new().descriptor("students").key().unwrap()
    );

    let nested = QueryDescriptor::from_json("students", &json!({ "filter": { "status": "active" } }));
    assert!(nested.is_err());

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let fetch = producer(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, anyhow::Error>(Page::<Student>::new(Vec::new(), 0, 1, 10)) }
    });
    cache
        .query(from_json, Arc::clone(&fetch), QueryOptions::default())
        .await
        .unwrap();
    cache
        .query(
            ListParams::new().descriptor("students"),
            fetch,
            QueryOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
