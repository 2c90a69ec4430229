//! # Campus Console Example
//!
//! This example walks through the screens of the campus console against an
//! in-memory API with simulated latency:
//! - Paging through students (cache hits vs misses)
//! - Two widgets asking for the same page at once (one request)
//! - Deleting a student and watching the list refetch
//! - Transfers invalidating students and courses
//!
//! Run with `RUST_LOG=debug cargo run --example campus_console --features debug-logging`
//! to see the cache's own logging.

use std::sync::Arc;
use std::time::{Duration, Instant};

use campus_query::prelude::*;
use campus_query::query_hooks::resources::{CourseDraft, StudentDraft, TransferDraft};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Campus Console Example");
    println!("======================");

    // 1. Client setup: campus-query.toml if present, defaults otherwise
    let config = AppConfig::load().unwrap_or_default();
    let mut client = QueryClient::new(config)?;
    client.start_gc();
    client.add_listener(|event| {
        tracing::debug!("{:?} {}", event.event_type, event.key);
    });

    let latency = Duration::from_millis(150);
    let students_api = Arc::new(InMemoryApi::<Students>::default().with_latency(latency));
    let courses_api = Arc::new(InMemoryApi::<Courses>::default().with_latency(latency));
    let transfers_api = Arc::new(InMemoryApi::<Transfers>::default().with_latency(latency));

    let students = client.register_resource::<Students, _>(Arc::clone(&students_api))?;
    let courses = client.register_resource::<Courses, _>(courses_api)?;
    let transfers = client.register_resource::<Transfers, _>(transfers_api)?;
    println!("Registered resources: {:?}", client.list_resources());

    // 2. Seed data through the façades
    for i in 0..42 {
        students
            .create(StudentDraft::new(&format!("Student{i:02}"), "Doe", 9 + (i % 4) as u8))
            .await?;
    }
    let biology = courses
        .create(CourseDraft {
            code: "BIO-101".to_string(),
            title: "Introduction to Biology".to_string(),
            category: "science".to_string(),
            credits: 3,
            capacity: 30,
            teacher_id: None,
            is_active: true,
        })
        .await?;

    // 3. Paging: the first visit to a page fetches, the second is served from cache
    let first_page = ListParams::new().page(1).limit(10);
    for (label, params) in [
        ("page 1", first_page.clone()),
        ("page 2", first_page.clone().page(2)),
        ("page 1 again", first_page.clone()),
    ] {
        let started = Instant::now();
        let state = students.list(&params).await?;
        if let Some(page) = state.data() {
            println!(
                "{label}: {} of {} students in {:?} (stale: {})",
                page.len(),
                page.total,
                started.elapsed(),
                state.is_stale
            );
        }
    }

    // 4. Two widgets rendering the same page share one request
    let before = students_api.calls().list();
    let third_page = first_page.clone().page(3);
    let (table, counter) = tokio::join!(students.list(&third_page), students.list(&third_page));
    table?;
    counter?;
    println!(
        "Two concurrent reads of page 3 made {} request(s)",
        students_api.calls().list() - before
    );

    // 5. Delete: the cached page is marked stale and refetched on the next read
    let victim = students_api.records()[0].id;
    students.delete(victim).await?;
    let refreshed = students.refetch_list(&first_page).await?;
    if let Some(page) = refreshed.data() {
        println!("After delete: {} students in total", page.total);
    }

    // 6. A transfer changes enrollment, so students and courses go stale too
    courses.list(&ListParams::new()).await?;
    transfers
        .create(TransferDraft {
            student_id: students_api.records()[0].id,
            from_course_id: None,
            to_course_id: biology.id,
            reason: "Schedule conflict".to_string(),
            status: TransferStatus::Pending,
        })
        .await?;
    let catalog = courses.list(&ListParams::new()).await?;
    println!("Course list stale after transfer: {}", catalog.is_stale);

    // 7. Failures become state, with data kept for the screen
    students_api.set_failure(Some("503 Service Unavailable"));
    let failed = students.refetch_list(&first_page).await?;
    println!(
        "While the API is down: status {:?}, error: {}, still showing {} rows",
        failed.status,
        failed
            .error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        failed.data().map_or(0, |page| page.len())
    );
    students_api.set_failure(None);
    let recovered = failed.refetch().await?;
    println!("Try again: status {:?}", recovered.status);

    let stats = client.stats();
    println!(
        "Cache stats: {} hits, {} stale hits, {} misses, {} fetches, {} joined, {} discarded (hit rate {:.0}%)",
        stats.hits(),
        stats.stale_hits(),
        stats.misses(),
        stats.fetches(),
        stats.joined(),
        stats.discarded(),
        stats.hit_rate() * 100.0
    );

    client.shutdown().await;
    Ok(())
}
