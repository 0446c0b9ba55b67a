//! Refresh loop timing on tokio's paused clock

mod common;

use common::FakeRegistry;
use registry_catalog_cache::error::RegistryError;
use registry_catalog_cache::logging::Logger;
use registry_catalog_cache::sync::{MetadataCache, Scheduler};
use registry_catalog_cache::RefreshPolicy;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

fn start(registry: &Arc<FakeRegistry>, policy: RefreshPolicy) -> (Arc<MetadataCache>, Scheduler) {
    let cache = Arc::new(
        MetadataCache::new(registry.clone(), policy).with_logger(Logger::new_quiet()),
    );
    let scheduler = Scheduler::start(Arc::clone(&cache));
    (cache, scheduler)
}

fn registry_with_app() -> Arc<FakeRegistry> {
    let registry = FakeRegistry::new();
    registry.set_catalog_pages(&[&["app"]]);
    registry.set_tags("app", &["v1", "v2"]);
    registry
}

#[tokio::test(start_paused = true)]
async fn test_one_shot_catalog_without_tag_loop_finishes() {
    let registry = registry_with_app();
    let (cache, mut scheduler) = start(&registry, RefreshPolicy::new(0, 0, 5));

    scheduler.wait().await.unwrap();

    assert!(cache.is_catalog_ready());
    assert_eq!(registry.catalog_page_calls(), 1);
    assert_eq!(registry.list_tags_calls("app"), 0);

    sleep(Duration::from_secs(3600)).await;
    assert_eq!(registry.catalog_page_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_first_catalog_failure_stops_scheduler() {
    let registry = registry_with_app();
    registry.set_catalog_fails(true);
    let (cache, mut scheduler) = start(&registry, RefreshPolicy::new(1, 1, 5));

    let err = scheduler.wait().await.unwrap_err();

    assert!(matches!(err, RegistryError::CatalogUnavailable(_)));
    assert!(!cache.is_catalog_ready());
    assert_eq!(registry.list_tags_calls("app"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_refresh_starts_tag_loop_once() {
    let registry = registry_with_app();
    let (cache, scheduler) = start(&registry, RefreshPolicy::new(1, 2, 5));

    sleep(Duration::from_secs(61)).await;
    assert_eq!(registry.catalog_page_calls(), 2);
    assert_eq!(registry.list_tags_calls("app"), 1);
    assert!(cache.tags().contains("app"));

    sleep(Duration::from_secs(60)).await;
    assert_eq!(registry.catalog_page_calls(), 3);
    assert_eq!(registry.list_tags_calls("app"), 2);

    scheduler.shutdown().await.unwrap();
    let (catalog_job, tags_job) = cache.job_info();
    assert!(catalog_job.is_some());
    assert!(tags_job.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_one_shot_catalog_keeps_tag_loop_running() {
    let registry = registry_with_app();
    let (_cache, mut scheduler) = start(&registry, RefreshPolicy::new(0, 1, 5));

    assert!(timeout(Duration::from_secs(125), scheduler.wait()).await.is_err());

    assert_eq!(registry.catalog_page_calls(), 1);
    assert_eq!(registry.list_tags_calls("app"), 3);

    scheduler.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_sleeping_loops() {
    let registry = registry_with_app();
    let (_cache, scheduler) = start(&registry, RefreshPolicy::new(60, 60, 5));

    sleep(Duration::from_secs(1)).await;
    assert_eq!(registry.catalog_page_calls(), 1);
    assert_eq!(registry.list_tags_calls("app"), 1);

    scheduler.shutdown().await.unwrap();

    sleep(Duration::from_secs(4 * 3600)).await;
    assert_eq!(registry.catalog_page_calls(), 1);
    assert_eq!(registry.list_tags_calls("app"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_later_catalog_failure_keeps_running() {
    let registry = registry_with_app();
    let (cache, mut scheduler) = start(&registry, RefreshPolicy::new(1, 0, 5));

    sleep(Duration::from_secs(1)).await;
    registry.set_catalog_fails(true);

    assert!(timeout(Duration::from_secs(120), scheduler.wait()).await.is_err());
    assert_eq!(registry.catalog_page_calls(), 3);
    assert_eq!(*cache.repositories(), vec!["app".to_string()]);
    assert!(cache.is_catalog_ready());

    scheduler.shutdown().await.unwrap();
}
