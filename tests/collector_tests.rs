// Collector tests: one pass semantics, error entries, start/stop lifecycle

mod common;

use common::{FakeRuntime, docker_service, kuma_service};
use homerun::cache::TtlCache;
use homerun::collector::{CachedStats, StatusCollector};
use homerun::docker_repo::ContainerUsage;
use homerun::models::ServiceState;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn collector(
    runtime: Arc<FakeRuntime>,
    interval: Duration,
) -> (Arc<StatusCollector>, Arc<TtlCache<CachedStats>>) {
    let cache = Arc::new(TtlCache::new(Duration::from_secs(30)));
    let definitions = vec![
        docker_service("Web", "nginx"),
        kuma_service("Uptime", 4),
        docker_service("Database", "postgres"),
    ];
    let collector = Arc::new(StatusCollector::new(
        runtime,
        cache.clone(),
        &definitions,
        interval,
    ));
    (collector, cache)
}

#[tokio::test]
async fn collect_once_caches_running_container_with_usage() {
    let runtime = Arc::new(FakeRuntime::new().with_container(
        "nginx",
        "running",
        Some(ContainerUsage {
            cpu_percent: 3.5,
            memory_mb: 128.0,
        }),
    ));
    let (collector, cache) = collector(runtime.clone(), Duration::from_secs(10));

    collector.collect_once().await;

    let web = cache.get("nginx").expect("nginx cached");
    assert_eq!(web.status, ServiceState::Running);
    assert_eq!(web.cpu_percent, 3.5);
    assert_eq!(web.memory_mb, 128.0);
    assert!(web.started_at.is_some());
    // Only docker-backed services are polled.
    assert_eq!(runtime.info_calls(), 2);
}

#[tokio::test]
async fn unreachable_container_is_error_on_every_pass() {
    let runtime = Arc::new(FakeRuntime::new());
    let (collector, cache) = collector(runtime, Duration::from_secs(10));

    collector.collect_once().await;
    assert_eq!(cache.get("postgres").map(|c| c.status), Some(ServiceState::Error));
    collector.collect_once().await;
    assert_eq!(cache.get("postgres").map(|c| c.status), Some(ServiceState::Error));
}

#[tokio::test]
async fn container_that_disappears_does_not_keep_stale_running() {
    let runtime = Arc::new(FakeRuntime::new().with_container(
        "postgres",
        "running",
        Some(ContainerUsage {
            cpu_percent: 1.0,
            memory_mb: 64.0,
        }),
    ));
    let (collector, cache) = collector(runtime.clone(), Duration::from_secs(10));

    collector.collect_once().await;
    assert_eq!(cache.get("postgres").map(|c| c.status), Some(ServiceState::Running));

    runtime.remove_container("postgres");
    collector.collect_once().await;
    let db = cache.get("postgres").unwrap();
    assert_eq!(db.status, ServiceState::Error);
    assert_eq!(db.cpu_percent, 0.0);
    assert_eq!(db.memory_mb, 0.0);
}

#[tokio::test]
async fn stats_failure_keeps_status_with_zero_usage() {
    let runtime = Arc::new(FakeRuntime::new().with_container("nginx", "running", None));
    let (collector, cache) = collector(runtime.clone(), Duration::from_secs(10));

    collector.collect_once().await;

    let web = cache.get("nginx").unwrap();
    assert_eq!(web.status, ServiceState::Running);
    assert_eq!(web.cpu_percent, 0.0);
    assert_eq!(web.memory_mb, 0.0);
    assert_eq!(runtime.stats_calls(), 1);
}

#[tokio::test]
async fn stopped_container_skips_stats() {
    let runtime = Arc::new(FakeRuntime::new().with_container("nginx", "exited", None));
    let (collector, cache) = collector(runtime.clone(), Duration::from_secs(10));

    collector.collect_once().await;

    assert_eq!(cache.get("nginx").map(|c| c.status), Some(ServiceState::Stopped));
    assert_eq!(runtime.stats_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn start_runs_immediately_then_on_interval() {
    let runtime = Arc::new(FakeRuntime::new().with_container("nginx", "running", None));
    let (collector, _cache) = collector(runtime.clone(), Duration::from_secs(10));
    let shutdown = CancellationToken::new();

    collector.start(shutdown.clone()).await;
    assert!(collector.is_running());
    assert_eq!(runtime.info_calls(), 2, "first pass runs before start returns");

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(runtime.info_calls(), 4);

    collector.stop();
    assert!(!collector.is_running());
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(runtime.info_calls(), 4, "no passes after stop");
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent_and_stop_can_repeat() {
    let runtime = Arc::new(FakeRuntime::new());
    let (collector, _cache) = collector(runtime.clone(), Duration::from_secs(10));
    let shutdown = CancellationToken::new();

    collector.start(shutdown.clone()).await;
    collector.start(shutdown.clone()).await;
    assert_eq!(runtime.info_calls(), 2, "second start is a no-op");

    collector.stop();
    collector.stop();
    assert!(!collector.is_running());
}

#[tokio::test(start_paused = true)]
async fn shutdown_token_ends_the_loop() {
    let runtime = Arc::new(FakeRuntime::new());
    let (collector, _cache) = collector(runtime.clone(), Duration::from_secs(10));
    let shutdown = CancellationToken::new();

    collector.start(shutdown.clone()).await;
    shutdown.cancel();
    assert!(!collector.is_running());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(runtime.info_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn restart_waits_for_in_flight_pass_to_finish() {
    let runtime = Arc::new(FakeRuntime::new().with_delay(Duration::from_secs(1)));
    let (collector, _cache) = collector(runtime.clone(), Duration::from_secs(10));
    let shutdown = CancellationToken::new();

    // First pass: two containers, one second each.
    collector.start(shutdown.clone()).await;
    assert_eq!(runtime.info_calls(), 2);

    // Next tick fires at 12s; stop half a second into that pass.
    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(runtime.info_calls(), 3);
    collector.stop();
    collector.start(shutdown.clone()).await;

    assert!(collector.is_running());
    assert_eq!(runtime.info_calls(), 6, "old pass finished, then a fresh first pass");
    assert_eq!(runtime.max_in_flight(), 1, "passes never overlap");

    collector.stop();
}
