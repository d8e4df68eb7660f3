use anyhow::Result;
use homerun::cache::TtlCache;
use homerun::collector::{CachedStats, StatusCollector};
use homerun::docker_repo::{ContainerRuntime, DockerRepo};
use homerun::federation::Aggregator;
use homerun::monitor_repo::{MonitorRepo, MonitorSource};
use homerun::resolver::StatusResolver;
use homerun::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let definitions = app_config.service_definitions();
    let shutdown = CancellationToken::new();

    let cache: Arc<TtlCache<CachedStats>> = Arc::new(TtlCache::new(Duration::from_secs(
        app_config.monitoring.cache_ttl_secs,
    )));
    let sweeper = cache.spawn_sweeper(shutdown.clone());

    // Docker is optional: without it, docker-backed services report ERROR.
    let runtime: Option<Arc<dyn ContainerRuntime>> = match DockerRepo::connect().await {
        Ok(repo) => {
            tracing::info!("Docker client initialized");
            Some(Arc::new(repo))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Docker unavailable; docker backend disabled");
            None
        }
    };

    let monitor: Option<Arc<dyn MonitorSource>> = match &app_config.uptime_kuma {
        Some(kuma) => {
            let repo = MonitorRepo::new(&kuma.url, kuma.credentials())?;
            if let Err(e) = repo.ping().await {
                tracing::warn!(url = %kuma.url, error = %e, "Uptime Kuma not reachable at startup");
            }
            Some(Arc::new(repo))
        }
        None => None,
    };

    let collector = runtime.clone().map(|rt| {
        Arc::new(StatusCollector::new(
            rt,
            cache.clone(),
            &definitions,
            Duration::from_secs(app_config.monitoring.poll_interval_secs),
        ))
    });
    if let Some(collector) = &collector {
        collector.start(shutdown.clone()).await;
    }

    let resolver = Arc::new(StatusResolver::new(definitions, runtime, monitor, cache));
    let aggregator = Arc::new(Aggregator::new(
        resolver.clone(),
        &app_config.remote_hosts,
    )?);
    let sysinfo_repo = Arc::new(sysinfo_repo::SysinfoRepo::new());

    let app = routes::app(resolver.clone(), aggregator, sysinfo_repo, &app_config);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        services = resolver.definitions().len(),
        remote_hosts = app_config.remote_hosts.len(),
        "Listening on http://{}",
        addr
    );

    let signal_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Received shutdown signal");
            signal_token.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(collector) = &collector {
        collector.stop();
    }
    let _ = sweeper.await;
    tracing::info!("Server exited");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
