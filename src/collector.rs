// Background container poller: refreshes per-container stats into the shared TTL cache.
// One immediate pass on start, then one pass per interval until cancelled or stopped.

use crate::cache::TtlCache;
use crate::docker_repo::ContainerRuntime;
use crate::models::{ServiceDefinition, ServiceState};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// What the poller last saw for one container. Keyed by container name in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedStats {
    pub status: ServiceState,
    pub started_at: Option<DateTime<Utc>>,
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub last_update: DateTime<Utc>,
}

impl CachedStats {
    fn error() -> Self {
        Self {
            status: ServiceState::Error,
            started_at: None,
            cpu_percent: 0.0,
            memory_mb: 0.0,
            last_update: Utc::now(),
        }
    }
}

/// One inspect (+ stats when running) round against the runtime. Failures become
/// an ERROR record; a stats failure keeps the status with zero usage.
pub async fn probe_container(runtime: &dyn ContainerRuntime, container_name: &str) -> CachedStats {
    let info = match runtime.get_info(container_name).await {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!(container = %container_name, error = %e, "Failed to get container info");
            return CachedStats::error();
        }
    };

    let mut cached = CachedStats {
        status: info.status,
        started_at: info.started_at,
        cpu_percent: 0.0,
        memory_mb: 0.0,
        last_update: Utc::now(),
    };
    if info.status == ServiceState::Running {
        match runtime.get_stats(&info.short_id).await {
            Ok(usage) => {
                cached.cpu_percent = usage.cpu_percent;
                cached.memory_mb = usage.memory_mb;
            }
            Err(e) => {
                tracing::warn!(container = %container_name, error = %e, "Failed to get container stats");
            }
        }
    }
    cached
}

/// Handle on the active poll loop.
struct LoopHandle {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

pub struct StatusCollector {
    runtime: Arc<dyn ContainerRuntime>,
    cache: Arc<TtlCache<CachedStats>>,
    containers: Vec<String>,
    interval: Duration,
    /// Kept after stop so the next start can wait for the old loop to drain.
    running: Mutex<Option<LoopHandle>>,
}

impl StatusCollector {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        cache: Arc<TtlCache<CachedStats>>,
        definitions: &[ServiceDefinition],
        interval: Duration,
    ) -> Self {
        let containers = definitions
            .iter()
            .filter_map(ServiceDefinition::container_name)
            .map(str::to_string)
            .collect();
        Self {
            runtime,
            cache,
            containers,
            interval,
            running: Mutex::new(None),
        }
    }

    /// Runs one pass, then keeps polling every interval until `shutdown` fires or
    /// [`stop`](Self::stop) is called. No-op while a loop is already active. A
    /// stopped loop still finishing its pass is awaited before the new one spawns.
    pub async fn start(self: &Arc<Self>, shutdown: CancellationToken) {
        let previous = {
            let mut running = self.lock_running();
            if running.as_ref().is_some_and(LoopHandle::is_active) {
                return;
            }
            running.take()
        };
        if let Some(previous) = previous {
            previous.stop.cancel();
            if let Err(e) = previous.task.await {
                tracing::warn!(error = %e, "previous collector loop failed");
            }
        }

        let (first_pass_tx, first_pass_rx) = oneshot::channel();
        {
            let mut running = self.lock_running();
            // Another start won the race while we waited.
            if running.is_some() {
                return;
            }
            let stop = shutdown.child_token();
            let span = tracing::debug_span!("collector", interval_secs = self.interval.as_secs());
            let task = tokio::spawn(
                Arc::clone(self)
                    .run(stop.clone(), first_pass_tx)
                    .instrument(span),
            );
            *running = Some(LoopHandle { stop, task });
        }
        tracing::info!(containers = self.containers.len(), "Collector started");
        let _ = first_pass_rx.await;
    }

    async fn run(self: Arc<Self>, stop: CancellationToken, first_pass: oneshot::Sender<()>) {
        self.collect_once().await;
        let _ = first_pass.send(());

        let mut tick = interval_at(Instant::now() + self.interval, self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = tick.tick() => self.collect_once().await,
                _ = stop.cancelled() => {
                    tracing::debug!("Collector shutting down");
                    break;
                }
            }
        }
    }

    /// Cancels the poll loop. Safe to call any number of times. A pass already in
    /// progress runs to completion.
    pub fn stop(&self) {
        if let Some(handle) = self.lock_running().as_ref()
            && handle.is_active()
        {
            handle.stop.cancel();
            tracing::info!("Collector stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_running()
            .as_ref()
            .is_some_and(LoopHandle::is_active)
    }

    fn lock_running(&self) -> std::sync::MutexGuard<'_, Option<LoopHandle>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One full pass over every docker-backed service. Each visited entry is replaced.
    pub async fn collect_once(&self) {
        let started = Instant::now();
        let mut errors = 0usize;
        for name in &self.containers {
            let cached = probe_container(self.runtime.as_ref(), name).await;
            if cached.status == ServiceState::Error {
                errors += 1;
            }
            self.cache.set(name.clone(), cached);
        }
        tracing::debug!(
            operation = "collect",
            containers = self.containers.len(),
            errors,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Collection pass complete"
        );
    }
}

impl LoopHandle {
    fn is_active(&self) -> bool {
        !self.stop.is_cancelled() && !self.task.is_finished()
    }
}
