// Shared test helpers: in-memory backends and a throwaway HTTP server

#![allow(dead_code)]

use async_trait::async_trait;
use homerun::docker_repo::{ContainerInfo, ContainerRuntime, ContainerUsage, RuntimeError};
use homerun::models::{Backend, ServiceDefinition, ServiceState, ServiceStatus};
use homerun::monitor_repo::{MonitorError, MonitorSource, MonitorStatus};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Container runtime backed by a map. Unknown names fail with NotFound,
/// containers without usage data fail get_stats.
#[derive(Default)]
pub struct FakeRuntime {
    containers: Mutex<HashMap<String, ContainerInfo>>,
    usage: Mutex<HashMap<String, ContainerUsage>>,
    info_calls: AtomicUsize,
    stats_calls: AtomicUsize,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(self, name: &str, state: &str, usage: Option<ContainerUsage>) -> Self {
        self.put_container(name, state, usage);
        self
    }

    pub fn put_container(&self, name: &str, state: &str, usage: Option<ContainerUsage>) {
        let short_id = format!("id-{name}");
        let info = ContainerInfo {
            short_id: short_id.clone(),
            status: ServiceState::from_docker(state),
            state: state.to_string(),
            started_at: Some(chrono::Utc::now() - chrono::TimeDelta::minutes(90)),
        };
        self.containers.lock().unwrap().insert(name.to_string(), info);
        let mut all_usage = self.usage.lock().unwrap();
        match usage {
            Some(u) => {
                all_usage.insert(short_id, u);
            }
            None => {
                all_usage.remove(&short_id);
            }
        }
    }

    /// Every get_info call sleeps `delay` (tokio clock) before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Highest number of get_info calls seen running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn remove_container(&self, name: &str) {
        self.containers.lock().unwrap().remove(name);
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn stats_calls(&self) -> usize {
        self.stats_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn get_info(&self, container_name: &str) -> Result<ContainerInfo, RuntimeError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.containers
            .lock()
            .unwrap()
            .get(container_name)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(container_name.to_string()))
    }

    async fn get_stats(&self, container_id: &str) -> Result<ContainerUsage, RuntimeError> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        self.usage
            .lock()
            .unwrap()
            .get(container_id)
            .copied()
            .ok_or(RuntimeError::EmptyStats)
    }
}

/// Monitor source backed by a map of monitor id to state.
#[derive(Default)]
pub struct FakeMonitor {
    monitors: HashMap<u64, ServiceState>,
    calls: AtomicUsize,
}

impl FakeMonitor {
    pub fn new(monitors: &[(u64, ServiceState)]) -> Self {
        Self {
            monitors: monitors.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MonitorSource for FakeMonitor {
    async fn get_status(&self, monitor_id: u64) -> Result<MonitorStatus, MonitorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let status = self
            .monitors
            .get(&monitor_id)
            .copied()
            .ok_or(MonitorError::NotFound(monitor_id))?;
        Ok(MonitorStatus {
            id: monitor_id,
            name: format!("monitor {monitor_id}"),
            status,
            latency_ms: 12.0,
        })
    }
}

pub fn docker_service(name: &str, container_name: &str) -> ServiceDefinition {
    ServiceDefinition {
        name: name.to_string(),
        backend: Backend::Docker {
            container_name: container_name.to_string(),
        },
        url: Some(format!("https://{name}.home.lan")),
        port: Some(8080),
        configs: vec![],
    }
}

pub fn kuma_service(name: &str, monitor_id: u64) -> ServiceDefinition {
    ServiceDefinition {
        name: name.to_string(),
        backend: Backend::UptimeKuma { monitor_id },
        url: None,
        port: None,
        configs: vec![],
    }
}

/// Serves `router` on an ephemeral localhost port; returns its base URL.
pub async fn spawn_http(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Bare status record, as a peer would report it.
pub fn status(id: &str, name: &str, state: ServiceState) -> ServiceStatus {
    ServiceStatus {
        id: id.to_string(),
        name: name.to_string(),
        status: state,
        port: None,
        url: None,
        configs: vec![],
        uptime: "5m".to_string(),
        cpu_usage: 0.0,
        memory_usage: 0.0,
        host: None,
    }
}
