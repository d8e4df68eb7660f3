// Docker container status and usage via bollard

mod stats;

use crate::models::ServiceState;
use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{InspectContainerOptions, ListContainersOptions, StatsOptions};
use bollard::models::ContainerSummary;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const PING_TIMEOUT: Duration = Duration::from_secs(5);
const SHORT_ID_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("container '{0}' not found")]
    NotFound(String),
    #[error("docker request failed: {0}")]
    Transport(#[from] bollard::errors::Error),
    #[error("docker stats stream ended without a sample")]
    EmptyStats,
    #[error("docker daemon unavailable: {0}")]
    Unavailable(String),
}

/// State of one container, as needed for a status record.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerInfo {
    pub short_id: String,
    pub status: ServiceState,
    /// Raw Docker state ("running", "exited", ...).
    pub state: String,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerUsage {
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

/// Query surface of a container engine, one container at a time.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn get_info(&self, container_name: &str) -> Result<ContainerInfo, RuntimeError>;
    async fn get_stats(&self, container_id: &str) -> Result<ContainerUsage, RuntimeError>;
}

pub struct DockerRepo {
    docker: Docker,
}

impl DockerRepo {
    /// Connects with local defaults (`DOCKER_HOST` or the unix socket) and pings the daemon.
    pub async fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))?;
        match tokio::time::timeout(PING_TIMEOUT, docker.ping()).await {
            Ok(Ok(_)) => Ok(Self { docker }),
            Ok(Err(e)) => Err(RuntimeError::Unavailable(e.to_string())),
            Err(_) => Err(RuntimeError::Unavailable(format!(
                "ping timed out after {}s",
                PING_TIMEOUT.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRepo {
    #[instrument(skip(self), fields(repo = "docker", operation = "get_info"))]
    async fn get_info(&self, container_name: &str) -> Result<ContainerInfo, RuntimeError> {
        let options = ListContainersOptions {
            all: true,
            ..Default::default()
        };
        let containers = self.docker.list_containers(Some(options)).await?;

        let Some(container) = find_container(&containers, container_name) else {
            warn!(container = %container_name, "Container not found");
            return Err(RuntimeError::NotFound(container_name.to_string()));
        };
        let id = container.id.clone().unwrap_or_default();
        let state = container
            .state
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        // Uptime needs the inspect call; a failure there only loses the start time.
        let started_at = match self
            .docker
            .inspect_container(&id, None::<InspectContainerOptions>)
            .await
        {
            Ok(inspect) => inspect
                .state
                .and_then(|s| s.started_at)
                .as_deref()
                .and_then(parse_started_at),
            Err(e) => {
                debug!(container = %container_name, error = %e, "inspect failed");
                None
            }
        };

        let info = ContainerInfo {
            short_id: id.chars().take(SHORT_ID_LEN).collect(),
            status: ServiceState::from_docker(&state),
            state,
            started_at,
        };
        debug!(container = %container_name, id = %info.short_id, status = %info.status, "Retrieved container info");
        Ok(info)
    }

    #[instrument(skip(self), fields(repo = "docker", operation = "get_stats"))]
    async fn get_stats(&self, container_id: &str) -> Result<ContainerUsage, RuntimeError> {
        let options = StatsOptions {
            stream: false,
            ..Default::default()
        };
        let mut stream = self.docker.stats(container_id, Some(options));
        match stream.next().await {
            Some(Ok(s)) => Ok(stats::process_statistics(&s)),
            Some(Err(e)) => Err(e.into()),
            None => Err(RuntimeError::EmptyStats),
        }
    }
}

/// Docker reports names with a leading `/`; accept the configured name either way.
pub(crate) fn find_container<'a>(
    containers: &'a [ContainerSummary],
    name: &str,
) -> Option<&'a ContainerSummary> {
    let wanted = name.trim_start_matches('/');
    containers.iter().find(|c| {
        c.names
            .as_ref()
            .is_some_and(|names| names.iter().any(|n| n.trim_start_matches('/') == wanted))
    })
}

/// Parse Docker's RFC 3339 `StartedAt`. Docker's zero time ("0001-01-01T00:00:00Z") means never started.
pub(crate) fn parse_started_at(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
        .filter(|t| t.timestamp() > 0)
}
