// Builds live ServiceStatus records from the configured service definitions.
// Docker services read through the poller's cache with a live fallback;
// Uptime Kuma services are always queried live.

use crate::cache::TtlCache;
use crate::collector::{CachedStats, probe_container};
use crate::docker_repo::ContainerRuntime;
use crate::federation::LocalServices;
use crate::models::{
    Backend, ConfigContent, ConfigFileRef, ConfigType, ServiceDefinition, ServiceState,
    ServiceStatus,
};
use crate::monitor_repo::MonitorSource;
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use futures_util::future::join_all;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Hex characters kept from the name hash.
const ID_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("service not found: {0}")]
    NotFound(String),
    #[error("config index {index} out of range (service has {len} config files)")]
    OutOfRange { index: usize, len: usize },
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct StatusResolver {
    definitions: Vec<ServiceDefinition>,
    ids: Vec<String>,
    /// `None` when Docker was unreachable at startup: docker services then always report ERROR.
    runtime: Option<Arc<dyn ContainerRuntime>>,
    monitor: Option<Arc<dyn MonitorSource>>,
    cache: Arc<TtlCache<CachedStats>>,
}

impl StatusResolver {
    pub fn new(
        definitions: Vec<ServiceDefinition>,
        runtime: Option<Arc<dyn ContainerRuntime>>,
        monitor: Option<Arc<dyn MonitorSource>>,
        cache: Arc<TtlCache<CachedStats>>,
    ) -> Self {
        let ids: Vec<String> = definitions.iter().map(|d| service_id(&d.name)).collect();

        // Colliding ids are kept; lookups by id resolve to the first definition.
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for (id, def) in ids.iter().zip(&definitions) {
            if let Some(first) = seen.insert(id, &def.name) {
                warn!(id = %id, first = %first, second = %def.name, "service id collision");
            }
        }

        Self {
            definitions,
            ids,
            runtime,
            monitor,
            cache,
        }
    }

    pub fn definitions(&self) -> &[ServiceDefinition] {
        &self.definitions
    }

    /// Every configured service, in declaration order.
    pub async fn get_all(&self) -> Vec<ServiceStatus> {
        join_all(
            self.definitions
                .iter()
                .zip(&self.ids)
                .map(|(def, id)| self.build_status(def, id)),
        )
        .await
    }

    #[instrument(skip(self), fields(operation = "get_by_id"))]
    pub async fn get_by_id(&self, id: &str) -> Result<ServiceStatus, ResolveError> {
        let (def, id) = self.find(id)?;
        Ok(self.build_status(def, id).await)
    }

    /// Reads the `index`-th config file of the service.
    #[instrument(skip(self), fields(operation = "get_config_content"))]
    pub async fn get_config_content(
        &self,
        id: &str,
        index: usize,
    ) -> Result<ConfigContent, ResolveError> {
        let (def, _) = self.find(id)?;
        let path = def.configs.get(index).ok_or(ResolveError::OutOfRange {
            index,
            len: def.configs.len(),
        })?;
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ResolveError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(ConfigContent {
            config_type: detect_config_type(path),
            path: path.display().to_string(),
            content,
            last_edited: file_mod_time(path).await,
        })
    }

    fn find(&self, id: &str) -> Result<(&ServiceDefinition, &str), ResolveError> {
        self.definitions
            .iter()
            .zip(&self.ids)
            .find(|(_, def_id)| def_id.as_str() == id)
            .map(|(def, def_id)| (def, def_id.as_str()))
            .ok_or_else(|| ResolveError::NotFound(id.to_string()))
    }

    async fn build_status(&self, def: &ServiceDefinition, id: &str) -> ServiceStatus {
        let mut configs = Vec::with_capacity(def.configs.len());
        for path in &def.configs {
            configs.push(ConfigFileRef {
                config_type: detect_config_type(path),
                path: path.display().to_string(),
                last_edited: file_mod_time(path).await,
            });
        }

        let mut svc = ServiceStatus {
            id: id.to_string(),
            name: def.name.clone(),
            status: ServiceState::Error,
            port: def.port,
            url: def.url.clone(),
            configs,
            uptime: String::new(),
            cpu_usage: 0.0,
            memory_usage: 0.0,
            host: None,
        };

        match &def.backend {
            Backend::Docker { container_name } => {
                if let Some(stats) = self.docker_stats(container_name).await {
                    svc.status = stats.status;
                    svc.uptime = format_uptime(stats.started_at);
                    svc.cpu_usage = stats.cpu_percent;
                    svc.memory_usage = stats.memory_mb;
                }
            }
            Backend::UptimeKuma { monitor_id } => {
                if let Some(monitor) = &self.monitor {
                    match monitor.get_status(*monitor_id).await {
                        Ok(m) => svc.status = m.status,
                        Err(e) => {
                            debug!(service = %def.name, monitor_id, error = %e, "monitor lookup failed");
                        }
                    }
                }
            }
            Backend::Unknown(kind) => {
                debug!(service = %def.name, backend = %kind, "unknown backend");
            }
        }
        svc
    }

    /// Cached stats when fresh, else a live probe that refreshes the cache.
    async fn docker_stats(&self, container_name: &str) -> Option<CachedStats> {
        let runtime = self.runtime.as_ref()?;
        if let Some(cached) = self.cache.get(container_name) {
            return Some(cached);
        }
        let live = probe_container(runtime.as_ref(), container_name).await;
        self.cache.set(container_name, live.clone());
        Some(live)
    }
}

#[async_trait]
impl LocalServices for StatusResolver {
    async fn get_all(&self) -> Vec<ServiceStatus> {
        StatusResolver::get_all(self).await
    }
}

/// Stable id for a service name: first 12 hex chars of its SHA-256.
/// Distinct names can collide in principle; collisions are logged, not rejected.
pub fn service_id(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(ID_LEN);
    id
}

/// Classify a config file by extension (or a "dockerfile" file name). Defaults to YAML.
pub fn detect_config_type(path: &Path) -> ConfigType {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "yaml" | "yml" => ConfigType::Yaml,
        "json" => ConfigType::Json,
        "ini" | "conf" | "cfg" => ConfigType::Ini,
        "dockerfile" => ConfigType::Dockerfile,
        _ => {
            let base = path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if base.contains("dockerfile") {
                ConfigType::Dockerfile
            } else {
                ConfigType::Yaml
            }
        }
    }
}

/// Human-readable time since `started_at`; "Unknown" when unset.
pub fn format_uptime(started_at: Option<DateTime<Utc>>) -> String {
    format_uptime_at(started_at, Utc::now())
}

pub fn format_uptime_at(started_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(started_at) = started_at else {
        return "Unknown".to_string();
    };
    let elapsed = (now - started_at).max(chrono::TimeDelta::zero());
    let days = elapsed.num_days();
    let hours = elapsed.num_hours() % 24;
    let minutes = elapsed.num_minutes() % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

async fn file_mod_time(path: &Path) -> String {
    match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(t) => DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => "Unknown".to_string(),
    }
}
