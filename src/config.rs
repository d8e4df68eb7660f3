use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::models::{Backend, PeerDescriptor, ServiceDefinition};
use crate::monitor_repo::MonitorCredentials;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    pub uptime_kuma: Option<UptimeKumaConfig>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub remote_hosts: Vec<PeerDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_cors_allow_origin")]
    pub cors_allow_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_allow_origin: default_cors_allow_origin(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_cors_allow_origin() -> String {
    "*".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Bearer token peers must present on /federation/services.
    pub api_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often the background poller refreshes container stats.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// How long a polled container entry stays valid in the cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct UptimeKumaConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
}

impl UptimeKumaConfig {
    pub fn credentials(&self) -> MonitorCredentials {
        MonitorCredentials {
            username: self.username.clone(),
            password: self.password.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

/// One `[[services]]` entry as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    /// "docker" or "uptime_kuma".
    pub backend: String,
    pub container_name: Option<String>,
    pub monitor_id: Option<u64>,
    pub url: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub configs: Vec<PathBuf>,
}

impl ServiceConfig {
    pub fn to_definition(&self) -> ServiceDefinition {
        let backend = match (self.backend.as_str(), &self.container_name, self.monitor_id) {
            ("docker", Some(container_name), _) => Backend::Docker {
                container_name: container_name.clone(),
            },
            ("uptime_kuma", _, Some(monitor_id)) => Backend::UptimeKuma { monitor_id },
            (kind, _, _) => Backend::Unknown(kind.to_string()),
        };
        ServiceDefinition {
            name: self.name.clone(),
            backend,
            url: self.url.clone(),
            port: self.port,
            configs: self.configs.clone(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn service_definitions(&self) -> Vec<ServiceDefinition> {
        self.services.iter().map(ServiceConfig::to_definition).collect()
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.auth.api_token.is_empty(),
            "auth.api_token is required for federation"
        );
        anyhow::ensure!(
            self.monitoring.poll_interval_secs > 0,
            "monitoring.poll_interval_secs must be > 0, got {}",
            self.monitoring.poll_interval_secs
        );
        anyhow::ensure!(
            self.monitoring.cache_ttl_secs > 0,
            "monitoring.cache_ttl_secs must be > 0, got {}",
            self.monitoring.cache_ttl_secs
        );
        if let Some(kuma) = &self.uptime_kuma {
            anyhow::ensure!(
                !kuma.url.is_empty(),
                "uptime_kuma.url is required when uptime_kuma is configured"
            );
        }

        for (i, svc) in self.services.iter().enumerate() {
            anyhow::ensure!(!svc.name.is_empty(), "services[{}].name is required", i);
            match svc.backend.as_str() {
                "docker" => anyhow::ensure!(
                    svc.container_name.as_deref().is_some_and(|n| !n.is_empty()),
                    "services[{}].container_name is required for docker backend",
                    i
                ),
                "uptime_kuma" => {
                    anyhow::ensure!(
                        self.uptime_kuma.is_some(),
                        "services[{}] uses uptime_kuma backend but uptime_kuma config is missing",
                        i
                    );
                    anyhow::ensure!(
                        svc.monitor_id.is_some_and(|id| id > 0),
                        "services[{}].monitor_id is required for uptime_kuma backend",
                        i
                    );
                }
                other => anyhow::bail!(
                    "services[{}].backend must be 'docker' or 'uptime_kuma', got '{}'",
                    i,
                    other
                ),
            }
        }

        let mut peer_names = HashSet::new();
        for (i, host) in self.remote_hosts.iter().enumerate() {
            anyhow::ensure!(!host.name.is_empty(), "remote_hosts[{}].name is required", i);
            anyhow::ensure!(
                !host.endpoint.is_empty(),
                "remote_hosts[{}].endpoint is required",
                i
            );
            anyhow::ensure!(!host.token.is_empty(), "remote_hosts[{}].token is required", i);
            anyhow::ensure!(
                peer_names.insert(host.name.as_str()),
                "remote_hosts[{}].name '{}' is used more than once",
                i,
                host.name
            );
        }
        Ok(())
    }
}
