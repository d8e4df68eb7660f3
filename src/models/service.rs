// Service definitions (static) and service status records (derived per query)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Live status of a service; serializes to upper-case JSON (e.g. "RUNNING").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceState {
    Running,
    Stopped,
    Error,
    Maintenance,
}

impl ServiceState {
    /// Map a Docker container state string (e.g. "running", "exited"). Case-insensitive.
    pub fn from_docker(state: &str) -> Self {
        match state.to_lowercase().as_str() {
            "running" => ServiceState::Running,
            "exited" | "dead" | "created" => ServiceState::Stopped,
            "paused" | "restarting" => ServiceState::Maintenance,
            _ => ServiceState::Error,
        }
    }

    /// Map an Uptime Kuma `monitor_status` value (0 down, 1 up, 2 pending, 3 maintenance).
    pub fn from_kuma(code: i64) -> Self {
        match code {
            1 => ServiceState::Running,
            0 => ServiceState::Stopped,
            3 => ServiceState::Maintenance,
            _ => ServiceState::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Running => "RUNNING",
            ServiceState::Stopped => "STOPPED",
            ServiceState::Error => "ERROR",
            ServiceState::Maintenance => "MAINTENANCE",
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a service's live status comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Docker { container_name: String },
    UptimeKuma { monitor_id: u64 },
    /// Kind string that no resolver understands; always reports ERROR.
    Unknown(String),
}

/// A service to monitor, as declared in the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub name: String,
    pub backend: Backend,
    pub url: Option<String>,
    pub port: Option<u16>,
    pub configs: Vec<PathBuf>,
}

impl ServiceDefinition {
    /// Container name when this service is docker-backed.
    pub fn container_name(&self) -> Option<&str> {
        match &self.backend {
            Backend::Docker { container_name } => Some(container_name),
            _ => None,
        }
    }
}

/// Config file type, derived from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfigType {
    Yaml,
    Json,
    Ini,
    Dockerfile,
}

/// Reference to one of a service's config files (content loaded separately).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFileRef {
    #[serde(rename = "type")]
    pub config_type: ConfigType,
    pub path: String,
    pub last_edited: String,
}

/// A config file with its content, returned by the config viewer lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigContent {
    #[serde(rename = "type")]
    pub config_type: ConfigType,
    pub path: String,
    pub content: String,
    pub last_edited: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub id: String,
    pub name: String,
    pub status: ServiceState,
    /// Unset travels as `0` on the wire.
    #[serde(default, with = "port_or_zero")]
    pub port: Option<u16>,
    /// Unset travels as `""` on the wire.
    #[serde(default, with = "url_or_empty")]
    pub url: Option<String>,
    /// Peers send `null` for a service without config files.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub configs: Vec<ConfigFileRef>,
    #[serde(default)]
    pub uptime: String,
    /// Percent of one host's total CPU capacity.
    #[serde(default)]
    pub cpu_usage: f64,
    /// Resident memory in MB.
    #[serde(default)]
    pub memory_usage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

mod port_or_zero {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(port: &Option<u16>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u16(port.unwrap_or(0))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u16>, D::Error> {
        Ok(Option::<u16>::deserialize(d)?.filter(|p| *p != 0))
    }
}

mod url_or_empty {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(url: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(url.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<String>::deserialize(d)?.filter(|u| !u.is_empty()))
    }
}

fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}
