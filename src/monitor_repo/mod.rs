// Uptime Kuma monitor status via its Prometheus /metrics endpoint

mod metrics;

use crate::models::ServiceState;
use crate::version::USER_AGENT;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("monitor {0} not found in metrics")]
    NotFound(u64),
    #[error("metrics request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("uptime kuma returned status {0}")]
    HttpStatus(StatusCode),
    #[error("failed to read metrics: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorStatus {
    pub id: u64,
    pub name: String,
    pub status: ServiceState,
    /// Last response time in ms (0 when the feed has none).
    pub latency_ms: f64,
}

/// Something that can report the state of one external monitor.
#[async_trait]
pub trait MonitorSource: Send + Sync {
    async fn get_status(&self, monitor_id: u64) -> Result<MonitorStatus, MonitorError>;
}

/// Connection settings for an Uptime Kuma instance.
#[derive(Debug, Clone, Default)]
pub struct MonitorCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
}

pub struct MonitorRepo {
    metrics_url: String,
    credentials: MonitorCredentials,
    http: Client,
}

impl MonitorRepo {
    pub fn new(base_url: &str, credentials: MonitorCredentials) -> Result<Self, MonitorError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            metrics_url: format!("{}/metrics", base_url.trim_end_matches('/')),
            credentials,
            http,
        })
    }

    /// API key wins over username/password; blank values count as unset.
    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        fn set(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }
        let c = &self.credentials;
        if let Some(key) = set(&c.api_key) {
            req.basic_auth("", Some(key))
        } else if let (Some(user), Some(pass)) = (set(&c.username), set(&c.password)) {
            req.basic_auth(user, Some(pass))
        } else {
            req
        }
    }

    async fn fetch_metrics(&self) -> Result<String, MonitorError> {
        let resp = self.authorize(self.http.get(&self.metrics_url)).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(MonitorError::HttpStatus(resp.status()));
        }
        let body = resp.bytes().await?;
        String::from_utf8(body.to_vec())
            .map_err(|e| MonitorError::Parse(format!("metrics body is not UTF-8: {e}")))
    }

    /// Reachability check: the metrics endpoint answers 200 with our credentials.
    #[instrument(skip(self), fields(repo = "uptime_kuma", operation = "ping"))]
    pub async fn ping(&self) -> Result<(), MonitorError> {
        let resp = self.authorize(self.http.get(&self.metrics_url)).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(MonitorError::HttpStatus(resp.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl MonitorSource for MonitorRepo {
    #[instrument(skip(self), fields(repo = "uptime_kuma", operation = "get_status"))]
    async fn get_status(&self, monitor_id: u64) -> Result<MonitorStatus, MonitorError> {
        let body = self.fetch_metrics().await.inspect_err(|e| {
            warn!(monitor_id, error = %e, "Failed to fetch Kuma metrics");
        })?;

        let Some(sample) = metrics::parse_monitor(&body, monitor_id) else {
            return Err(MonitorError::NotFound(monitor_id));
        };
        // A monitor without a status sample maps like an unknown code.
        let status = ServiceState::from_kuma(sample.status_code.unwrap_or(-1));
        debug!(monitor_id, status = %status, "Retrieved monitor status from Kuma");

        Ok(MonitorStatus {
            id: monitor_id,
            name: sample.name.unwrap_or_default(),
            status,
            latency_ms: sample.latency_ms.unwrap_or(0.0),
        })
    }
}
