// HTTP client for a peer instance's /federation/services endpoint

use crate::models::{FederationResponse, PeerDescriptor};
use crate::version::USER_AGENT;
use reqwest::{Client, StatusCode, header};
use std::time::Duration;
use tracing::{debug, info, instrument};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("federation request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("remote host returned status {0}")]
    HttpStatus(StatusCode),
    #[error("failed to decode federation response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Builds the shared HTTP client used for every peer fetch.
pub fn http_client() -> reqwest::Result<Client> {
    Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
}

#[derive(Clone)]
pub struct PeerClient {
    name: String,
    url: String,
    token: String,
    http: Client,
}

impl PeerClient {
    pub fn new(peer: &PeerDescriptor, http: Client) -> Self {
        Self {
            name: peer.name.clone(),
            url: format!(
                "{}/federation/services",
                peer.endpoint.trim_end_matches('/')
            ),
            token: peer.token.clone(),
            http,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(peer = %self.name, operation = "fetch"))]
    pub async fn fetch(&self) -> Result<FederationResponse, PeerError> {
        debug!(url = %self.url, "Fetching services from remote host");
        let resp = self
            .http
            .get(&self.url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(PeerError::Transport)?;

        if resp.status() != StatusCode::OK {
            return Err(PeerError::HttpStatus(resp.status()));
        }
        let body: FederationResponse = resp.json().await.map_err(|e| {
            if e.is_decode() {
                PeerError::Decode(e)
            } else {
                PeerError::Transport(e)
            }
        })?;

        info!(count = body.services.len(), "Fetched services from remote host");
        Ok(body)
    }
}
