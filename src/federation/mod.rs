// Merges this host's services with the ones reported by peer instances.

mod client;

pub use client::{FETCH_TIMEOUT, PeerClient, PeerError, http_client};

use crate::models::{PeerDescriptor, ServiceStatus};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Host tag for services resolved on this instance.
pub const LOCAL_HOST: &str = "local";

/// Source of this instance's own service list.
#[async_trait]
pub trait LocalServices: Send + Sync {
    async fn get_all(&self) -> Vec<ServiceStatus>;
}

pub struct Aggregator {
    local: Arc<dyn LocalServices>,
    peers: Vec<PeerClient>,
}

impl Aggregator {
    pub fn new(local: Arc<dyn LocalServices>, peers: &[PeerDescriptor]) -> reqwest::Result<Self> {
        let http = http_client()?;
        let peers = peers
            .iter()
            .map(|p| PeerClient::new(p, http.clone()))
            .collect();
        Ok(Self { local, peers })
    }

    /// Local services plus every reachable peer's services. Peer ids are
    /// prefixed with `<peer>-`; a failing peer is logged and left out.
    pub async fn get_all_services(&self) -> Vec<ServiceStatus> {
        let mut result = self.get_local_services().await;
        if self.peers.is_empty() {
            return result;
        }

        let mut tasks = JoinSet::new();
        for peer in &self.peers {
            let peer = peer.clone();
            tasks.spawn(async move {
                let outcome = peer.fetch().await;
                (peer, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((peer, Ok(resp))) => {
                    let name = peer.name();
                    result.extend(resp.services.into_iter().map(|mut svc| {
                        svc.id = format!("{name}-{}", svc.id);
                        svc.host = Some(name.to_string());
                        svc
                    }));
                }
                Ok((peer, Err(e))) => {
                    warn!(peer = %peer.name(), error = %e, "Failed to fetch services from peer");
                }
                Err(e) => {
                    warn!(error = %e, "peer fetch task failed");
                }
            }
        }
        debug!(total = result.len(), peers = self.peers.len(), "Aggregated services");
        result
    }

    /// This instance's services only, as served to peers. Never calls out to peers.
    pub async fn get_local_services(&self) -> Vec<ServiceStatus> {
        let mut services = self.local.get_all().await;
        for svc in &mut services {
            svc.host = Some(LOCAL_HOST.to_string());
        }
        services
    }
}
