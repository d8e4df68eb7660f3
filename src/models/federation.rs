// Peer descriptors and the federation wire format

use serde::{Deserialize, Serialize};

use super::ServiceStatus;

/// A remote instance whose local services are merged into the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PeerDescriptor {
    pub name: String,
    pub endpoint: String,
    pub token: String,
}

/// Body of `GET /federation/services`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederationResponse {
    pub services: Vec<ServiceStatus>,
    pub host: String,
}
