// Domain models

mod federation;
mod host;
mod service;

pub use federation::{FederationResponse, PeerDescriptor};
pub use host::{HostCapacityStats, HostCpuStats, HostStats};
pub use service::{
    Backend, ConfigContent, ConfigFileRef, ConfigType, ServiceDefinition, ServiceState,
    ServiceStatus,
};
