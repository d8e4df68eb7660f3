// Host resource usage models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostStats {
    pub cpu: HostCpuStats,
    pub memory: HostCapacityStats,
    pub storage: HostCapacityStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostCpuStats {
    pub usage: f64,
    pub cores: u32,
    pub threads: u32,
}

/// Used/total pair in GB (memory or root filesystem).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostCapacityStats {
    #[serde(rename = "usedGB")]
    pub used_gb: f64,
    #[serde(rename = "totalGB")]
    pub total_gb: f64,
}
