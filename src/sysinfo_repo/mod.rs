// Host resource usage via sysinfo

use crate::models::{HostCapacityStats, HostCpuStats, HostStats};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use sysinfo::{Disks, System};
use tracing::instrument;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub struct SysinfoRepo {
    sys: Arc<Mutex<System>>,
    disks: Arc<Mutex<Disks>>,
    last_cpu_refresh: Arc<Mutex<Option<(Instant, f64)>>>,
}

impl Default for SysinfoRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoRepo {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();
        Self {
            sys: Arc::new(Mutex::new(sys)),
            disks: Arc::new(Mutex::new(Disks::new_with_refreshed_list())),
            last_cpu_refresh: Arc::new(Mutex::new(None)),
        }
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "get_host_stats"))]
    pub async fn get_host_stats(&self) -> anyhow::Result<HostStats> {
        let sys = self.sys.clone();
        let disks = self.disks.clone();
        let last_cpu_refresh = self.last_cpu_refresh.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;

            // CPU usage needs two refreshes at least MINIMUM_CPU_UPDATE_INTERVAL apart;
            // between those, report the previous reading instead of blocking.
            let now = Instant::now();
            let usage = match last_cpu_refresh.lock() {
                Ok(mut guard) => match *guard {
                    Some((prev_ts, prev_usage))
                        if now.duration_since(prev_ts) < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL =>
                    {
                        prev_usage
                    }
                    Some(_) => {
                        sys.refresh_cpu_all();
                        let usage = f64::from(sys.global_cpu_usage());
                        *guard = Some((now, usage));
                        usage
                    }
                    None => {
                        sys.refresh_cpu_all();
                        *guard = Some((now, 0.0));
                        0.0
                    }
                },
                Err(_) => 0.0,
            };
            sys.refresh_memory();

            let cpu = HostCpuStats {
                usage: usage.clamp(0.0, 100.0),
                cores: System::physical_core_count().unwrap_or(0) as u32,
                threads: sys.cpus().len() as u32,
            };
            let total_mem = sys.total_memory();
            let memory = HostCapacityStats {
                used_gb: total_mem.saturating_sub(sys.available_memory()) as f64 / BYTES_PER_GB,
                total_gb: total_mem as f64 / BYTES_PER_GB,
            };
            drop(sys);

            let mut disks = disks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {}", e))?;
            disks.refresh(true);
            let root = disks
                .list()
                .iter()
                .find(|d| d.mount_point() == Path::new("/"))
                .or_else(|| disks.list().first());
            let storage = root.map_or(
                HostCapacityStats {
                    used_gb: 0.0,
                    total_gb: 0.0,
                },
                |d| HostCapacityStats {
                    used_gb: d.total_space().saturating_sub(d.available_space()) as f64
                        / BYTES_PER_GB,
                    total_gb: d.total_space() as f64 / BYTES_PER_GB,
                },
            );

            Ok(HostStats {
                cpu,
                memory,
                storage,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}
