// Turn a raw Docker stats API response into CPU% and memory MB.

use super::ContainerUsage;
use bollard::models::ContainerStatsResponse;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Process a one-shot Docker stats response. Missing sections count as zero.
pub(crate) fn process_statistics(s: &ContainerStatsResponse) -> ContainerUsage {
    ContainerUsage {
        cpu_percent: cpu_percent(s),
        memory_mb: s.memory_stats.as_ref().and_then(|m| m.usage).unwrap_or(0) as f64
            / BYTES_PER_MB,
    }
}

fn cpu_percent(s: &ContainerStatsResponse) -> f64 {
    let (Some(cpu_stats), Some(precpu_stats)) = (s.cpu_stats.as_ref(), s.precpu_stats.as_ref())
    else {
        return 0.0;
    };
    let total = |u: Option<&bollard::models::ContainerCpuUsage>| {
        u.and_then(|u| u.total_usage).unwrap_or(0) as f64
    };

    let cpu_delta = total(cpu_stats.cpu_usage.as_ref()) - total(precpu_stats.cpu_usage.as_ref());
    let system_delta = cpu_stats.system_cpu_usage.unwrap_or(0) as f64
        - precpu_stats.system_cpu_usage.unwrap_or(0) as f64;
    if system_delta <= 0.0 || cpu_delta <= 0.0 {
        return 0.0;
    }

    // Older engines omit online_cpus; count the per-core samples instead.
    let online = match cpu_stats.online_cpus {
        Some(n) if n > 0 => n as f64,
        _ => cpu_stats
            .cpu_usage
            .as_ref()
            .and_then(|u| u.percpu_usage.as_ref())
            .map_or(0, Vec::len) as f64,
    };
    (cpu_delta / system_delta) * online * 100.0
}
