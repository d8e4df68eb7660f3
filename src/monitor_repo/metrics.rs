// Line-oriented parser for the Prometheus text exposition served by Uptime Kuma's /metrics.

use regex::Regex;
use std::sync::LazyLock;

/// `monitor_<kind>{<labels>} <value>`
static SAMPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(monitor_\w+)\{([^}]*)\}\s+(\S+)").expect("sample regex is valid")
});
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)="([^"]*)""#).expect("label regex is valid"));

/// Raw fields collected for one monitor across all of its metric lines.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct MonitorSample {
    pub status_code: Option<i64>,
    pub name: Option<String>,
    pub latency_ms: Option<f64>,
}

/// Collect the target monitor's samples. `None` when no line carries `monitor_id="<id>"`.
pub(crate) fn parse_monitor(body: &str, monitor_id: u64) -> Option<MonitorSample> {
    let target = monitor_id.to_string();
    let mut sample = MonitorSample::default();
    let mut found = false;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(caps) = SAMPLE_RE.captures(line) else {
            continue;
        };
        let (metric, labels, value) = (&caps[1], &caps[2], &caps[3]);
        if label(labels, "monitor_id") != Some(target.as_str()) {
            continue;
        }
        found = true;

        match metric {
            "monitor_status" => {
                if let Ok(code) = value.parse::<i64>() {
                    sample.status_code = Some(code);
                }
                if let Some(name) = label(labels, "monitor_name") {
                    sample.name = Some(name.to_string());
                }
            }
            "monitor_response_time" => {
                if let Ok(ms) = value.parse::<f64>() {
                    sample.latency_ms = Some(ms);
                }
            }
            _ => {}
        }
    }

    found.then_some(sample)
}

fn label<'a>(labels: &'a str, key: &str) -> Option<&'a str> {
    LABEL_RE
        .captures_iter(labels)
        .find(|c| c.get(1).is_some_and(|k| k.as_str() == key))
        .and_then(|c| c.get(2))
        .map(|v| v.as_str())
}
