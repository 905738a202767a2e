// Per-container stats stream task

use bollard::query_parameters::StatsOptions;
use bollard::secret::ContainerStatsResponse;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tracing::debug;

use super::DockerHost;
use crate::models::{AppEvent, ContainerKey, EventSender, StatSample};

/// Stream raw counter frames for one container until the stream ends or the
/// channel closes. Stream end is silent: the row goes stale in the UI until
/// the watcher reports the container gone or restarted.
pub async fn stream_stats(host: DockerHost, container_id: String, tx: EventSender) {
    let key = ContainerKey::new(host.host_id.clone(), container_id.clone());
    let options = StatsOptions {
        stream: true,
        ..Default::default()
    };
    let mut stream = host.docker.stats(&container_id, Some(options));

    while let Some(result) = stream.next().await {
        match result {
            Ok(frame) => {
                if let Some(sample) = extract_sample(&frame, &key, Utc::now())
                    && tx.send(AppEvent::Stat(sample)).await.is_err()
                {
                    return;
                }
            }
            Err(e) => {
                debug!(host = %key.host_id, id = %key.container_id, "stats stream error: {}", e);
                return;
            }
        }
    }
    debug!(host = %key.host_id, id = %key.container_id, "stats stream ended");
}

/// Pull the raw counters out of one engine frame. Returns None for frames
/// that cannot carry a sample (missing cpu blocks) and for the hollow
/// frames the engine emits around state transitions (provisional CPU of
/// zero with zero memory usage). Exposed for unit tests.
pub(crate) fn extract_sample(
    frame: &ContainerStatsResponse,
    key: &ContainerKey,
    received_at: DateTime<Utc>,
) -> Option<StatSample> {
    let cpu_stats = frame.cpu_stats.as_ref()?;
    let precpu_stats = frame.precpu_stats.as_ref()?;
    let cpu_usage = cpu_stats.cpu_usage.as_ref()?;

    // The engine stamps each frame; its zero value means "no timestamp"
    let ts = frame
        .read
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .filter(|dt| dt.timestamp() > 0)
        .unwrap_or(received_at);

    let cpu_total = cpu_usage.total_usage.unwrap_or(0);
    let system_cpu = cpu_stats.system_cpu_usage.unwrap_or(0);
    let per_cpu_count = cpu_stats
        .online_cpus
        .filter(|n| *n > 0)
        .unwrap_or_else(|| {
            cpu_usage
                .percpu_usage
                .as_ref()
                .map(|v| v.len() as u32)
                .filter(|n| *n > 0)
                .unwrap_or(1)
        });

    let mem_usage = frame.memory_stats.as_ref().and_then(|m| m.usage).unwrap_or(0);
    let mem_limit = frame.memory_stats.as_ref().and_then(|m| m.limit).unwrap_or(0);

    let (rx_bytes, tx_bytes) = frame.networks.as_ref().map_or((0u64, 0u64), |networks| {
        let mut rx = 0u64;
        let mut tx = 0u64;
        for n in networks.values() {
            rx += n.rx_bytes.unwrap_or(0);
            tx += n.tx_bytes.unwrap_or(0);
        }
        (rx, tx)
    });

    // Transition frames: the in-frame precpu delta says whether this frame
    // carries real data yet
    let cpu_delta = cpu_total as i64
        - precpu_stats
            .cpu_usage
            .as_ref()
            .and_then(|u| u.total_usage)
            .unwrap_or(0) as i64;
    let system_delta = system_cpu as i64 - precpu_stats.system_cpu_usage.unwrap_or(0) as i64;
    let provisional_cpu = if system_delta > 0 && cpu_delta > 0 {
        cpu_delta as f64 / system_delta as f64
    } else {
        0.0
    };
    if provisional_cpu == 0.0 && mem_usage == 0 {
        return None;
    }

    Some(StatSample {
        key: key.clone(),
        ts,
        cpu_total,
        system_cpu,
        per_cpu_count,
        mem_usage,
        mem_limit,
        rx_bytes,
        tx_bytes,
    })
}
