// Engine connections and per-host container watchers via bollard

mod logs;
mod stats;

pub use logs::stream_logs;
pub use stats::stream_stats;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use bollard::query_parameters::{EventsOptions, InspectContainerOptions, ListContainersOptions};
use bollard::secret::EventMessage;
use bollard::{API_DEFAULT_VERSION, Docker};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{HostKind, HostSpec};
use crate::models::{
    AppEvent, Container, ContainerKey, ContainerState, EventSender, HealthStatus, RuntimeStats,
};

/// Per-request client timeout. Event, stats, and log streams are exempt.
const CLIENT_TIMEOUT_SECS: u64 = 120;
/// Budget for the initial reachability check.
const PING_TIMEOUT: Duration = Duration::from_secs(10);
/// Resubscribe backoff ladder for a dropped event stream.
const BACKOFF_INITIAL: Duration = Duration::from_millis(100);
const BACKOFF_CEILING: Duration = Duration::from_secs(5);
/// A subscription that stays healthy this long resets the ladder.
const BACKOFF_RESET_AFTER: Duration = Duration::from_secs(30);

/// Name label honored over the engine-reported container name.
const NAME_LABEL: &str = "dev.dozzle.name";

/// One connected engine endpoint.
#[derive(Clone)]
pub struct DockerHost {
    pub host_id: String,
    pub docker: Docker,
    pub dozzle_url: Option<String>,
}

impl DockerHost {
    /// Build a client for the given host spec. This does not talk to the
    /// daemon yet; the watcher's ping does.
    pub fn connect(spec: &HostSpec) -> anyhow::Result<Self> {
        let docker = match spec.kind {
            // Honors DOCKER_HOST, falling back to the default local socket
            HostKind::Local => Docker::connect_with_defaults()?,
            HostKind::Ssh => {
                Docker::connect_with_ssh(&spec.raw, CLIENT_TIMEOUT_SECS, API_DEFAULT_VERSION)?
            }
            HostKind::Tcp => {
                if tls_requested() {
                    let dir = cert_dir();
                    Docker::connect_with_ssl(
                        &spec.raw,
                        &dir.join("key.pem"),
                        &dir.join("cert.pem"),
                        &dir.join("ca.pem"),
                        CLIENT_TIMEOUT_SECS,
                        API_DEFAULT_VERSION,
                    )?
                } else {
                    Docker::connect_with_http(&spec.raw, CLIENT_TIMEOUT_SECS, API_DEFAULT_VERSION)?
                }
            }
        };
        Ok(Self {
            host_id: spec.host_id(),
            docker,
            dozzle_url: spec.dozzle.clone(),
        })
    }
}

fn tls_requested() -> bool {
    std::env::var("DOCKER_TLS_VERIFY").is_ok_and(|v| !v.is_empty())
        || std::env::var("DOCKER_CERT_PATH").is_ok_and(|v| !v.is_empty())
}

fn cert_dir() -> PathBuf {
    match std::env::var("DOCKER_CERT_PATH") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir().unwrap_or_default().join(".docker"),
    }
}

/// Long-running watcher for one host: health check, snapshot, then event
/// subscription with backoff resubscribe. Spawns a stats task per running
/// container. Never panics; a dead host is reported as an event and the
/// task ends without disturbing other hosts.
pub async fn watch_host(host: DockerHost, tx: EventSender) {
    match tokio::time::timeout(PING_TIMEOUT, host.docker.ping()).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            let _ = tx
                .send(AppEvent::HostUnreachable(host.host_id.clone(), e.to_string()))
                .await;
            return;
        }
        Err(_) => {
            let _ = tx
                .send(AppEvent::HostUnreachable(
                    host.host_id.clone(),
                    format!("no response within {}s", PING_TIMEOUT.as_secs()),
                ))
                .await;
            return;
        }
    }
    info!(host = %host.host_id, "connected");

    let mut stats_tasks: HashMap<String, JoinHandle<()>> = HashMap::new();
    let mut backoff = BACKOFF_INITIAL;

    loop {
        snapshot(&host, &tx, &mut stats_tasks).await;
        if tx.is_closed() {
            break;
        }

        let subscribed_at = Instant::now();
        run_event_subscription(&host, &tx, &mut stats_tasks).await;
        if tx.is_closed() {
            break;
        }

        if subscribed_at.elapsed() >= BACKOFF_RESET_AFTER {
            backoff = BACKOFF_INITIAL;
        }
        warn!(host = %host.host_id, delay_ms = backoff.as_millis() as u64,
            "event stream ended, resubscribing");
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(BACKOFF_CEILING);
    }

    for handle in stats_tasks.into_values() {
        handle.abort();
    }
    debug!(host = %host.host_id, "watcher stopped");
}

/// List and inspect every container on the host (including stopped ones)
/// and emit one snapshot event. Individual inspect failures are skipped;
/// a partial snapshot beats none. The event is sent even when the list is
/// empty so the UI can leave its loading state.
async fn snapshot(
    host: &DockerHost,
    tx: &EventSender,
    stats_tasks: &mut HashMap<String, JoinHandle<()>>,
) {
    let options = ListContainersOptions {
        all: true,
        ..Default::default()
    };
    let list = match host.docker.list_containers(Some(options)).await {
        Ok(list) => list,
        Err(e) => {
            warn!(host = %host.host_id, "list containers failed: {}", e);
            return;
        }
    };

    let mut containers = Vec::with_capacity(list.len());
    for summary in &list {
        let Some(full_id) = summary.id.as_deref() else {
            continue;
        };
        match inspect_one(host, full_id).await {
            Ok(container) => {
                if container.state.is_running() {
                    spawn_stats_task(host, &container.key.container_id, tx, stats_tasks);
                }
                containers.push(container);
            }
            Err(e) => {
                debug!(host = %host.host_id, id = %full_id, "inspect failed during snapshot: {}", e);
            }
        }
    }

    let _ = tx
        .send(AppEvent::InitialSnapshot(host.host_id.clone(), containers))
        .await;
}

/// Consume the host's container event stream until it ends or errors.
async fn run_event_subscription(
    host: &DockerHost,
    tx: &EventSender,
    stats_tasks: &mut HashMap<String, JoinHandle<()>>,
) {
    let mut filters = HashMap::new();
    filters.insert("type".to_string(), vec!["container".to_string()]);
    filters.insert(
        "event".to_string(),
        vec![
            "start".to_string(),
            "stop".to_string(),
            "die".to_string(),
            "destroy".to_string(),
            "health_status".to_string(),
        ],
    );
    let options = EventsOptions {
        filters: Some(filters),
        ..Default::default()
    };

    let mut events = host.docker.events(Some(options));
    while let Some(result) = events.next().await {
        if tx.is_closed() {
            return;
        }
        match result {
            Ok(event) => handle_event(host, event, tx, stats_tasks).await,
            Err(e) => {
                debug!(host = %host.host_id, "event stream error: {}", e);
                return;
            }
        }
    }
}

async fn handle_event(
    host: &DockerHost,
    event: EventMessage,
    tx: &EventSender,
    stats_tasks: &mut HashMap<String, JoinHandle<()>>,
) {
    stats_tasks.retain(|_, handle| !handle.is_finished());

    let Some(actor) = event.actor else { return };
    let full_id = actor.id.clone().unwrap_or_default();
    if full_id.is_empty() {
        return;
    }
    let id = short_id(&full_id);
    let key = ContainerKey::new(host.host_id.clone(), id.clone());
    let action = event.action.unwrap_or_default();

    match action.as_str() {
        "start" => match inspect_one(host, &full_id).await {
            Ok(container) => {
                let _ = tx.send(AppEvent::ContainerCreated(container)).await;
                spawn_stats_task(host, &id, tx, stats_tasks);
            }
            Err(e) => {
                // The next event or snapshot will supply a fresh observation
                debug!(host = %host.host_id, id = %id, "inspect failed on start: {}", e);
            }
        },
        "stop" | "die" => {
            let state = match inspect_one(host, &full_id).await {
                Ok(container) => container.state,
                Err(_) => ContainerState::Exited,
            };
            let _ = tx.send(AppEvent::ContainerStateChanged(key, state)).await;
            // The stats task ends on its own when the engine closes the stream
        }
        "destroy" => {
            if let Some(handle) = stats_tasks.remove(&id) {
                handle.abort();
            }
            let _ = tx.send(AppEvent::ContainerDestroyed(key)).await;
        }
        action if action.starts_with("health_status") => {
            let health = match actor
                .attributes
                .as_ref()
                .and_then(|attrs| attrs.get("health_status"))
            {
                Some(status) => HealthStatus::from_docker(status),
                None => match inspect_one(host, &full_id).await {
                    Ok(container) => container.health,
                    Err(_) => return,
                },
            };
            let _ = tx.send(AppEvent::HealthChanged(key, health)).await;
        }
        other => {
            debug!(host = %host.host_id, action = %other, "ignoring container event");
        }
    }
}

fn spawn_stats_task(
    host: &DockerHost,
    id: &str,
    tx: &EventSender,
    stats_tasks: &mut HashMap<String, JoinHandle<()>>,
) {
    if let Some(handle) = stats_tasks.get(id)
        && !handle.is_finished()
    {
        return;
    }
    let handle = tokio::spawn(stats::stream_stats(
        host.clone(),
        id.to_string(),
        tx.clone(),
    ));
    stats_tasks.insert(id.to_string(), handle);
}

pub(crate) fn short_id(full_id: &str) -> String {
    full_id[..12.min(full_id.len())].to_string()
}

/// Inspect one container and map the response to the domain model.
async fn inspect_one(host: &DockerHost, id: &str) -> Result<Container, bollard::errors::Error> {
    let inspect = host
        .docker
        .inspect_container(id, None::<InspectContainerOptions>)
        .await?;

    let full_id = inspect.id.as_deref().unwrap_or(id);
    let key = ContainerKey::new(host.host_id.clone(), short_id(full_id));

    let config = inspect.config.as_ref();
    let labeled_name = config
        .and_then(|c| c.labels.as_ref())
        .and_then(|labels| labels.get(NAME_LABEL))
        .filter(|name| !name.is_empty())
        .cloned();
    let name = labeled_name.unwrap_or_else(|| {
        inspect
            .name
            .as_deref()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_default()
    });

    let image = config
        .and_then(|c| c.image.clone())
        .unwrap_or_default();
    let entrypoint = config
        .and_then(|c| c.entrypoint.as_ref())
        .map(|parts| parts.join(" "))
        .unwrap_or_default();
    let cmd = config
        .and_then(|c| c.cmd.as_ref())
        .map(|parts| parts.join(" "))
        .unwrap_or_default();
    let command = format!("{} {}", entrypoint, cmd).trim().to_string();

    let state = inspect
        .state
        .as_ref()
        .and_then(|s| s.status.as_ref())
        .map(|status| ContainerState::from_docker(&format!("{:?}", status)))
        .unwrap_or(ContainerState::Unknown);
    let health = inspect
        .state
        .as_ref()
        .and_then(|s| s.health.as_ref())
        .and_then(|h| h.status.as_ref())
        .map(|status| HealthStatus::from_docker(&format!("{:?}", status)))
        .unwrap_or_default();

    let host_config = inspect.host_config.as_ref();
    let memory_limit_bytes = host_config
        .and_then(|hc| hc.memory)
        .map(|m| m.max(0) as u64)
        .unwrap_or(0);
    let cpu_limit_cores = host_config
        .and_then(|hc| hc.nano_cpus)
        .map(|n| n.max(0) as f64 / 1e9)
        .unwrap_or(0.0);

    Ok(Container {
        key,
        name,
        image,
        command,
        state,
        health,
        created_at: parse_engine_time(inspect.created.as_deref()),
        started_at: parse_engine_time(inspect.state.as_ref().and_then(|s| s.started_at.as_deref())),
        finished_at: parse_engine_time(
            inspect.state.as_ref().and_then(|s| s.finished_at.as_deref()),
        ),
        memory_limit_bytes,
        cpu_limit_cores,
        dozzle_url: host.dozzle_url.clone(),
        stats: RuntimeStats::default(),
        last_stat_at: None,
        prev_counters: None,
    })
}

/// RFC3339 from the engine; the zero value "0001-01-01T00:00:00Z" means
/// "never" and maps to None.
fn parse_engine_time(s: Option<&str>) -> Option<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s?).ok()?.with_timezone(&Utc);
    (dt.timestamp() > 0).then_some(dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_truncates_to_twelve_chars() {
        let full = "0123456789abcdef0123456789abcdef";
        assert_eq!(short_id(full), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn engine_zero_time_maps_to_none() {
        assert_eq!(parse_engine_time(Some("0001-01-01T00:00:00Z")), None);
        assert!(parse_engine_time(Some("2025-10-28T12:34:56.789Z")).is_some());
        assert_eq!(parse_engine_time(Some("not a time")), None);
        assert_eq!(parse_engine_time(None), None);
    }
}
