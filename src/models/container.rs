// Container domain models

use chrono::{DateTime, Duration, Utc};

/// Stable short name for a configured engine endpoint ("local", "user@box",
/// "host:2375"). Derived once from the host spec at startup.
pub type HostId = String;

/// Container state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Exited,
    Dead,
    Removing,
    Unknown,
}

impl ContainerState {
    /// Parse from an engine state string (e.g. "running", "exited"). Also
    /// accepts the debug rendering of generated API enums ("RUNNING").
    pub fn from_docker(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "created" => ContainerState::Created,
            "running" => ContainerState::Running,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "exited" => ContainerState::Exited,
            "dead" => ContainerState::Dead,
            "removing" => ContainerState::Removing,
            _ => ContainerState::Unknown,
        }
    }

    pub fn is_running(self) -> bool {
        self == ContainerState::Running
    }
}

/// Health check status; `None` when the container has no health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthStatus {
    #[default]
    None,
    Starting,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn from_docker(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "starting" => HealthStatus::Starting,
            "healthy" => HealthStatus::Healthy,
            "unhealthy" => HealthStatus::Unhealthy,
            _ => HealthStatus::None,
        }
    }
}

/// Composite identity: the same 12-char container id on two hosts is two
/// distinct entities.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ContainerKey {
    pub host_id: HostId,
    pub container_id: String,
}

impl ContainerKey {
    pub fn new(host_id: HostId, container_id: impl Into<String>) -> Self {
        Self {
            host_id,
            container_id: container_id.into(),
        }
    }
}

/// EMA-smoothed telemetry published to the UI. Fractions are clamped to
/// [0, 1]; rates are non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RuntimeStats {
    pub cpu_fraction: f64,
    pub mem_fraction: f64,
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
}

/// Raw counters from the previous stats frame, kept to turn the next
/// monotonic sample into deltas.
#[derive(Debug, Clone, Copy)]
pub struct PrevCounters {
    pub cpu_total: u64,
    pub system_cpu: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub ts: DateTime<Utc>,
}

/// A running container's stats stream ticks about once a second; a row that
/// has not seen a sample for two ticks is rendered dimmed.
pub const STALE_AFTER_SECS: i64 = 2;

#[derive(Debug, Clone)]
pub struct Container {
    pub key: ContainerKey,
    pub name: String,
    pub image: String,
    pub command: String,
    pub state: ContainerState,
    pub health: HealthStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub memory_limit_bytes: u64,
    pub cpu_limit_cores: f64,
    pub dozzle_url: Option<String>,
    pub stats: RuntimeStats,
    pub last_stat_at: Option<DateTime<Utc>>,
    pub prev_counters: Option<PrevCounters>,
}

impl Container {
    /// A running container whose stats stream has gone quiet. Exited
    /// containers are never stale; they simply have no stream.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        if !self.state.is_running() {
            return false;
        }
        match self.last_stat_at {
            Some(ts) => now - ts > Duration::seconds(STALE_AFTER_SECS),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_parses_engine_strings_and_enum_debug_forms() {
        assert_eq!(ContainerState::from_docker("running"), ContainerState::Running);
        assert_eq!(ContainerState::from_docker("RUNNING"), ContainerState::Running);
        assert_eq!(ContainerState::from_docker("Exited"), ContainerState::Exited);
        assert_eq!(ContainerState::from_docker("gone"), ContainerState::Unknown);
    }

    #[test]
    fn health_parses_unhealthy_distinct_from_healthy() {
        assert_eq!(HealthStatus::from_docker("healthy"), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_docker("unhealthy"), HealthStatus::Unhealthy);
        assert_eq!(HealthStatus::from_docker("starting"), HealthStatus::Starting);
        assert_eq!(HealthStatus::from_docker("none"), HealthStatus::None);
    }

    #[test]
    fn same_id_on_two_hosts_is_two_keys() {
        let a = ContainerKey::new("local".to_string(), "abc123def456");
        let b = ContainerKey::new("user@box".to_string(), "abc123def456");
        assert_ne!(a, b);
    }
}
