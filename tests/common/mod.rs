// Shared test helpers

use chrono::{DateTime, TimeZone, Utc};
use dtop::models::*;

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn key(host: &str, id: &str) -> ContainerKey {
    ContainerKey::new(host.to_string(), id)
}

pub fn running_container(host: &str, id: &str, name: &str) -> Container {
    Container {
        key: key(host, id),
        name: name.to_string(),
        image: format!("{}:latest", name),
        command: format!("/usr/bin/{}", name),
        state: ContainerState::Running,
        health: HealthStatus::None,
        created_at: Some(ts(0)),
        started_at: Some(ts(1)),
        finished_at: None,
        memory_limit_bytes: 512 * 1024 * 1024,
        cpu_limit_cores: 0.0,
        dozzle_url: None,
        stats: RuntimeStats::default(),
        last_stat_at: None,
        prev_counters: None,
    }
}

pub fn exited_container(host: &str, id: &str, name: &str) -> Container {
    let mut c = running_container(host, id, name);
    c.state = ContainerState::Exited;
    c.finished_at = Some(ts(100));
    c
}

pub fn sample(k: ContainerKey, at_secs: i64, cpu_total: u64, system_cpu: u64) -> StatSample {
    StatSample {
        key: k,
        ts: ts(at_secs),
        cpu_total,
        system_cpu,
        per_cpu_count: 2,
        mem_usage: 128 * 1024 * 1024,
        mem_limit: 512 * 1024 * 1024,
        rx_bytes: 0,
        tx_bytes: 0,
    }
}
