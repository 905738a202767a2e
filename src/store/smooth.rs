// Turns raw counter samples into smoothed rates

use crate::models::{PrevCounters, RuntimeStats, StatSample};

/// Weight of the newest sample in the exponential moving average. One value
/// for all four metrics.
pub const SMOOTHING_ALPHA: f64 = 0.3;

fn ema(inst: f64, prev: f64) -> f64 {
    SMOOTHING_ALPHA * inst + (1.0 - SMOOTHING_ALPHA) * prev
}

/// Fold one raw sample into the published stats. Returns the smoothed
/// values and the counters to remember for the next delta.
///
/// The first sample for a container (no `prev`) establishes the baseline:
/// counters are recorded but no CPU or network rate is published yet.
pub fn apply_sample(
    sample: &StatSample,
    prev: Option<PrevCounters>,
    current: RuntimeStats,
) -> (RuntimeStats, PrevCounters) {
    let inst_cpu = match prev {
        Some(p) => {
            // Counters are u64 but can regress across an engine restart;
            // compute deltas in i128 so regression is detectable, not a wrap.
            let cpu_delta = sample.cpu_total as i128 - p.cpu_total as i128;
            let sys_delta = sample.system_cpu as i128 - p.system_cpu as i128;
            if sys_delta > 0 && cpu_delta >= 0 {
                ((cpu_delta as f64 / sys_delta as f64) * sample.per_cpu_count as f64)
                    .clamp(0.0, 1.0)
            } else {
                current.cpu_fraction
            }
        }
        None => 0.0,
    };

    let inst_mem = if sample.mem_limit > 0 {
        (sample.mem_usage as f64 / sample.mem_limit as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let mut next = RuntimeStats {
        cpu_fraction: ema(inst_cpu, current.cpu_fraction).clamp(0.0, 1.0),
        mem_fraction: ema(inst_mem, current.mem_fraction).clamp(0.0, 1.0),
        rx_bytes_per_sec: current.rx_bytes_per_sec,
        tx_bytes_per_sec: current.tx_bytes_per_sec,
    };

    if let Some(p) = prev {
        let time_delta_s = (sample.ts - p.ts).num_seconds();
        if time_delta_s > 0 {
            // saturating_sub: a regressed counter reads as zero, not huge
            let inst_rx = sample.rx_bytes.saturating_sub(p.rx_bytes) as f64 / time_delta_s as f64;
            let inst_tx = sample.tx_bytes.saturating_sub(p.tx_bytes) as f64 / time_delta_s as f64;
            next.rx_bytes_per_sec = ema(inst_rx, current.rx_bytes_per_sec).max(0.0);
            next.tx_bytes_per_sec = ema(inst_tx, current.tx_bytes_per_sec).max(0.0);
        }
    }

    let counters = PrevCounters {
        cpu_total: sample.cpu_total,
        system_cpu: sample.system_cpu,
        rx_bytes: sample.rx_bytes,
        tx_bytes: sample.tx_bytes,
        ts: sample.ts,
    };

    (next, counters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContainerKey;
    use chrono::{TimeZone, Utc};

    fn sample(secs: i64, cpu_total: u64, system_cpu: u64, per_cpu: u32) -> StatSample {
        StatSample {
            key: ContainerKey::new("local".to_string(), "abc123def456"),
            ts: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            cpu_total,
            system_cpu,
            per_cpu_count: per_cpu,
            mem_usage: 0,
            mem_limit: 0,
            rx_bytes: 0,
            tx_bytes: 0,
        }
    }

    #[test]
    fn first_sample_publishes_no_cpu_rate() {
        let (stats, counters) = apply_sample(&sample(0, 100, 1000, 2), None, RuntimeStats::default());
        assert_eq!(stats.cpu_fraction, 0.0);
        assert_eq!(counters.cpu_total, 100);
        assert_eq!(counters.system_cpu, 1000);
    }

    #[test]
    fn cpu_smoothing_matches_hand_computed_ema() {
        let (stats, prev) = apply_sample(&sample(0, 100, 1000, 2), None, RuntimeStats::default());
        let (stats, prev) = apply_sample(&sample(1, 300, 2000, 2), Some(prev), stats);
        assert!((stats.cpu_fraction - 0.12).abs() < 1e-9);
        let (stats, _) = apply_sample(&sample(2, 600, 3000, 2), Some(prev), stats);
        assert!((stats.cpu_fraction - 0.264).abs() < 1e-9);
    }

    #[test]
    fn zero_system_delta_keeps_prior_cpu_fraction() {
        let (stats, prev) = apply_sample(&sample(0, 100, 1000, 2), None, RuntimeStats::default());
        let (stats, prev) = apply_sample(&sample(1, 300, 2000, 2), Some(prev), stats);
        let before = stats.cpu_fraction;
        let (stats, _) = apply_sample(&sample(2, 400, 2000, 2), Some(prev), stats);
        assert!((stats.cpu_fraction - before).abs() < 1e-9);
    }

    #[test]
    fn cpu_counter_regression_keeps_prior_fraction() {
        let (stats, prev) = apply_sample(&sample(0, 100, 1000, 2), None, RuntimeStats::default());
        let (stats, prev) = apply_sample(&sample(1, 300, 2000, 2), Some(prev), stats);
        let before = stats.cpu_fraction;
        // cpu_total restarts below the previous reading
        let (stats, _) = apply_sample(&sample(2, 50, 3000, 2), Some(prev), stats);
        assert!((stats.cpu_fraction - before).abs() < 1e-9);
    }

    #[test]
    fn cpu_fraction_is_clamped_to_one() {
        let (stats, prev) = apply_sample(&sample(0, 0, 100, 8), None, RuntimeStats::default());
        // cpu delta far exceeds system delta times core count
        let (stats, _) = apply_sample(&sample(1, 10_000, 200, 8), Some(prev), stats);
        assert!(stats.cpu_fraction <= 1.0);
    }

    #[test]
    fn zero_memory_limit_means_zero_fraction() {
        let mut s = sample(0, 100, 1000, 1);
        s.mem_usage = 4096;
        s.mem_limit = 0;
        let (stats, _) = apply_sample(&s, None, RuntimeStats::default());
        assert_eq!(stats.mem_fraction, 0.0);
    }

    #[test]
    fn network_counter_regression_yields_zero_instantaneous_rate() {
        // Steady state at 100 B/s, then the counter resets
        let steady = RuntimeStats {
            rx_bytes_per_sec: 100.0,
            ..Default::default()
        };
        let prev = PrevCounters {
            cpu_total: 0,
            system_cpu: 0,
            rx_bytes: 1000,
            tx_bytes: 0,
            ts: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };
        let mut s = sample(1, 0, 0, 1);
        s.rx_bytes = 500;
        let (stats, _) = apply_sample(&s, Some(prev), steady);
        // EMA of 0 against 100 B/s steady state
        assert!((stats.rx_bytes_per_sec - 70.0).abs() < 1e-9);
    }

    #[test]
    fn sub_second_frame_leaves_rates_untouched() {
        let steady = RuntimeStats {
            rx_bytes_per_sec: 50.0,
            tx_bytes_per_sec: 25.0,
            ..Default::default()
        };
        let prev = PrevCounters {
            cpu_total: 0,
            system_cpu: 0,
            rx_bytes: 1000,
            tx_bytes: 1000,
            ts: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };
        let mut s = sample(0, 0, 0, 1);
        s.rx_bytes = 9000;
        s.tx_bytes = 9000;
        let (stats, _) = apply_sample(&s, Some(prev), steady);
        assert_eq!(stats.rx_bytes_per_sec, 50.0);
        assert_eq!(stats.tx_bytes_per_sec, 25.0);
    }
}
