// Smoothing behavior through the store's stats path

mod common;

use common::*;
use dtop::models::*;
use dtop::store::ContainerStore;

fn store_with_one_container() -> (ContainerStore, ContainerKey) {
    let mut store = ContainerStore::new();
    store.apply(AppEvent::InitialSnapshot(
        "local".to_string(),
        vec![running_container("local", "aaa111aaa111", "web")],
    ));
    (store, key("local", "aaa111aaa111"))
}

#[test]
fn cpu_ema_converges_over_consecutive_frames() {
    let (mut store, k) = store_with_one_container();

    store.apply(AppEvent::Stat(sample(k.clone(), 0, 100, 1000)));
    assert_eq!(store.get(&k).unwrap().stats.cpu_fraction, 0.0);

    store.apply(AppEvent::Stat(sample(k.clone(), 1, 300, 2000)));
    let cpu = store.get(&k).unwrap().stats.cpu_fraction;
    assert!((cpu - 0.12).abs() < 1e-9, "got {}", cpu);

    store.apply(AppEvent::Stat(sample(k.clone(), 2, 600, 3000)));
    let cpu = store.get(&k).unwrap().stats.cpu_fraction;
    assert!((cpu - 0.264).abs() < 1e-9, "got {}", cpu);
}

#[test]
fn memory_fraction_tracks_usage_over_limit() {
    let (mut store, k) = store_with_one_container();
    // 128 MiB of 512 MiB: instantaneous 0.25, smoothed from 0
    store.apply(AppEvent::Stat(sample(k.clone(), 0, 100, 1000)));
    let mem = store.get(&k).unwrap().stats.mem_fraction;
    assert!((mem - 0.075).abs() < 1e-9, "got {}", mem);
}

#[test]
fn zero_memory_limit_reports_zero() {
    let (mut store, k) = store_with_one_container();
    let mut s = sample(k.clone(), 0, 100, 1000);
    s.mem_limit = 0;
    s.mem_usage = 4096;
    store.apply(AppEvent::Stat(s));
    assert_eq!(store.get(&k).unwrap().stats.mem_fraction, 0.0);
}

#[test]
fn fractions_stay_clamped_under_absurd_counters() {
    let (mut store, k) = store_with_one_container();
    store.apply(AppEvent::Stat(sample(k.clone(), 0, 0, 100)));
    let mut s = sample(k.clone(), 1, u64::MAX, 200);
    s.mem_usage = u64::MAX;
    s.mem_limit = 1;
    store.apply(AppEvent::Stat(s));

    let stats = store.get(&k).unwrap().stats;
    assert!(stats.cpu_fraction >= 0.0 && stats.cpu_fraction <= 1.0);
    assert!(stats.mem_fraction >= 0.0 && stats.mem_fraction <= 1.0);
}

#[test]
fn network_rate_is_bounded_by_the_raw_delta() {
    let (mut store, k) = store_with_one_container();
    let mut s = sample(k.clone(), 0, 100, 1000);
    s.rx_bytes = 1000;
    store.apply(AppEvent::Stat(s));

    let mut s = sample(k.clone(), 2, 300, 2000);
    s.rx_bytes = 3000;
    store.apply(AppEvent::Stat(s));

    // Raw delta is 2000 bytes over 2 s = 1000 B/s; the smoothed value must
    // stay at or below that while rising toward it
    let rate = store.get(&k).unwrap().stats.rx_bytes_per_sec;
    assert!(rate > 0.0);
    assert!(rate <= 1000.0, "got {}", rate);
}

#[test]
fn network_counter_reset_produces_zero_not_negative() {
    let (mut store, k) = store_with_one_container();
    let mut s = sample(k.clone(), 0, 100, 1000);
    s.rx_bytes = 10_000;
    s.tx_bytes = 10_000;
    store.apply(AppEvent::Stat(s));

    let mut s = sample(k.clone(), 1, 300, 2000);
    s.rx_bytes = 500;
    s.tx_bytes = 500;
    store.apply(AppEvent::Stat(s));

    let stats = store.get(&k).unwrap().stats;
    assert!(stats.rx_bytes_per_sec >= 0.0);
    assert!(stats.tx_bytes_per_sec >= 0.0);
    assert_eq!(stats.rx_bytes_per_sec, 0.0);
}

#[test]
fn last_stat_timestamp_advances_with_samples() {
    let (mut store, k) = store_with_one_container();
    assert!(store.get(&k).unwrap().last_stat_at.is_none());

    store.apply(AppEvent::Stat(sample(k.clone(), 0, 100, 1000)));
    assert_eq!(store.get(&k).unwrap().last_stat_at, Some(ts(0)));

    store.apply(AppEvent::Stat(sample(k.clone(), 5, 300, 2000)));
    assert_eq!(store.get(&k).unwrap().last_stat_at, Some(ts(5)));

    // A row with an old sample reads as stale relative to "now"
    assert!(store.get(&k).unwrap().is_stale(ts(10)));
    assert!(!store.get(&k).unwrap().is_stale(ts(6)));
}
