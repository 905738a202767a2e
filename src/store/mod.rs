// Single-writer container store with a cached sorted projection

mod smooth;

pub use smooth::{SMOOTHING_ALPHA, apply_sample};

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{
    AppEvent, Container, ContainerKey, ContainerState, HostId, SortDirection, SortField,
    SortState, StatSample,
};

/// Minimum interval between stats-driven re-sorts. Structural changes and
/// explicit sort-key presses re-sort immediately.
pub const SORT_THROTTLE_INTERVAL: Duration = Duration::from_secs(3);

/// What `apply` changed, so the caller can invalidate caches and decide
/// whether to force a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreDelta {
    /// Event referred to an unknown container (or carried no change).
    None,
    /// Stats-only update for one row.
    Stats(ContainerKey),
    /// Visible attribute change for one row (health).
    Row(ContainerKey),
    /// Rows were added, removed, or changed state.
    Structure,
}

/// All containers across all hosts, keyed by `(host_id, container_id)`,
/// plus the cached ordered view. Owned exclusively by the event loop; no
/// other task touches it.
pub struct ContainerStore {
    containers: HashMap<ContainerKey, Container>,
    sort: SortState,
    show_all: bool,
    projection: Vec<ContainerKey>,
    dirty_structure: bool,
    dirty_stats: bool,
    force_sort: bool,
    last_sorted_at: Instant,
}

impl Default for ContainerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerStore {
    pub fn new() -> Self {
        Self {
            containers: HashMap::new(),
            sort: SortState::default(),
            show_all: false,
            projection: Vec::new(),
            dirty_structure: false,
            dirty_stats: false,
            force_sort: false,
            last_sorted_at: Instant::now() - SORT_THROTTLE_INTERVAL,
        }
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn get(&self, key: &ContainerKey) -> Option<&Container> {
        self.containers.get(key)
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    pub fn show_all(&self) -> bool {
        self.show_all
    }

    /// Apply one engine-side event. Input events return `StoreDelta::None`.
    pub fn apply(&mut self, event: AppEvent) -> StoreDelta {
        match event {
            AppEvent::InitialSnapshot(host_id, containers) => {
                self.apply_snapshot(host_id, containers)
            }
            AppEvent::ContainerCreated(container) => self.apply_created(container),
            AppEvent::ContainerStateChanged(key, state) => self.apply_state_changed(key, state),
            AppEvent::HealthChanged(key, health) => {
                match self.containers.get_mut(&key) {
                    Some(c) => {
                        c.health = health;
                        StoreDelta::Row(key)
                    }
                    None => StoreDelta::None,
                }
            }
            AppEvent::ContainerDestroyed(key) => {
                if self.containers.remove(&key).is_some() {
                    self.dirty_structure = true;
                    StoreDelta::Structure
                } else {
                    StoreDelta::None
                }
            }
            AppEvent::Stat(sample) => self.apply_stat(sample),
            _ => StoreDelta::None,
        }
    }

    /// Replace this host's rows with the snapshot. Applying the same
    /// snapshot twice is a no-op the second time; rows the host no longer
    /// reports are dropped so the store reconverges after a resubscribe.
    /// Smoothing state survives for rows that persist.
    fn apply_snapshot(&mut self, host_id: HostId, containers: Vec<Container>) -> StoreDelta {
        self.containers
            .retain(|key, _| key.host_id != host_id || containers.iter().any(|c| c.key == *key));
        for mut container in containers {
            if let Some(existing) = self.containers.get(&container.key) {
                container.stats = existing.stats;
                container.prev_counters = existing.prev_counters;
                container.last_stat_at = existing.last_stat_at;
            }
            self.containers.insert(container.key.clone(), container);
        }
        self.dirty_structure = true;
        StoreDelta::Structure
    }

    fn apply_created(&mut self, container: Container) -> StoreDelta {
        self.containers.insert(container.key.clone(), container);
        self.dirty_structure = true;
        StoreDelta::Structure
    }

    /// State transitions out of Running drop the row unless "show all" is
    /// active; visible exited rows stay until the engine reports a destroy.
    fn apply_state_changed(&mut self, key: ContainerKey, state: ContainerState) -> StoreDelta {
        let Some(container) = self.containers.get_mut(&key) else {
            return StoreDelta::None;
        };
        container.state = state;
        if !self.show_all && !state.is_running() {
            self.containers.remove(&key);
        }
        self.dirty_structure = true;
        StoreDelta::Structure
    }

    /// Samples for unknown keys are dropped: the next snapshot supplies the
    /// container, and buffering here would be unbounded.
    fn apply_stat(&mut self, sample: StatSample) -> StoreDelta {
        let Some(container) = self.containers.get_mut(&sample.key) else {
            debug!(host = %sample.key.host_id, id = %sample.key.container_id,
                "dropping stats sample for unknown container");
            return StoreDelta::None;
        };
        let (stats, counters) = smooth::apply_sample(
            &sample,
            container.prev_counters,
            container.stats,
        );
        container.stats = stats;
        container.prev_counters = Some(counters);
        container.last_stat_at = Some(sample.ts);
        if matches!(self.sort.field, SortField::Cpu | SortField::Memory) {
            self.dirty_stats = true;
        }
        StoreDelta::Stats(sample.key)
    }

    /// Explicit sort key press: switch/toggle and bypass the throttle.
    pub fn press_sort_key(&mut self, field: SortField) {
        self.sort.press(field);
        self.force_sort = true;
    }

    pub fn cycle_sort_field(&mut self) {
        self.sort = SortState::new(self.sort.field.next());
        self.force_sort = true;
    }

    pub fn toggle_show_all(&mut self) {
        self.show_all = !self.show_all;
        self.dirty_structure = true;
    }

    /// The ordered, filtered view. Rebuilt lazily: structural changes and
    /// forced sorts re-sort now, stats churn at most once per
    /// `SORT_THROTTLE_INTERVAL`.
    pub fn projection(&mut self) -> &[ContainerKey] {
        let stats_due = self.dirty_stats
            && self.last_sorted_at.elapsed() >= SORT_THROTTLE_INTERVAL;
        if self.dirty_structure || self.force_sort || stats_due {
            self.rebuild_projection();
        }
        &self.projection
    }

    fn rebuild_projection(&mut self) {
        // Sort over captured row values: the comparator must never index
        // back into the map, which can mutate between filter and compare.
        struct SortRow {
            key: ContainerKey,
            name: String,
            created_at: Option<DateTime<Utc>>,
            cpu: f64,
            mem: f64,
        }

        let mut rows: Vec<SortRow> = self
            .containers
            .values()
            .filter(|c| self.show_all || c.state.is_running())
            .map(|c| SortRow {
                key: c.key.clone(),
                name: c.name.clone(),
                created_at: c.created_at,
                cpu: c.stats.cpu_fraction,
                mem: c.stats.mem_fraction,
            })
            .collect();

        let sort = self.sort;
        rows.sort_by(|a, b| {
            // Hosts stay contiguous regardless of the active field
            a.key
                .host_id
                .cmp(&b.key.host_id)
                .then_with(|| {
                    let field = match sort.field {
                        SortField::Uptime => a.created_at.cmp(&b.created_at),
                        SortField::Name => a.name.cmp(&b.name),
                        SortField::Cpu => a.cpu.partial_cmp(&b.cpu).unwrap_or(Ordering::Equal),
                        SortField::Memory => a.mem.partial_cmp(&b.mem).unwrap_or(Ordering::Equal),
                    };
                    match sort.direction {
                        SortDirection::Ascending => field,
                        SortDirection::Descending => field.reverse(),
                    }
                })
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.key.container_id.cmp(&b.key.container_id))
        });

        self.projection = rows.into_iter().map(|r| r.key).collect();
        self.dirty_structure = false;
        self.dirty_stats = false;
        self.force_sort = false;
        self.last_sorted_at = Instant::now();
    }
}
