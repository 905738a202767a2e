// Event channel payloads: engine lifecycle, stats, logs, keyboard

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::container::{Container, ContainerKey, ContainerState, HealthStatus, HostId};

/// One raw stats frame for a container. Counters are monotonic except across
/// engine restarts; the store turns them into rates.
#[derive(Debug, Clone)]
pub struct StatSample {
    pub key: ContainerKey,
    pub ts: DateTime<Utc>,
    pub cpu_total: u64,
    pub system_cpu: u64,
    pub per_cpu_count: u32,
    pub mem_usage: u64,
    pub mem_limit: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// One parsed log line. `ts` is present when the engine-supplied RFC3339
/// timestamp prefix parsed; the prefix is stripped from `message` either way.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub key: ContainerKey,
    pub ts: Option<DateTime<Utc>>,
    pub stream: LogStream,
    pub message: String,
}

/// Why the session is ending; decides the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitReason {
    Key,
    Interrupt,
}

/// Everything the event loop consumes, from every producer, over one
/// bounded channel.
#[derive(Debug)]
pub enum AppEvent {
    // Host watchers
    InitialSnapshot(HostId, Vec<Container>),
    ContainerCreated(Container),
    ContainerStateChanged(ContainerKey, ContainerState),
    HealthChanged(ContainerKey, HealthStatus),
    ContainerDestroyed(ContainerKey),
    HostUnreachable(HostId, String),
    // Stats streamers
    Stat(StatSample),
    // Log streamer
    Log(LogRecord),
    // Input worker. Navigation keys are view-agnostic here; the event loop
    // resolves them against the current view so one key press is exactly
    // one event.
    Quit(QuitReason),
    NavigateUp,
    NavigateDown,
    EnterPressed,
    Back,
    ToggleShowAll,
    OpenDozzle,
    CycleSortField,
    SetSortField(SortField),
    ToggleHelp,
    Resize,
}

pub type EventSender = mpsc::Sender<AppEvent>;
pub type EventReceiver = mpsc::Receiver<AppEvent>;

/// Current view of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// No snapshot has arrived from any host yet.
    Loading,
    ContainerList,
    LogView(ContainerKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Uptime,
    Name,
    Cpu,
    Memory,
}

impl SortField {
    pub fn next(self) -> Self {
        match self {
            SortField::Uptime => SortField::Name,
            SortField::Name => SortField::Cpu,
            SortField::Cpu => SortField::Memory,
            SortField::Memory => SortField::Uptime,
        }
    }

    pub fn default_direction(self) -> SortDirection {
        match self {
            SortField::Name => SortDirection::Ascending,
            // Newest / busiest first
            SortField::Uptime | SortField::Cpu | SortField::Memory => SortDirection::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

/// Active sort field plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(field: SortField) -> Self {
        Self {
            field,
            direction: field.default_direction(),
        }
    }

    /// Pressing the key for the active field flips direction; any other
    /// field takes over with its default direction.
    pub fn press(&mut self, field: SortField) {
        if self.field == field {
            self.direction = self.direction.toggle();
        } else {
            *self = Self::new(field);
        }
    }
}

impl Default for SortState {
    fn default() -> Self {
        Self::new(SortField::Uptime)
    }
}
