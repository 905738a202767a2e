// Domain models shared across the watcher, store, and UI

mod container;
mod events;

pub use container::{
    Container, ContainerKey, ContainerState, HealthStatus, HostId, PrevCounters, RuntimeStats,
    STALE_AFTER_SECS,
};
pub use events::{
    AppEvent, EventReceiver, EventSender, LogRecord, LogStream, QuitReason, SortDirection,
    SortField, SortState, StatSample, ViewState,
};
