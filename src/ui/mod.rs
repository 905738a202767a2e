// Terminal UI: event loop, views, input, rendering

pub mod app;
pub mod container_list;
pub mod format;
pub mod help;
pub mod input;
pub mod log_view;
pub mod render;

pub use app::{App, RENDER_INTERVAL, run};
pub use container_list::ContainerListView;
pub use input::keyboard_worker;
pub use log_view::{LOG_BUFFER_LINES, LogView};
