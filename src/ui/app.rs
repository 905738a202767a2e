// Event loop: drain producers, mutate state, render on a fixed cadence

use std::collections::HashMap;
use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};

use ratatui::Terminal;
use ratatui::backend::Backend;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::container_list::ContainerListView;
use super::log_view::LogView;
use super::render::{UiStyles, render_ui};
use crate::docker_repo::{self, DockerHost};
use crate::models::{
    AppEvent, EventReceiver, EventSender, HostId, QuitReason, ViewState,
};
use crate::store::{ContainerStore, StoreDelta};

/// Render cadence. Structural changes render immediately; everything else
/// waits for the next tick.
pub const RENDER_INTERVAL: Duration = Duration::from_millis(500);
const MIN_RECEIVE_TIMEOUT: Duration = Duration::from_millis(10);
/// Host-unreachable banners expire after this long.
const BANNER_TTL: Duration = Duration::from_secs(10);

/// All user-visible state. Owned by the event loop; producer tasks only
/// ever talk to it through the channel.
pub struct App {
    pub store: ContainerStore,
    pub view_state: ViewState,
    pub list: ContainerListView,
    pub log: Option<LogView>,
    pub show_help: bool,
    connection_errors: HashMap<HostId, (String, Instant)>,
    hosts: HashMap<HostId, DockerHost>,
    tx: EventSender,
    log_task: Option<JoinHandle<()>>,
    open_allowed: bool,
    quit: Option<QuitReason>,
}

impl App {
    /// `configured_hosts` is the number of hosts the user asked for, which
    /// decides the HOST column; `hosts` holds the ones that connected.
    pub fn new(
        hosts: HashMap<HostId, DockerHost>,
        tx: EventSender,
        configured_hosts: usize,
    ) -> Self {
        // Opening a browser from inside an SSH session would open it on
        // the remote end; suppress hyperlinks and the open action there.
        let in_ssh_session = ["SSH_CLIENT", "SSH_TTY", "SSH_CONNECTION"]
            .iter()
            .any(|var| std::env::var(var).is_ok_and(|v| !v.is_empty()));

        Self {
            store: ContainerStore::new(),
            view_state: ViewState::Loading,
            list: ContainerListView::new(!in_ssh_session, configured_hosts),
            log: None,
            show_help: false,
            connection_errors: HashMap::new(),
            hosts,
            tx,
            log_task: None,
            open_allowed: !in_ssh_session,
            quit: None,
        }
    }

    /// Process one event; returns whether the UI must redraw before the
    /// next cadence tick.
    pub fn handle_event(&mut self, event: AppEvent) -> bool {
        match &event {
            AppEvent::Stat(_) | AppEvent::Log(_) => trace!(?event, "handling event"),
            _ => debug!(?event, "handling event"),
        }

        match event {
            event @ AppEvent::InitialSnapshot(..) => {
                let delta = self.store.apply(event);
                if self.view_state == ViewState::Loading {
                    self.view_state = ViewState::ContainerList;
                }
                self.apply_delta(delta)
            }
            event @ (AppEvent::ContainerCreated(_)
            | AppEvent::ContainerStateChanged(..)
            | AppEvent::HealthChanged(..)
            | AppEvent::ContainerDestroyed(_)
            | AppEvent::Stat(_)) => {
                let delta = self.store.apply(event);
                self.apply_delta(delta)
            }
            AppEvent::HostUnreachable(host_id, error) => {
                warn!(host = %host_id, "host unreachable: {}", error);
                self.connection_errors
                    .insert(host_id, (error, Instant::now()));
                self.connection_errors
                    .retain(|_, (_, at)| at.elapsed() < BANNER_TTL);
                true
            }
            AppEvent::Log(record) => {
                match &mut self.log {
                    Some(log) if log.key == record.key => {
                        log.push(record);
                        matches!(self.view_state, ViewState::LogView(_))
                    }
                    // A line for a container we are no longer viewing
                    _ => false,
                }
            }
            AppEvent::Quit(reason) => {
                self.quit = Some(reason);
                false
            }
            AppEvent::NavigateUp => self.navigate(true),
            AppEvent::NavigateDown => self.navigate(false),
            AppEvent::EnterPressed => {
                if self.view_state == ViewState::ContainerList {
                    self.open_log_view()
                } else {
                    false
                }
            }
            AppEvent::Back => {
                if self.show_help {
                    self.show_help = false;
                    true
                } else if matches!(self.view_state, ViewState::LogView(_)) {
                    self.close_log_view();
                    true
                } else {
                    false
                }
            }
            AppEvent::ToggleShowAll => {
                self.store.toggle_show_all();
                true
            }
            AppEvent::OpenDozzle => {
                self.open_dozzle();
                false
            }
            AppEvent::CycleSortField => {
                self.store.cycle_sort_field();
                true
            }
            AppEvent::SetSortField(field) => {
                self.store.press_sort_key(field);
                true
            }
            AppEvent::ToggleHelp => {
                self.show_help = !self.show_help;
                true
            }
            AppEvent::Resize => {
                self.list.invalidate_cache();
                true
            }
        }
    }

    pub fn quit_reason(&self) -> Option<QuitReason> {
        self.quit
    }

    /// Unexpired host banners, newest state only.
    pub fn active_connection_errors(&self) -> Vec<String> {
        let mut banners: Vec<String> = self
            .connection_errors
            .iter()
            .filter(|(_, (_, at))| at.elapsed() < BANNER_TTL)
            .map(|(host_id, (error, _))| format!("cannot reach {}: {}", host_id, error))
            .collect();
        banners.sort();
        banners
    }

    fn apply_delta(&mut self, delta: StoreDelta) -> bool {
        match delta {
            StoreDelta::None | StoreDelta::Stats(_) => false,
            StoreDelta::Row(_) => true,
            StoreDelta::Structure => {
                self.list.invalidate_cache();
                true
            }
        }
    }

    fn navigate(&mut self, up: bool) -> bool {
        match self.view_state {
            ViewState::ContainerList => {
                let projection = self.store.projection().to_vec();
                if up {
                    self.list.select_previous(&projection);
                } else {
                    self.list.select_next(&projection);
                }
                true
            }
            ViewState::LogView(_) => match &mut self.log {
                Some(log) => {
                    if up {
                        log.scroll_up();
                    } else {
                        log.scroll_down();
                    }
                    true
                }
                None => false,
            },
            ViewState::Loading => false,
        }
    }

    fn open_log_view(&mut self) -> bool {
        let projection = self.store.projection().to_vec();
        let Some(key) = self.list.selected_key(&projection) else {
            return false;
        };
        let Some(container) = self.store.get(&key) else {
            return false;
        };
        let title = container.name.clone();
        let Some(host) = self.hosts.get(&key.host_id) else {
            return false;
        };

        if let Some(task) = self.log_task.take() {
            task.abort();
        }
        self.log_task = Some(tokio::spawn(docker_repo::stream_logs(
            host.clone(),
            key.container_id.clone(),
            self.tx.clone(),
        )));
        self.log = Some(LogView::new(key.clone(), title));
        self.view_state = ViewState::LogView(key);
        true
    }

    fn close_log_view(&mut self) {
        if let Some(task) = self.log_task.take() {
            task.abort();
        }
        self.log = None;
        self.view_state = ViewState::ContainerList;
    }

    /// `o` on a row with a Dozzle URL. Impossible actions are silent.
    fn open_dozzle(&mut self) {
        if !self.open_allowed || self.view_state != ViewState::ContainerList {
            return;
        }
        let projection = self.store.projection().to_vec();
        let Some(key) = self.list.selected_key(&projection) else {
            return;
        };
        let Some(base) = self.store.get(&key).and_then(|c| c.dozzle_url.clone()) else {
            return;
        };
        let url = format!("{}/container/{}", base.trim_end_matches('/'), key.container_id);
        open_url(&url);
    }

    /// Stop the on-demand log stream; watcher tasks observe the dropped
    /// receiver instead.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.log_task.take() {
            task.abort();
        }
    }
}

fn open_url(url: &str) {
    #[cfg(target_os = "macos")]
    let mut command = std::process::Command::new("open");
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start"]);
        c
    };
    #[cfg(all(unix, not(target_os = "macos")))]
    let mut command = std::process::Command::new("xdg-open");

    let _ = command
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
}

/// Drive the UI until quit: wait for one event with the remaining slice of
/// the render interval, drain whatever else is pending, then redraw when
/// forced or due.
pub async fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    rx: &mut EventReceiver,
    app: &mut App,
) -> io::Result<QuitReason> {
    let styles = UiStyles::default();
    let mut last_render = Instant::now() - RENDER_INTERVAL;

    loop {
        let timeout = RENDER_INTERVAL
            .saturating_sub(last_render.elapsed())
            .max(MIN_RECEIVE_TIMEOUT);

        let mut force_render = false;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(event)) => {
                force_render |= app.handle_event(event);
                while let Ok(event) = rx.try_recv() {
                    force_render |= app.handle_event(event);
                }
            }
            Ok(None) => {
                // Every producer is gone; nothing left to show
                app.quit.get_or_insert(QuitReason::Key);
            }
            Err(_) => {}
        }

        if app.quit.is_some() {
            break;
        }

        if force_render || last_render.elapsed() >= RENDER_INTERVAL {
            terminal.draw(|f| render_ui(f, app, &styles))?;
            last_render = Instant::now();
        }
    }

    app.shutdown();
    Ok(app.quit.unwrap_or(QuitReason::Key))
}
