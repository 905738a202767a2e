// Container table: view model (cursor, row cache) and rendering

use std::collections::HashMap;

use chrono::Utc;
use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Row, Table, TableState};

use super::format::{format_duration, format_rate, hyperlink, meter, truncate};
use super::render::UiStyles;
use crate::models::{Container, ContainerKey, ContainerState, HealthStatus, SortField, SortState};
use crate::store::ContainerStore;
use crate::version;

/// Cursor and per-row string cache for the container table. The cursor
/// tracks a `ContainerKey`, not an index, so rows inserted around the
/// selection do not move it.
pub struct ContainerListView {
    pub table_state: TableState,
    tracked: Option<ContainerKey>,
    row_cache: HashMap<ContainerKey, CachedCells>,
    pub hyperlinks_enabled: bool,
    pub host_count: usize,
}

/// Identity-derived cell text, recomputed only when the column width
/// changes or the row set shifts.
struct CachedCells {
    width: u16,
    name: String,
    id: String,
}

impl ContainerListView {
    pub fn new(hyperlinks_enabled: bool, host_count: usize) -> Self {
        Self {
            table_state: TableState::default(),
            tracked: None,
            row_cache: HashMap::new(),
            hyperlinks_enabled,
            host_count,
        }
    }

    pub fn selected_key(&self, projection: &[ContainerKey]) -> Option<ContainerKey> {
        projection.get(self.table_state.selected()?).cloned()
    }

    pub fn select_previous(&mut self, projection: &[ContainerKey]) {
        if projection.is_empty() {
            return;
        }
        let selected = self.table_state.selected().unwrap_or(0);
        let next = selected.saturating_sub(1);
        self.table_state.select(Some(next));
        self.tracked = projection.get(next).cloned();
    }

    pub fn select_next(&mut self, projection: &[ContainerKey]) {
        if projection.is_empty() {
            return;
        }
        let selected = self.table_state.selected().unwrap_or(0);
        let next = (selected + 1).min(projection.len() - 1);
        self.table_state.select(Some(next));
        self.tracked = projection.get(next).cloned();
    }

    /// Re-anchor the cursor after the projection changed. The tracked key
    /// wins; a vanished key falls back to a clamped index; an empty
    /// projection clears the selection.
    pub fn resolve_selection(&mut self, projection: &[ContainerKey]) {
        if projection.is_empty() {
            self.table_state.select(None);
            self.tracked = None;
            return;
        }
        let index = match &self.tracked {
            Some(key) => match projection.iter().position(|k| k == key) {
                Some(pos) => pos,
                None => {
                    let pos = self
                        .table_state
                        .selected()
                        .unwrap_or(0)
                        .min(projection.len() - 1);
                    self.tracked = Some(projection[pos].clone());
                    pos
                }
            },
            None => {
                self.tracked = Some(projection[0].clone());
                0
            }
        };
        self.table_state.select(Some(index));
    }

    pub fn invalidate_cache(&mut self) {
        self.row_cache.clear();
    }

    fn cells_for<'a>(
        cache: &'a mut HashMap<ContainerKey, CachedCells>,
        container: &Container,
        name_width: u16,
        hyperlinks_enabled: bool,
    ) -> &'a CachedCells {
        let entry = cache.entry(container.key.clone()).or_insert(CachedCells {
            width: 0,
            name: String::new(),
            id: String::new(),
        });
        if entry.width != name_width || entry.id.is_empty() {
            let text = truncate(&container.name, name_width as usize);
            entry.name = match (&container.dozzle_url, hyperlinks_enabled) {
                (Some(base), true) => {
                    let url = format!(
                        "{}/container/{}",
                        base.trim_end_matches('/'),
                        container.key.container_id
                    );
                    hyperlink(&text, &url)
                }
                _ => text,
            };
            entry.id = container.key.container_id.clone();
            entry.width = name_width;
        }
        entry
    }
}

const ICON_WIDTH: u16 = 2;
const ID_WIDTH: u16 = 13;
const STATUS_WIDTH: u16 = 18;
const HOST_WIDTH: u16 = 14;

pub fn render_container_list(
    f: &mut Frame,
    area: Rect,
    projection: &[ContainerKey],
    store: &ContainerStore,
    view: &mut ContainerListView,
    styles: &UiStyles,
) {
    let show_host = view.host_count > 1;
    let fixed = ICON_WIDTH
        + ID_WIDTH
        + STATUS_WIDTH
        + if show_host { HOST_WIDTH } else { 0 }
        // borders plus inter-column spacing
        + 2
        + 8;
    let flexible = area.width.saturating_sub(fixed) / 4;
    let name_width = flexible.max(8);

    let now = Utc::now();
    let hyperlinks_enabled = view.hyperlinks_enabled;
    let rows: Vec<Row> = projection
        .iter()
        .filter_map(|key| store.get(key))
        .map(|c| {
            let cached =
                ContainerListView::cells_for(&mut view.row_cache, c, name_width, hyperlinks_enabled);
            container_row(c, cached, show_host, flexible as usize, now, styles)
        })
        .collect();

    let mut constraints = vec![
        Constraint::Length(ICON_WIDTH),
        Constraint::Min(name_width),
        Constraint::Length(ID_WIDTH),
    ];
    if show_host {
        constraints.push(Constraint::Length(HOST_WIDTH));
    }
    constraints.extend([
        Constraint::Length(flexible.max(12)),
        Constraint::Length(flexible.max(12)),
        Constraint::Length(flexible.max(16)),
        Constraint::Length(STATUS_WIDTH),
    ]);

    let table = Table::new(rows, constraints)
        .header(header_row(store.sort_state(), show_host, styles))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(
                    " {} v{} - {} containers ('?' for help) ",
                    version::NAME,
                    version::VERSION,
                    projection.len()
                ))
                .style(styles.border),
        )
        .row_highlight_style(styles.selected);

    f.render_stateful_widget(table, area, &mut view.table_state);
}

fn container_row<'a>(
    container: &Container,
    cached: &CachedCells,
    show_host: bool,
    bar_width: usize,
    now: chrono::DateTime<Utc>,
    styles: &UiStyles,
) -> Row<'a> {
    let running = container.state.is_running();
    let (icon, icon_style) = state_icon(container, styles);

    let (cpu, mem, net) = if running {
        (
            meter(container.stats.cpu_fraction, bar_width),
            meter(container.stats.mem_fraction, bar_width),
            format!(
                "↑ {:>8}  ↓ {:>8}",
                format_rate(container.stats.tx_bytes_per_sec),
                format_rate(container.stats.rx_bytes_per_sec)
            ),
        )
    } else {
        (String::new(), String::new(), String::new())
    };

    let (status, status_style) = if running {
        let up = container
            .started_at
            .map(|t| format_duration((now - t).num_seconds()))
            .unwrap_or_else(|| "-".to_string());
        (format!("Up {}", up), styles.low)
    } else {
        let ago = container
            .finished_at
            .map(|t| format_duration((now - t).num_seconds()))
            .unwrap_or_else(|| "-".to_string());
        (format!("Exited {} ago", ago), styles.high)
    };

    let mut cells = vec![
        Cell::from(icon).style(icon_style),
        Cell::from(cached.name.clone()),
        Cell::from(cached.id.clone()),
    ];
    if show_host {
        cells.push(Cell::from(container.key.host_id.clone()));
    }
    cells.extend([
        Cell::from(cpu).style(fraction_style(container.stats.cpu_fraction, styles)),
        Cell::from(mem).style(fraction_style(container.stats.mem_fraction, styles)),
        Cell::from(net),
        Cell::from(status).style(status_style),
    ]);

    let mut row = Row::new(cells);
    if container.is_stale(now) {
        row = row.style(Style::default().add_modifier(Modifier::DIM));
    }
    row
}

/// Health badge when a health check is configured, state icon otherwise.
fn state_icon(container: &Container, styles: &UiStyles) -> (&'static str, Style) {
    match container.health {
        HealthStatus::Healthy => return ("✚", styles.low),
        HealthStatus::Unhealthy => return ("!", styles.high),
        HealthStatus::Starting => return ("…", styles.medium),
        HealthStatus::None => {}
    }
    match container.state {
        ContainerState::Running => ("▶", styles.low),
        ContainerState::Paused => ("⏸", styles.medium),
        ContainerState::Exited | ContainerState::Dead => ("⏹", styles.high),
        ContainerState::Created
        | ContainerState::Restarting
        | ContainerState::Removing
        | ContainerState::Unknown => ("◌", styles.dim),
    }
}

fn fraction_style(fraction: f64, styles: &UiStyles) -> Style {
    if fraction > 0.8 {
        styles.high
    } else if fraction > 0.5 {
        styles.medium
    } else {
        styles.low
    }
}

fn header_row(sort: SortState, show_host: bool, styles: &UiStyles) -> Row<'static> {
    let arrow = |field: SortField, title: &str| {
        if sort.field == field {
            format!("{} {}", title, sort.direction.symbol())
        } else {
            title.to_string()
        }
    };

    let mut headers = vec![
        String::new(),
        arrow(SortField::Name, "NAME"),
        "ID".to_string(),
    ];
    if show_host {
        headers.push("HOST".to_string());
    }
    headers.extend([
        arrow(SortField::Cpu, "CPU"),
        arrow(SortField::Memory, "MEMORY"),
        "NETWORK IO".to_string(),
        arrow(SortField::Uptime, "STATUS"),
    ]);

    Row::new(headers).style(styles.header).bottom_margin(1)
}
