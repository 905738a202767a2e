// Top-level frame rendering: loading, container list, log view, overlays

use chrono::Local;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use super::app::App;
use super::container_list::render_container_list;
use super::help::render_help;
use crate::models::{LogStream, ViewState};

/// Pre-built styles so rendering does not rebuild them every frame.
pub struct UiStyles {
    pub header: Style,
    pub selected: Style,
    pub border: Style,
    pub low: Style,
    pub medium: Style,
    pub high: Style,
    pub dim: Style,
    pub timestamp: Style,
    pub stderr: Style,
    pub banner: Style,
}

impl Default for UiStyles {
    fn default() -> Self {
        Self {
            header: Style::default().add_modifier(Modifier::BOLD),
            selected: Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::Gray),
            low: Style::default().fg(Color::Green),
            medium: Style::default().fg(Color::Yellow),
            high: Style::default().fg(Color::Red),
            dim: Style::default().fg(Color::DarkGray),
            timestamp: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::DIM),
            stderr: Style::default().fg(Color::LightRed),
            banner: Style::default().fg(Color::Black).bg(Color::Red),
        }
    }
}

pub fn render_ui(f: &mut Frame, app: &mut App, styles: &UiStyles) {
    let area = f.area();

    let banners = app.active_connection_errors();
    let banner_height = banners.len().min(3) as u16;
    let chunks = Layout::vertical([Constraint::Length(banner_height), Constraint::Min(3)])
        .split(area);

    if banner_height > 0 {
        render_banners(f, chunks[0], &banners, styles);
    }
    let body = chunks[1];

    match app.view_state.clone() {
        ViewState::Loading => render_loading(f, body, styles),
        ViewState::ContainerList => {
            let projection = app.store.projection().to_vec();
            app.list.resolve_selection(&projection);
            render_container_list(f, body, &projection, &app.store, &mut app.list, styles);
        }
        ViewState::LogView(_) => render_log_view(f, body, app, styles),
    }

    if app.show_help {
        render_help(f, area, styles);
    }
}

fn render_banners(f: &mut Frame, area: Rect, banners: &[String], styles: &UiStyles) {
    let lines: Vec<Line> = banners
        .iter()
        .take(area.height as usize)
        .map(|msg| Line::from(Span::styled(format!(" {} ", msg), styles.banner)))
        .collect();
    f.render_widget(Paragraph::new(lines), area);
}

fn render_loading(f: &mut Frame, area: Rect, styles: &UiStyles) {
    let block = Block::default()
        .borders(Borders::ALL)
        .style(styles.border);
    let text = Paragraph::new("Connecting to hosts…")
        .style(styles.dim)
        .block(block)
        .centered();
    f.render_widget(text, area);
}

fn render_log_view(f: &mut Frame, area: Rect, app: &mut App, styles: &UiStyles) {
    let Some(log) = app.log.as_mut() else {
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .split(area);

    let mode = if log.auto_scroll() { "auto" } else { "manual" };
    let title = Line::from(vec![
        Span::styled(
            format!(" {} ", log.title),
            styles.header,
        ),
        Span::styled(format!("({}) ", log.key.container_id), styles.dim),
        Span::styled(format!("[{}]", mode), styles.timestamp),
    ]);
    f.render_widget(Paragraph::new(title), chunks[0]);

    let height = chunks[1].height as usize;
    let offset = log.resolve_offset(height);
    let lines: Vec<Line> = log
        .lines()
        .skip(offset)
        .take(height)
        .map(|record| {
            let mut spans = Vec::with_capacity(3);
            if let Some(ts) = record.ts {
                let local = ts.with_timezone(&Local);
                spans.push(Span::styled(
                    local.format("%H:%M:%S ").to_string(),
                    styles.timestamp,
                ));
            }
            let style = match record.stream {
                LogStream::Stderr => styles.stderr,
                LogStream::Stdout => Style::default(),
            };
            spans.push(Span::styled(record.message.clone(), style));
            Line::from(spans)
        })
        .collect();
    f.render_widget(Paragraph::new(lines), chunks[1]);

    let hint = Paragraph::new(" ↑/↓ scroll · esc back · q quit ").style(styles.dim);
    f.render_widget(hint, chunks[2]);
}

/// Centered overlay rect used by popups.
pub(super) fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

pub(super) fn clear_popup(f: &mut Frame, area: Rect) {
    f.render_widget(Clear, area);
}
