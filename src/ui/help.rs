// Help overlay

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::render::{UiStyles, centered_rect, clear_popup};

pub fn render_help(f: &mut Frame, area: Rect, styles: &UiStyles) {
    let lines = vec![
        Line::from("Navigation"),
        Line::from("  ↑/k ↓/j     Move selection / scroll logs"),
        Line::from("  Enter       View logs for selected container"),
        Line::from("  Esc / ←     Back to the container list"),
        Line::from(""),
        Line::from("Sorting"),
        Line::from("  u           Sort by uptime (again to flip)"),
        Line::from("  n           Sort by name"),
        Line::from("  c           Sort by CPU"),
        Line::from("  m           Sort by memory"),
        Line::from("  s           Cycle sort field"),
        Line::from(""),
        Line::from("Other"),
        Line::from("  a           Toggle stopped containers"),
        Line::from("  o           Open container in Dozzle"),
        Line::from("  ?           Toggle this help"),
        Line::from("  q / Ctrl-C  Quit"),
    ];

    let height = lines.len() as u16 + 2;
    let popup = centered_rect(46, height, area);
    clear_popup(f, popup);
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .style(styles.border),
    );
    f.render_widget(widget, popup);
}
