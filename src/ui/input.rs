// Blocking keyboard worker translating key presses to semantic events

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};

use crate::models::{AppEvent, EventSender, QuitReason, SortField};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Poll the terminal on a dedicated OS thread and forward semantic events.
/// Exits when the event loop drops its receiver.
pub fn keyboard_worker(tx: EventSender) {
    loop {
        if tx.is_closed() {
            return;
        }
        if !event::poll(POLL_INTERVAL).unwrap_or(false) {
            continue;
        }
        let Ok(event) = event::read() else { continue };
        let translated = match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => translate_key(key),
            Event::Resize(_, _) => Some(AppEvent::Resize),
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => Some(AppEvent::NavigateUp),
                MouseEventKind::ScrollDown => Some(AppEvent::NavigateDown),
                _ => None,
            },
            _ => None,
        };
        if let Some(app_event) = translated
            && tx.blocking_send(app_event).is_err()
        {
            return;
        }
    }
}

/// One physical key press becomes at most one semantic event. Navigation
/// keys stay view-agnostic here; the event loop resolves them against the
/// current view.
pub(crate) fn translate_key(key: KeyEvent) -> Option<AppEvent> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(AppEvent::Quit(QuitReason::Interrupt))
        }
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(AppEvent::Quit(QuitReason::Key)),
        KeyCode::Up | KeyCode::Char('k') => Some(AppEvent::NavigateUp),
        KeyCode::Down | KeyCode::Char('j') => Some(AppEvent::NavigateDown),
        KeyCode::Enter => Some(AppEvent::EnterPressed),
        KeyCode::Esc | KeyCode::Left => Some(AppEvent::Back),
        KeyCode::Char('a') | KeyCode::Char('A') => Some(AppEvent::ToggleShowAll),
        KeyCode::Char('o') | KeyCode::Char('O') => Some(AppEvent::OpenDozzle),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(AppEvent::CycleSortField),
        KeyCode::Char('u') | KeyCode::Char('U') => {
            Some(AppEvent::SetSortField(SortField::Uptime))
        }
        KeyCode::Char('n') | KeyCode::Char('N') => Some(AppEvent::SetSortField(SortField::Name)),
        KeyCode::Char('c') | KeyCode::Char('C') => Some(AppEvent::SetSortField(SortField::Cpu)),
        KeyCode::Char('m') | KeyCode::Char('M') => {
            Some(AppEvent::SetSortField(SortField::Memory))
        }
        KeyCode::Char('?') => Some(AppEvent::ToggleHelp),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn ctrl(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn each_key_maps_to_exactly_one_event() {
        assert!(matches!(
            translate_key(key(KeyCode::Char('q'))),
            Some(AppEvent::Quit(QuitReason::Key))
        ));
        assert!(matches!(
            translate_key(ctrl(KeyCode::Char('c'))),
            Some(AppEvent::Quit(QuitReason::Interrupt))
        ));
        assert!(matches!(
            translate_key(key(KeyCode::Up)),
            Some(AppEvent::NavigateUp)
        ));
        assert!(matches!(
            translate_key(key(KeyCode::Char('k'))),
            Some(AppEvent::NavigateUp)
        ));
        assert!(matches!(
            translate_key(key(KeyCode::Esc)),
            Some(AppEvent::Back)
        ));
        assert!(matches!(
            translate_key(key(KeyCode::Char('c'))),
            Some(AppEvent::SetSortField(SortField::Cpu))
        ));
        assert!(matches!(
            translate_key(key(KeyCode::Char('n'))),
            Some(AppEvent::SetSortField(SortField::Name))
        ));
        assert!(translate_key(key(KeyCode::Char('x'))).is_none());
        assert!(translate_key(key(KeyCode::Tab)).is_none());
    }
}
