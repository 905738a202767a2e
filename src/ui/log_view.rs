// Log viewer state: ring buffer, scroll position, auto-scroll

use std::collections::VecDeque;

use crate::models::{ContainerKey, LogRecord};

/// Oldest lines beyond this are discarded.
pub const LOG_BUFFER_LINES: usize = 5_000;

/// Scrollback state for one container's log stream. Auto-scroll stays
/// engaged while the viewport sits at the bottom; manual scrolling pins the
/// viewport until the user returns to the bottom.
pub struct LogView {
    pub key: ContainerKey,
    pub title: String,
    lines: VecDeque<LogRecord>,
    /// Lines scrolled down from the top of the buffer.
    scroll_offset: usize,
    auto_scroll: bool,
    /// Body height from the last render, for clamping and paging.
    viewport_height: usize,
}

impl LogView {
    pub fn new(key: ContainerKey, title: String) -> Self {
        Self {
            key,
            title,
            lines: VecDeque::with_capacity(256),
            scroll_offset: 0,
            auto_scroll: true,
            viewport_height: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    pub fn lines(&self) -> impl Iterator<Item = &LogRecord> {
        self.lines.iter()
    }

    /// Append one line, discarding the oldest past capacity. A pinned
    /// viewport follows its content when the front of the ring slides.
    pub fn push(&mut self, record: LogRecord) {
        self.lines.push_back(record);
        if self.lines.len() > LOG_BUFFER_LINES {
            self.lines.pop_front();
            if !self.auto_scroll {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
            }
        }
    }

    fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.viewport_height)
    }

    pub fn scroll_up(&mut self) {
        if self.scroll_offset > 0 {
            self.scroll_offset -= 1;
        }
        self.auto_scroll = false;
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = (self.scroll_offset + 1).min(self.max_offset());
        if self.scroll_offset >= self.max_offset() {
            self.auto_scroll = true;
        }
    }

    /// Called at render time with the body height. Returns the first
    /// visible line index: the bottom when auto-scrolling, the clamped
    /// manual position otherwise.
    pub fn resolve_offset(&mut self, viewport_height: usize) -> usize {
        self.viewport_height = viewport_height;
        if self.auto_scroll {
            self.scroll_offset = self.max_offset();
        } else {
            self.scroll_offset = self.scroll_offset.min(self.max_offset());
        }
        self.scroll_offset
    }
}
