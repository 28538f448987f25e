//! Lazily captured page scroll position.
//!
//! The offset is read from the page at most once per processing cycle and
//! consumed when a position-affecting operation completes, so several
//! operations in one cycle agree on the same starting point.

use framehost_core::{Position, Rect};

use crate::page::HostPage;

#[derive(Debug, Default)]
pub struct PagePosition {
    cached: Option<Position>,
}

impl PagePosition {
    #[must_use]
    pub const fn new() -> Self {
        Self { cached: None }
    }

    /// Cached offset, reading it from `page` on first use.
    pub fn capture<P: HostPage>(&mut self, page: &P) -> Position {
        *self.cached.get_or_insert_with(|| page.scroll_offset())
    }

    /// Replace the cached offset with a scroll target.
    pub fn set(&mut self, position: Position) {
        self.cached = Some(position);
    }

    #[must_use]
    pub const fn pending(&self) -> Option<Position> {
        self.cached
    }

    /// Scroll `page` to the cached offset and clear it.
    pub fn apply<P: HostPage>(&mut self, page: &P) -> Option<Position> {
        let position = self.cached.take()?;
        page.scroll_to(position);
        Some(position)
    }

    /// Drop the cached offset without scrolling.
    pub fn discard(&mut self) {
        self.cached = None;
    }

    /// Page-absolute position of a viewport rectangle: its truncated origin
    /// plus the page offset.
    pub fn absolute<P: HostPage>(&mut self, page: &P, rect: Rect) -> Position {
        rect.origin().offset_by(self.capture(page))
    }
}
