//! Widget visibility and infinite-scroll triggers.

use framehost_core::Rect;

use crate::page::Viewport;

/// Whether any part of `rect` is inside `viewport`.
///
/// Vertically the top edge must fall in `[0, height)` or the bottom edge in
/// `(0, height]`; horizontally the same holds for the left and right edges.
#[must_use]
pub fn is_visible(rect: Rect, viewport: Viewport) -> bool {
    let top = rect.top >= 0.0 && rect.top < viewport.height;
    let bottom = rect.bottom() > 0.0 && rect.bottom() <= viewport.height;
    let left = rect.left >= 0.0 && rect.left < viewport.width;
    let right = rect.right() > 0.0 && rect.right() <= viewport.width;
    (top || bottom) && (left || right)
}

/// Whether the page has scrolled close enough to a widget's bottom edge to
/// request more content.
///
/// `bottom` is the widget's page-absolute bottom edge. The trigger line sits
/// `ratio * bottom` above it.
#[must_use]
pub fn needs_more_content(scroll_top: f64, viewport_height: f64, bottom: f64, ratio: f64) -> bool {
    scroll_top + viewport_height >= bottom - bottom * ratio
}

/// Leading-edge throttle: at most one emission per `interval_ms`.
#[derive(Debug, Clone)]
pub struct LoadMoreThrottle {
    interval_ms: u64,
    last_fired: Option<u64>,
}

impl LoadMoreThrottle {
    #[must_use]
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_fired: None,
        }
    }

    /// Claim the slot at `now_ms`. Returns `false` while throttled.
    pub fn try_fire(&mut self, now_ms: u64) -> bool {
        let ready = self
            .last_fired
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.interval_ms);
        if ready {
            self.last_fired = Some(now_ms);
        }
        ready
    }

    pub fn reset(&mut self) {
        self.last_fired = None;
    }
}
