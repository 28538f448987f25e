//! Frame lifecycle states and size-bounds clamping.
//!
//! ```text
//! Unregistered -> Registered -> Initializing -> Ready -> Closed
//!                                   ^             |
//!                                   +-- reload ---+
//! ```
//!
//! Resize, reset and scroll traffic loops on `Ready`. A frame that reloads
//! goes back to `Initializing` until it answers the new handshake. `Closed`
//! is terminal: the record is kept so late messages can be told apart from
//! messages for frames that never existed.

use std::fmt;

use framehost_core::{Axis, Error, Result};
use serde::Serialize;

/// Lifecycle state of a registered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameState {
    Registered,
    Initializing,
    Ready,
    Closed,
}

/// Input to [`FrameState::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The host posted an init handshake (registration or reload).
    InitSent,
    /// The frame answered with an `init` message.
    InitReceived,
    /// Any other size-channel message was processed.
    Message,
    /// A close message, a host close, or removal from the document.
    Closed,
}

impl FrameState {
    /// Transition on `event`. `Closed` absorbs everything.
    #[must_use]
    pub const fn next(self, event: LifecycleEvent) -> Self {
        match (self, event) {
            (Self::Closed, _) | (_, LifecycleEvent::Closed) => Self::Closed,
            (_, LifecycleEvent::InitSent) => Self::Initializing,
            (_, LifecycleEvent::InitReceived) => Self::Ready,
            (state, LifecycleEvent::Message) => state,
        }
    }

    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered => write!(f, "registered"),
            Self::Initializing => write!(f, "initializing"),
            Self::Ready => write!(f, "ready"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Bound that a clamped value was pulled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Min,
    Max,
}

/// Result of [`ensure_in_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clamped {
    pub value: i64,
    pub limit: Option<Limit>,
}

/// Clamp `size` into `[min, max]`; `max = None` is unbounded.
///
/// # Errors
///
/// Returns [`Error::InvalidBounds`] when `min > max`. Registration rejects
/// such options, so this only fires if a record was altered afterwards.
pub fn ensure_in_range(axis: Axis, size: i64, min: i64, max: Option<i64>) -> Result<Clamped> {
    if let Some(max) = max {
        if min > max {
            return Err(Error::invalid_bounds(axis, min, max));
        }
        if size > max {
            return Ok(Clamped {
                value: max,
                limit: Some(Limit::Max),
            });
        }
    }
    if size < min {
        return Ok(Clamped {
            value: min,
            limit: Some(Limit::Min),
        });
    }
    Ok(Clamped {
        value: size,
        limit: None,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_happy_path_transitions() {
        let state = FrameState::Registered
            .next(LifecycleEvent::InitSent)
            .next(LifecycleEvent::InitReceived)
            .next(LifecycleEvent::Message);
        assert_eq!(state, FrameState::Ready);
    }

    #[test]
    fn test_reload_returns_to_initializing() {
        assert_eq!(
            FrameState::Ready.next(LifecycleEvent::InitSent),
            FrameState::Initializing
        );
    }

    #[test]
    fn test_closed_is_terminal() {
        for event in [
            LifecycleEvent::InitSent,
            LifecycleEvent::InitReceived,
            LifecycleEvent::Message,
        ] {
            assert_eq!(FrameState::Closed.next(event), FrameState::Closed);
        }
    }

    #[test]
    fn test_clamp_reports_limit() {
        let clamped = ensure_in_range(Axis::Height, 900, 100, Some(500)).unwrap();
        assert_eq!(clamped.value, 500);
        assert_eq!(clamped.limit, Some(Limit::Max));

        let clamped = ensure_in_range(Axis::Height, 20, 100, None).unwrap();
        assert_eq!(clamped.value, 100);
        assert_eq!(clamped.limit, Some(Limit::Min));
    }

    #[test]
    fn test_clamp_rejects_inverted_bounds() {
        assert!(ensure_in_range(Axis::Width, 1, 10, Some(5)).is_err());
    }

    proptest! {
        #[test]
        fn prop_applied_size_is_clamp(
            min in -1000i64..1000,
            span in 0i64..2000,
            size in -5000i64..5000,
        ) {
            let max = min + span;
            let clamped = ensure_in_range(Axis::Height, size, min, Some(max)).unwrap();
            prop_assert_eq!(clamped.value, size.clamp(min, max));
            prop_assert_eq!(clamped.limit.is_none(), (min..=max).contains(&size));
        }

        #[test]
        fn prop_unbounded_max_only_lifts(min in 0i64..1000, size in -5000i64..5000) {
            let clamped = ensure_in_range(Axis::Width, size, min, None).unwrap();
            prop_assert_eq!(clamped.value, size.max(min));
        }
    }
}
