//! Value types shared across the framehost crates.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a managed frame, equal to the frame element's `id` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(String);

impl FrameId {
    /// Create a frame ID from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the ID is empty (element carried no id attribute).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrameId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FrameId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for FrameId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FrameId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Sizing axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Height,
    Width,
}

impl Axis {
    /// CSS property written for this axis.
    #[must_use]
    pub const fn css_property(self) -> &'static str {
        match self {
            Self::Height => "height",
            Self::Width => "width",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Height => write!(f, "Height"),
            Self::Width => write!(f, "Width"),
        }
    }
}

/// Page-absolute scroll position in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Component-wise saturating sum.
    #[must_use]
    pub const fn offset_by(self, other: Self) -> Self {
        Self {
            x: self.x.saturating_add(other.x),
            y: self.y.saturating_add(other.y),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Viewport-relative bounding rectangle, as reported by the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Top-left corner truncated to whole pixels.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn origin(&self) -> Position {
        Position::new(self.left.trunc() as i64, self.top.trunc() as i64)
    }
}

/// Applied frame size in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub height: i64,
    pub width: i64,
}

impl Dimensions {
    #[must_use]
    pub const fn new(height: i64, width: i64) -> Self {
        Self { height, width }
    }

    /// Value along `axis`.
    #[must_use]
    pub const fn get(&self, axis: Axis) -> i64 {
        match axis {
            Axis::Height => self.height,
            Axis::Width => self.width,
        }
    }

    /// Copy with `axis` replaced by `value`.
    #[must_use]
    pub const fn with(self, axis: Axis, value: i64) -> Self {
        match axis {
            Axis::Height => Self {
                height: value,
                ..self
            },
            Axis::Width => Self {
                width: value,
                ..self
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_serializes_as_plain_string() {
        let id = FrameId::new("pixlee_widget_iframe1");
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, "\"pixlee_widget_iframe1\"");
    }

    #[test]
    fn test_rect_origin_truncates() {
        let rect = Rect::new(10.9, -3.7, 100.0, 50.0);
        assert_eq!(rect.origin(), Position::new(10, -3));
        assert!((rect.bottom() - 46.3).abs() < f64::EPSILON * 100.0);
    }

    #[test]
    fn test_dimensions_with_axis() {
        let dims = Dimensions::new(100, 200).with(Axis::Width, 300);
        assert_eq!(dims.get(Axis::Width), 300);
        assert_eq!(dims.get(Axis::Height), 100);
    }

    #[test]
    fn test_position_offset_saturates() {
        let p = Position::new(i64::MAX, 1).offset_by(Position::new(5, 2));
        assert_eq!(p, Position::new(i64::MAX, 3));
    }
}
