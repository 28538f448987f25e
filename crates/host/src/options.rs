//! Per-frame options and consumer callbacks.
//!
//! Options are plain data merged over a fixed default set. Callbacks are not
//! serializable, so they travel separately through the [`Callbacks`] builder.

use std::fmt;
use std::rc::Rc;

use framehost_core::{Axis, CallbackError, Dimensions, Error, FrameId, Position, Result};
use framehost_protocol::{HeightCalculationMethod, InitHandshake};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body margin as integrators pass it: a pixel count or a CSS string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BodyMargin {
    Pixels(i64),
    Css(String),
}

/// Resolved options for one frame.
///
/// Every key is optional; unknown keys are ignored. Upper bounds of `None`
/// mean unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameOptions {
    pub auto_resize: bool,
    pub body_background: Option<String>,
    pub body_margin: Option<BodyMargin>,
    #[serde(rename = "bodyMarginV1")]
    pub body_margin_v1: i64,
    pub body_padding: Option<String>,
    pub check_origin: bool,
    pub enable_in_page_links: bool,
    pub enable_public_methods: bool,
    pub height_calculation_method: HeightCalculationMethod,
    pub interval: i64,
    pub log: bool,
    pub max_height: Option<i64>,
    pub max_width: Option<i64>,
    pub min_height: i64,
    pub min_width: i64,
    pub scrolling: bool,
    pub size_height: bool,
    pub size_width: bool,
    pub tolerance: i64,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            auto_resize: true,
            body_background: None,
            body_margin: None,
            body_margin_v1: 8,
            body_padding: None,
            check_origin: true,
            enable_in_page_links: false,
            enable_public_methods: false,
            height_calculation_method: HeightCalculationMethod::Offset,
            interval: 32,
            log: false,
            max_height: None,
            max_width: None,
            min_height: 0,
            min_width: 0,
            scrolling: false,
            size_height: true,
            size_width: false,
            tolerance: 0,
        }
    }
}

impl FrameOptions {
    /// Merge a JSON options object over the defaults.
    ///
    /// `null` yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OptionsNotObject`] for any other non-object value and
    /// [`Error::InvalidConfig`] when a recognized key has the wrong type.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(_) => serde_json::from_value(value.clone())
                .map_err(|e| Error::invalid_config(e.to_string())),
            _ => Err(Error::OptionsNotObject),
        }
    }

    /// Set both height bounds.
    #[must_use]
    pub const fn height_bounds(mut self, min: i64, max: Option<i64>) -> Self {
        self.min_height = min;
        self.max_height = max;
        self
    }

    /// Set both width bounds.
    #[must_use]
    pub const fn width_bounds(mut self, min: i64, max: Option<i64>) -> Self {
        self.min_width = min;
        self.max_width = max;
        self
    }

    /// Enable protocol tracing for this frame.
    #[must_use]
    pub const fn logging(mut self, enabled: bool) -> Self {
        self.log = enabled;
        self
    }

    #[must_use]
    pub const fn check_origin(mut self, enabled: bool) -> Self {
        self.check_origin = enabled;
        self
    }

    #[must_use]
    pub const fn sizing(mut self, height: bool, width: bool) -> Self {
        self.size_height = height;
        self.size_width = width;
        self
    }

    #[must_use]
    pub fn calculation_method(mut self, method: HeightCalculationMethod) -> Self {
        self.height_calculation_method = method;
        self
    }

    /// Lower and upper bound along `axis`.
    #[must_use]
    pub const fn bounds(&self, axis: Axis) -> (i64, Option<i64>) {
        match axis {
            Axis::Height => (self.min_height, self.max_height),
            Axis::Width => (self.min_width, self.max_width),
        }
    }

    /// Check `min <= max` on both axes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] for the first axis that violates it.
    pub fn validate(&self) -> Result<()> {
        for axis in [Axis::Height, Axis::Width] {
            match self.bounds(axis) {
                (min, Some(max)) if min > max => {
                    return Err(Error::invalid_bounds(axis, min, max));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Whether `axis` is written to the element on resize.
    #[must_use]
    pub const fn sizes(&self, axis: Axis) -> bool {
        match axis {
            Axis::Height => self.size_height,
            Axis::Width => self.size_width,
        }
    }

    /// Body margin in both wire forms: the integer older frame agents read
    /// and the CSS string newer ones read.
    ///
    /// A numeric margin (or the string `"0"`) drives both; any other CSS
    /// string leaves the integer at `bodyMarginV1`.
    #[must_use]
    pub fn resolved_body_margin(&self) -> (i64, Option<String>) {
        match &self.body_margin {
            Some(BodyMargin::Pixels(px)) => (*px, Some(format!("{px}px"))),
            Some(BodyMargin::Css(css)) if css == "0" => (0, Some("0px".to_string())),
            Some(BodyMargin::Css(css)) => (self.body_margin_v1, Some(css.clone())),
            None => (self.body_margin_v1, None),
        }
    }

    /// Init handshake announcing these options to frame `frame_id`.
    #[must_use]
    pub fn handshake(&self, frame_id: &FrameId) -> InitHandshake {
        let (body_margin_v1, body_margin) = self.resolved_body_margin();
        InitHandshake {
            frame_id: frame_id.clone(),
            body_margin_v1,
            size_width: self.size_width,
            log: self.log,
            interval: self.interval,
            enable_public_methods: self.enable_public_methods,
            auto_resize: self.auto_resize,
            body_margin,
            height_calculation_method: self.height_calculation_method.clone(),
            body_background: self.body_background.clone(),
            body_padding: self.body_padding.clone(),
            tolerance: self.tolerance,
            enable_in_page_links: self.enable_in_page_links,
        }
    }
}

/// Snapshot handed to the resized callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizedEvent {
    pub frame_id: FrameId,
    pub height: i64,
    pub width: i64,
    /// Wire type of the message that caused the resize.
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResizedEvent {
    pub fn new(frame_id: FrameId, dimensions: Dimensions, kind: impl Into<String>) -> Self {
        Self {
            frame_id,
            height: dimensions.height,
            width: dimensions.width,
            kind: kind.into(),
        }
    }
}

/// Argument of the message callback.
#[derive(Debug, Clone)]
pub struct MessageEvent<E> {
    pub element: E,
    pub message: Value,
}

/// Result returned by consumer callbacks.
pub type CallbackResult<T = ()> = std::result::Result<T, CallbackError>;

type ClosedFn = dyn Fn(&FrameId) -> CallbackResult;
type InitFn<E> = dyn Fn(&E) -> CallbackResult;
type MessageFn<E> = dyn Fn(MessageEvent<E>) -> CallbackResult;
type ResizedFn = dyn Fn(&ResizedEvent) -> CallbackResult;
type ScrollFn = dyn Fn(Position) -> CallbackResult<bool>;

/// Consumer callbacks for one frame. Every callback defaults to a no-op;
/// `scroll` defaults to allowing the scroll.
pub struct Callbacks<E> {
    closed: Rc<ClosedFn>,
    init: Rc<InitFn<E>>,
    message: Rc<MessageFn<E>>,
    resized: Rc<ResizedFn>,
    scroll: Rc<ScrollFn>,
}

impl<E> Clone for Callbacks<E> {
    fn clone(&self) -> Self {
        Self {
            closed: Rc::clone(&self.closed),
            init: Rc::clone(&self.init),
            message: Rc::clone(&self.message),
            resized: Rc::clone(&self.resized),
            scroll: Rc::clone(&self.scroll),
        }
    }
}

impl<E: 'static> Default for Callbacks<E> {
    fn default() -> Self {
        Self {
            closed: Rc::new(|_| Ok(())),
            init: Rc::new(|_| Ok(())),
            message: Rc::new(|_| Ok(())),
            resized: Rc::new(|_| Ok(())),
            scroll: Rc::new(|_| Ok(true)),
        }
    }
}

impl<E> fmt::Debug for Callbacks<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks").finish_non_exhaustive()
    }
}

impl<E: 'static> Callbacks<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_closed(mut self, f: impl Fn(&FrameId) -> CallbackResult + 'static) -> Self {
        self.closed = Rc::new(f);
        self
    }

    #[must_use]
    pub fn on_init(mut self, f: impl Fn(&E) -> CallbackResult + 'static) -> Self {
        self.init = Rc::new(f);
        self
    }

    #[must_use]
    pub fn on_message(mut self, f: impl Fn(MessageEvent<E>) -> CallbackResult + 'static) -> Self {
        self.message = Rc::new(f);
        self
    }

    #[must_use]
    pub fn on_resized(mut self, f: impl Fn(&ResizedEvent) -> CallbackResult + 'static) -> Self {
        self.resized = Rc::new(f);
        self
    }

    /// Returning `Ok(false)` suppresses the default scroll.
    #[must_use]
    pub fn on_scroll(mut self, f: impl Fn(Position) -> CallbackResult<bool> + 'static) -> Self {
        self.scroll = Rc::new(f);
        self
    }
}

impl<E> Callbacks<E> {
    pub(crate) fn closed(&self, frame_id: &FrameId) -> Result<()> {
        (self.closed)(frame_id).map_err(|e| Error::callback("closed", e))
    }

    pub(crate) fn init(&self, element: &E) -> Result<()> {
        (self.init)(element).map_err(|e| Error::callback("init", e))
    }

    pub(crate) fn message(&self, event: MessageEvent<E>) -> Result<()> {
        (self.message)(event).map_err(|e| Error::callback("message", e))
    }

    pub(crate) fn resized(&self, event: &ResizedEvent) -> Result<()> {
        (self.resized)(event).map_err(|e| Error::callback("resized", e))
    }

    pub(crate) fn scroll(&self, position: Position) -> Result<bool> {
        (self.scroll)(position).map_err(|e| Error::callback("scroll", e))
    }
}
