//! The host document as the controller sees it.
//!
//! Everything the controller does to the DOM goes through [`FrameElement`] and
//! [`HostPage`]. `framehost-web` implements them over `web-sys`;
//! [`crate::MemoryPage`] implements them in memory for tests and replays.

use framehost_core::{Error, Position, Rect};

/// A frame element on the host page.
///
/// Handles are cheap to clone and refer to the same underlying element, the
/// way a DOM node reference does. The element is referenced, never owned.
pub trait FrameElement: Clone {
    /// Identity of the element's content window, used to match an
    /// event-channel message back to the frame that sent it.
    type Window;

    /// Current `id` attribute; empty when absent.
    fn id(&self) -> String;

    fn set_id(&self, id: &str);

    /// Upper-case tag name, or `None` when the object is not an element.
    fn tag_name(&self) -> Option<String>;

    /// Current `src` attribute.
    fn src(&self) -> String;

    /// Write an inline style property, e.g. (`"height"`, `"500px"`).
    fn set_style(&self, property: &str, value: &str);

    /// Read back an inline style property.
    fn style(&self, property: &str) -> Option<String>;

    /// Set the legacy `scrolling` attribute.
    fn set_scrolling(&self, value: &str);

    /// Whether the element is still in the document.
    fn is_attached(&self) -> bool;

    /// Remove the element from its parent. Returns `false` if it was not attached.
    fn detach(&self) -> bool;

    /// `postMessage(message, "*")` to the content window.
    ///
    /// # Errors
    ///
    /// Fails when the element has no content window (detached or never loaded).
    fn post_message(&self, message: &str) -> Result<(), Error>;

    /// Viewport-relative bounding rectangle.
    fn bounding_rect(&self) -> Rect;

    /// Whether `window` is this element's content window.
    fn owns_window(&self, window: &Self::Window) -> bool;
}

/// Bridge to the frame-side agent of an enclosing frame, present when the
/// host page is itself embedded and runs that agent.
pub trait ParentBridge {
    fn scroll_to(&self, x: i64, y: i64);
    fn scroll_to_offset(&self, x: i64, y: i64);
    fn move_to_anchor(&self, hash: &str);
}

/// Inner size of the host window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// The host document and window.
pub trait HostPage {
    type Element: FrameElement;

    /// `document.getElementById`.
    fn element_by_id(&self, id: &str) -> Option<Self::Element>;

    /// `document.querySelectorAll`. Matches are not necessarily frames.
    fn query_selector_all(&self, selector: &str) -> Vec<Self::Element>;

    /// Frames whose id contains `marker` (`iframe[id*=marker]`), in document order.
    fn frames_with_id_containing(&self, marker: &str) -> Vec<Self::Element>;

    /// Every frame in the document, in document order.
    fn all_frames(&self) -> Vec<Self::Element>;

    /// Bounding rectangle of the first element whose id, or failing that
    /// whose `name`, equals `anchor`.
    fn anchor_rect(&self, anchor: &str) -> Option<Rect>;

    /// Current page scroll offset.
    fn scroll_offset(&self) -> Position;

    fn scroll_to(&self, position: Position);

    fn viewport(&self) -> Viewport;

    /// Whether the host page is itself inside a frame.
    fn is_nested(&self) -> bool;

    /// The enclosing frame's agent, when nested and present.
    fn parent_bridge(&self) -> Option<&dyn ParentBridge>;

    /// Post a string one level up (`window.parent.postMessage(message, "*")`).
    fn post_to_parent(&self, message: &str);

    /// Invoke the embedding page's ready callback if it defines one.
    /// Returns whether a callback ran.
    fn invoke_ready_callback(&self) -> bool;

    /// Hand an error to the platform's unhandled-error path.
    fn report_unhandled(&self, error: &Error);

    /// Whether animation-frame scheduling is available.
    fn supports_animation_frame(&self) -> bool {
        true
    }

    /// Label used in log lines to tell nested hosts apart.
    fn host_label(&self) -> &str {
        if self.is_nested() {
            "Nested host page"
        } else {
            "Host page"
        }
    }
}

/// Window identity type of a page's frame elements.
pub type WindowOf<P> = <<P as HostPage>::Element as FrameElement>::Window;
