//! [`FrameElement`] over a DOM element.

use framehost_core::{Error, Rect};
use framehost_host::FrameElement;
use js_sys::Object;
use tracing::warn;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlElement, HtmlIFrameElement};

use crate::error::describe_js;

/// A DOM element the controller may manage.
///
/// Registration checks the tag, so most instances wrap an `<iframe>`; the
/// wrapper itself accepts any element so that check can happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebFrame {
    element: Element,
}

impl WebFrame {
    #[must_use]
    pub const fn new(element: Element) -> Self {
        Self { element }
    }

    /// Wrap a JS value if it is an element.
    #[must_use]
    pub fn from_js(value: &JsValue) -> Option<Self> {
        value.dyn_ref::<Element>().cloned().map(Self::new)
    }

    #[must_use]
    pub const fn element(&self) -> &Element {
        &self.element
    }

    fn iframe(&self) -> Option<&HtmlIFrameElement> {
        self.element.dyn_ref::<HtmlIFrameElement>()
    }

    fn html(&self) -> Option<&HtmlElement> {
        self.element.dyn_ref::<HtmlElement>()
    }
}

impl FrameElement for WebFrame {
    type Window = Object;

    fn id(&self) -> String {
        self.element.id()
    }

    fn set_id(&self, id: &str) {
        self.element.set_id(id);
    }

    fn tag_name(&self) -> Option<String> {
        Some(self.element.tag_name().to_ascii_uppercase())
    }

    fn src(&self) -> String {
        self.element.get_attribute("src").unwrap_or_default()
    }

    fn set_style(&self, property: &str, value: &str) {
        let Some(html) = self.html() else {
            return;
        };
        if let Err(e) = html.style().set_property(property, value) {
            warn!(frame_id = %self.element.id(), property, error = %describe_js(&e), "Style write rejected");
        }
    }

    fn style(&self, property: &str) -> Option<String> {
        self.html()
            .and_then(|html| html.style().get_property_value(property).ok())
            .filter(|value| !value.is_empty())
    }

    fn set_scrolling(&self, value: &str) {
        if let Err(e) = self.element.set_attribute("scrolling", value) {
            warn!(frame_id = %self.element.id(), error = %describe_js(&e), "Could not set scrolling");
        }
    }

    fn is_attached(&self) -> bool {
        self.element.is_connected()
    }

    fn detach(&self) -> bool {
        if !self.element.is_connected() {
            return false;
        }
        self.element.remove();
        true
    }

    fn post_message(&self, message: &str) -> Result<(), Error> {
        let window = self
            .iframe()
            .and_then(HtmlIFrameElement::content_window)
            .ok_or_else(|| Error::page_operation("postMessage", "frame has no content window"))?;
        window
            .post_message(&JsValue::from_str(message), "*")
            .map_err(|e| Error::page_operation("postMessage", describe_js(&e)))
    }

    fn bounding_rect(&self) -> Rect {
        let rect = self.element.get_bounding_client_rect();
        Rect::new(rect.left(), rect.top(), rect.width(), rect.height())
    }

    fn owns_window(&self, window: &Object) -> bool {
        self.iframe()
            .and_then(HtmlIFrameElement::content_window)
            .is_some_and(|own| Object::is(&own, window))
    }
}
