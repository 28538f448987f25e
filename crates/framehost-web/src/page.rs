//! [`HostPage`] over the browser window and document.

use framehost_core::{Error, Position, Rect};
use framehost_host::{HostPage, ParentBridge, Viewport};
use js_sys::{Function, Object, Reflect};
use tracing::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, ErrorEvent, ErrorEventInit, NodeList, Window};

use crate::element::WebFrame;
use crate::error::{WebError, describe_js};

/// Global the embedding page defines to learn that the widgets are ready.
pub const READY_CALLBACK: &str = "PixleeAsyncInit";

/// Global the frame-side agent installs when this page is itself framed.
pub const PARENT_AGENT: &str = "parentIFrame";

/// The current browser page.
#[derive(Debug, Clone)]
pub struct WebPage {
    window: Window,
    document: Document,
    bridge: AgentBridge,
}

impl WebPage {
    /// Bind to the global window and its document.
    ///
    /// # Errors
    ///
    /// Fails outside a browsing context.
    pub fn current() -> Result<Self, WebError> {
        let window = web_sys::window().ok_or(WebError::WindowNotAvailable)?;
        let document = window.document().ok_or(WebError::DocumentNotAvailable)?;
        Ok(Self {
            bridge: AgentBridge {
                window: window.clone(),
            },
            window,
            document,
        })
    }

    #[must_use]
    pub const fn window(&self) -> &Window {
        &self.window
    }

    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// Milliseconds on the page's monotonic clock.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn now_ms(&self) -> u64 {
        self.window
            .performance()
            .map_or_else(js_sys::Date::now, |performance| performance.now())
            .max(0.0) as u64
    }

    fn select(&self, selector: &str) -> Vec<WebFrame> {
        match self.document.query_selector_all(selector) {
            Ok(list) => elements(&list),
            Err(e) => {
                warn!(selector, error = %describe_js(&e), "Selector rejected");
                Vec::new()
            }
        }
    }
}

fn elements(list: &NodeList) -> Vec<WebFrame> {
    (0..list.length())
        .filter_map(|index| list.get(index))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .map(WebFrame::new)
        .collect()
}

fn rect_of(element: &Element) -> Rect {
    let rect = element.get_bounding_client_rect();
    Rect::new(rect.left(), rect.top(), rect.width(), rect.height())
}

/// `iframe[id*="marker"]`, with quotes and backslashes in the marker escaped.
pub(crate) fn frames_selector(marker: &str) -> String {
    let escaped = marker.replace('\\', "\\\\").replace('"', "\\\"");
    format!("iframe[id*=\"{escaped}\"]")
}

#[allow(clippy::cast_possible_truncation)]
fn to_px(value: f64) -> i64 {
    value.round() as i64
}

impl HostPage for WebPage {
    type Element = WebFrame;

    fn element_by_id(&self, id: &str) -> Option<WebFrame> {
        self.document.get_element_by_id(id).map(WebFrame::new)
    }

    fn query_selector_all(&self, selector: &str) -> Vec<WebFrame> {
        self.select(selector)
    }

    fn frames_with_id_containing(&self, marker: &str) -> Vec<WebFrame> {
        self.select(&frames_selector(marker))
    }

    fn all_frames(&self) -> Vec<WebFrame> {
        self.select("iframe")
    }

    fn anchor_rect(&self, anchor: &str) -> Option<Rect> {
        self.document
            .get_element_by_id(anchor)
            .or_else(|| {
                self.document
                    .get_elements_by_name(anchor)
                    .get(0)
                    .and_then(|node| node.dyn_into::<Element>().ok())
            })
            .map(|element| rect_of(&element))
    }

    fn scroll_offset(&self) -> Position {
        let x = self.window.page_x_offset().unwrap_or_default();
        let y = self.window.page_y_offset().unwrap_or_default();
        Position::new(to_px(x), to_px(y))
    }

    #[allow(clippy::cast_precision_loss)]
    fn scroll_to(&self, position: Position) {
        self.window
            .scroll_to_with_x_and_y(position.x as f64, position.y as f64);
    }

    fn viewport(&self) -> Viewport {
        let read = |value: Result<JsValue, JsValue>| {
            value.ok().and_then(|v| v.as_f64()).unwrap_or_default()
        };
        Viewport::new(read(self.window.inner_width()), read(self.window.inner_height()))
    }

    fn is_nested(&self) -> bool {
        match self.window.top() {
            Ok(Some(top)) => !Object::is(&top, &self.window),
            _ => false,
        }
    }

    fn parent_bridge(&self) -> Option<&dyn ParentBridge> {
        if self.is_nested() && self.bridge.agent().is_some() {
            Some(&self.bridge)
        } else {
            None
        }
    }

    fn post_to_parent(&self, message: &str) {
        let parent = match self.window.parent() {
            Ok(Some(parent)) => parent,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %describe_js(&e), "Parent window not reachable");
                return;
            }
        };
        if let Err(e) = parent.post_message(&JsValue::from_str(message), "*") {
            warn!(error = %describe_js(&e), "Post to parent failed");
        }
    }

    fn invoke_ready_callback(&self) -> bool {
        let Some(callback) = Reflect::get(&self.window, &JsValue::from_str(READY_CALLBACK))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok())
        else {
            return false;
        };
        if let Err(e) = callback.call0(&self.window) {
            warn!(error = %describe_js(&e), "{READY_CALLBACK} threw");
        }
        true
    }

    fn report_unhandled(&self, error: &Error) {
        let message = error.to_string();
        web_sys::console::error_1(&JsValue::from_str(&message));

        let init = ErrorEventInit::new();
        init.set_message(&message);
        match ErrorEvent::new_with_event_init_dict("error", &init) {
            Ok(event) => {
                if let Err(e) = self.window.dispatch_event(&event) {
                    debug!(error = %describe_js(&e), "Error event not dispatched");
                }
            }
            Err(e) => debug!(error = %describe_js(&e), "Error event not created"),
        }
    }
}

/// Calls into the `parentIFrame` agent of the enclosing frame.
#[derive(Debug, Clone)]
struct AgentBridge {
    window: Window,
}

impl AgentBridge {
    fn agent(&self) -> Option<Object> {
        Reflect::get(&self.window, &JsValue::from_str(PARENT_AGENT))
            .ok()
            .and_then(|value| value.dyn_into::<Object>().ok())
    }

    fn call(&self, method: &str, args: &[JsValue]) {
        let Some(agent) = self.agent() else {
            return;
        };
        let function = Reflect::get(&agent, &JsValue::from_str(method))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok());
        let Some(function) = function else {
            warn!(method, "{PARENT_AGENT} has no such method");
            return;
        };
        let args: js_sys::Array = args.iter().collect();
        if let Err(e) = function.apply(&agent, &args) {
            warn!(method, error = %describe_js(&e), "{PARENT_AGENT} call failed");
        }
    }
}

impl ParentBridge for AgentBridge {
    #[allow(clippy::cast_precision_loss)]
    fn scroll_to(&self, x: i64, y: i64) {
        self.call("scrollTo", &[JsValue::from_f64(x as f64), JsValue::from_f64(y as f64)]);
    }

    #[allow(clippy::cast_precision_loss)]
    fn scroll_to_offset(&self, x: i64, y: i64) {
        self.call(
            "scrollToOffset",
            &[JsValue::from_f64(x as f64), JsValue::from_f64(y as f64)],
        );
    }

    fn move_to_anchor(&self, hash: &str) {
        self.call("moveToAnchor", &[JsValue::from_str(hash)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_selector_quotes_marker() {
        assert_eq!(
            frames_selector("pixlee_widget_iframe"),
            r#"iframe[id*="pixlee_widget_iframe"]"#
        );
        assert_eq!(frames_selector(r#"a"b"#), r#"iframe[id*="a\"b"]"#);
    }

    #[test]
    fn test_to_px_rounds() {
        assert_eq!(to_px(10.4), 10);
        assert_eq!(to_px(10.6), 11);
        assert_eq!(to_px(-0.2), 0);
    }
}
