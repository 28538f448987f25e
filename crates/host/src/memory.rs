//! In-memory host page.
//!
//! Deterministic implementation of [`HostPage`] that records every side
//! effect the controller produces: styles, removals, posted messages, scrolls
//! and surfaced errors. Used by the test suites and by `framehost replay`.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use framehost_core::{Error, Position, Rect};

use crate::page::{FrameElement, HostPage, ParentBridge, Viewport};

/// Content-window identity of a [`MemoryFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryWindow(usize);

#[derive(Debug, Default)]
struct ElementState {
    id: String,
    tag: Option<String>,
    name: Option<String>,
    src: String,
    styles: BTreeMap<String, String>,
    scrolling: Option<String>,
    attached: bool,
    rect: Rect,
    inbox: Vec<String>,
}

#[derive(Debug)]
struct PageState {
    elements: Vec<ElementState>,
    scroll: Position,
    scroll_history: Vec<Position>,
    viewport: Viewport,
    nested: bool,
    parent_posts: Vec<String>,
    has_ready_callback: bool,
    ready_calls: usize,
    unhandled: Vec<String>,
    animation_frames: bool,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            scroll: Position::default(),
            scroll_history: Vec::new(),
            viewport: Viewport::new(1280.0, 800.0),
            nested: false,
            parent_posts: Vec::new(),
            has_ready_callback: false,
            ready_calls: 0,
            unhandled: Vec::new(),
            animation_frames: true,
        }
    }
}

/// Call recorded by [`MemoryBridge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCall {
    ScrollTo(i64, i64),
    ScrollToOffset(i64, i64),
    MoveToAnchor(String),
}

/// Recording [`ParentBridge`].
#[derive(Debug, Default)]
pub struct MemoryBridge {
    calls: RefCell<Vec<BridgeCall>>,
}

impl MemoryBridge {
    #[must_use]
    pub fn calls(&self) -> Vec<BridgeCall> {
        self.calls.borrow().clone()
    }
}

impl ParentBridge for MemoryBridge {
    fn scroll_to(&self, x: i64, y: i64) {
        self.calls.borrow_mut().push(BridgeCall::ScrollTo(x, y));
    }

    fn scroll_to_offset(&self, x: i64, y: i64) {
        self.calls.borrow_mut().push(BridgeCall::ScrollToOffset(x, y));
    }

    fn move_to_anchor(&self, hash: &str) {
        self.calls
            .borrow_mut()
            .push(BridgeCall::MoveToAnchor(hash.to_string()));
    }
}

/// In-memory host page. Clones share the same document.
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    state: Rc<RefCell<PageState>>,
    bridge: Option<Rc<MemoryBridge>>,
}

impl MemoryPage {
    /// Top-level page with an 1280x800 viewport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Page that is itself framed. With `bridge`, the enclosing frame runs
    /// the frame-side agent.
    #[must_use]
    pub fn nested(bridge: Option<Rc<MemoryBridge>>) -> Self {
        let page = Self {
            state: Rc::default(),
            bridge,
        };
        page.state.borrow_mut().nested = true;
        page
    }

    /// Disable animation-frame scheduling.
    #[must_use]
    pub fn without_animation_frames(self) -> Self {
        self.state.borrow_mut().animation_frames = false;
        self
    }

    /// Define the embedding page's ready callback.
    #[must_use]
    pub fn with_ready_callback(self) -> Self {
        self.state.borrow_mut().has_ready_callback = true;
        self
    }

    /// Append an `<iframe>` to the document.
    pub fn add_frame(&self, id: &str, src: &str) -> MemoryFrame {
        self.add_element("IFRAME", id, src)
    }

    /// Append an element with an arbitrary tag.
    pub fn add_element(&self, tag: &str, id: &str, src: &str) -> MemoryFrame {
        self.push(ElementState {
            id: id.to_string(),
            tag: Some(tag.to_ascii_uppercase()),
            src: src.to_string(),
            attached: true,
            ..ElementState::default()
        })
    }

    /// A handle that is not a DOM element at all.
    pub fn add_non_element(&self) -> MemoryFrame {
        self.push(ElementState::default())
    }

    /// Append an anchor target with an optional id and name.
    pub fn add_anchor(&self, id: Option<&str>, name: Option<&str>, rect: Rect) {
        self.push(ElementState {
            id: id.unwrap_or_default().to_string(),
            tag: Some("A".to_string()),
            name: name.map(str::to_string),
            attached: true,
            rect,
            ..ElementState::default()
        });
    }

    fn push(&self, element: ElementState) -> MemoryFrame {
        let mut state = self.state.borrow_mut();
        state.elements.push(element);
        MemoryFrame {
            state: Rc::clone(&self.state),
            index: state.elements.len().saturating_sub(1),
        }
    }

    pub fn set_scroll(&self, position: Position) {
        self.state.borrow_mut().scroll = position;
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.state.borrow_mut().viewport = viewport;
    }

    /// Every `scroll_to` applied, oldest first.
    #[must_use]
    pub fn scroll_history(&self) -> Vec<Position> {
        self.state.borrow().scroll_history.clone()
    }

    /// Messages posted one level up, oldest first.
    #[must_use]
    pub fn parent_posts(&self) -> Vec<String> {
        self.state.borrow().parent_posts.clone()
    }

    #[must_use]
    pub fn ready_calls(&self) -> usize {
        self.state.borrow().ready_calls
    }

    /// Errors handed to the unhandled-error path, rendered.
    #[must_use]
    pub fn unhandled_errors(&self) -> Vec<String> {
        self.state.borrow().unhandled.clone()
    }

    /// Content window of `frame`.
    #[must_use]
    pub const fn window_of(frame: &MemoryFrame) -> MemoryWindow {
        MemoryWindow(frame.index)
    }

    fn handle(&self, index: usize) -> MemoryFrame {
        MemoryFrame {
            state: Rc::clone(&self.state),
            index,
        }
    }

    fn find(&self, mut predicate: impl FnMut(&ElementState) -> bool) -> Vec<MemoryFrame> {
        let indices: Vec<usize> = self
            .state
            .borrow()
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| el.attached && predicate(el))
            .map(|(index, _)| index)
            .collect();
        indices.into_iter().map(|index| self.handle(index)).collect()
    }
}

fn is_frame(element: &ElementState) -> bool {
    element.tag.as_deref() == Some("IFRAME")
}

impl HostPage for MemoryPage {
    type Element = MemoryFrame;

    fn element_by_id(&self, id: &str) -> Option<MemoryFrame> {
        if id.is_empty() {
            return None;
        }
        self.find(|el| el.id == id).into_iter().next()
    }

    /// Supports `*`, a bare tag, `#id`, `tag#id` and `tag[id*=marker]`.
    fn query_selector_all(&self, selector: &str) -> Vec<MemoryFrame> {
        let selector = selector.trim();
        if selector == "*" {
            return self.find(|el| el.tag.is_some());
        }
        if let Some((tag, rest)) = selector.split_once("[id*=") {
            let marker = rest.trim_end_matches(']').trim_matches('"').to_string();
            let tag = tag.to_ascii_uppercase();
            return self.find(|el| {
                (tag.is_empty() || el.tag.as_deref() == Some(tag.as_str())) && el.id.contains(&marker)
            });
        }
        if let Some((tag, id)) = selector.split_once('#') {
            let tag = tag.to_ascii_uppercase();
            return self.find(|el| {
                el.id == id && (tag.is_empty() || el.tag.as_deref() == Some(tag.as_str()))
            });
        }
        let tag = selector.to_ascii_uppercase();
        self.find(|el| el.tag.as_deref() == Some(tag.as_str()))
    }

    fn frames_with_id_containing(&self, marker: &str) -> Vec<MemoryFrame> {
        self.find(|el| is_frame(el) && el.id.contains(marker))
    }

    fn all_frames(&self) -> Vec<MemoryFrame> {
        self.find(is_frame)
    }

    fn anchor_rect(&self, anchor: &str) -> Option<Rect> {
        let state = self.state.borrow();
        let attached = || state.elements.iter().filter(|el| el.attached);
        attached()
            .find(|el| !anchor.is_empty() && el.id == anchor)
            .or_else(|| attached().find(|el| el.name.as_deref() == Some(anchor)))
            .map(|el| el.rect)
    }

    fn scroll_offset(&self) -> Position {
        self.state.borrow().scroll
    }

    fn scroll_to(&self, position: Position) {
        let mut state = self.state.borrow_mut();
        state.scroll = position;
        state.scroll_history.push(position);
    }

    fn viewport(&self) -> Viewport {
        self.state.borrow().viewport
    }

    fn is_nested(&self) -> bool {
        self.state.borrow().nested
    }

    fn parent_bridge(&self) -> Option<&dyn ParentBridge> {
        self.bridge
            .as_deref()
            .map(|bridge| bridge as &dyn ParentBridge)
    }

    fn post_to_parent(&self, message: &str) {
        self.state
            .borrow_mut()
            .parent_posts
            .push(message.to_string());
    }

    fn invoke_ready_callback(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.has_ready_callback {
            state.ready_calls = state.ready_calls.saturating_add(1);
            true
        } else {
            false
        }
    }

    fn report_unhandled(&self, error: &Error) {
        self.state.borrow_mut().unhandled.push(error.to_string());
    }

    fn supports_animation_frame(&self) -> bool {
        self.state.borrow().animation_frames
    }
}

/// Element handle inside a [`MemoryPage`].
#[derive(Debug, Clone)]
pub struct MemoryFrame {
    state: Rc<RefCell<PageState>>,
    index: usize,
}

impl MemoryFrame {
    fn with<R>(&self, f: impl FnOnce(&ElementState) -> R) -> Option<R> {
        self.state.borrow().elements.get(self.index).map(f)
    }

    fn with_mut<R>(&self, f: impl FnOnce(&mut ElementState) -> R) -> Option<R> {
        self.state.borrow_mut().elements.get_mut(self.index).map(f)
    }

    /// Messages posted to the content window, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.with(|el| el.inbox.clone()).unwrap_or_default()
    }

    pub fn clear_messages(&self) {
        self.with_mut(|el| el.inbox.clear());
    }

    pub fn set_rect(&self, rect: Rect) {
        self.with_mut(|el| el.rect = rect);
    }

    #[must_use]
    pub fn scrolling(&self) -> Option<String> {
        self.with(|el| el.scrolling.clone()).flatten()
    }

    #[must_use]
    pub fn window(&self) -> MemoryWindow {
        MemoryPage::window_of(self)
    }
}

impl FrameElement for MemoryFrame {
    type Window = MemoryWindow;

    fn id(&self) -> String {
        self.with(|el| el.id.clone()).unwrap_or_default()
    }

    fn set_id(&self, id: &str) {
        self.with_mut(|el| el.id = id.to_string());
    }

    fn tag_name(&self) -> Option<String> {
        self.with(|el| el.tag.clone()).flatten()
    }

    fn src(&self) -> String {
        self.with(|el| el.src.clone()).unwrap_or_default()
    }

    fn set_style(&self, property: &str, value: &str) {
        self.with_mut(|el| el.styles.insert(property.to_string(), value.to_string()));
    }

    fn style(&self, property: &str) -> Option<String> {
        self.with(|el| el.styles.get(property).cloned()).flatten()
    }

    fn set_scrolling(&self, value: &str) {
        self.with_mut(|el| el.scrolling = Some(value.to_string()));
    }

    fn is_attached(&self) -> bool {
        self.with(|el| el.attached).unwrap_or(false)
    }

    fn detach(&self) -> bool {
        self.with_mut(|el| std::mem::replace(&mut el.attached, false))
            .unwrap_or(false)
    }

    fn post_message(&self, message: &str) -> Result<(), Error> {
        self.with_mut(|el| {
            if el.attached {
                el.inbox.push(message.to_string());
                Ok(())
            } else {
                Err(Error::page_operation(
                    "postMessage",
                    format!("frame ({}) has no content window", el.id),
                ))
            }
        })
        .unwrap_or_else(|| Err(Error::page_operation("postMessage", "unknown element")))
    }

    fn bounding_rect(&self) -> Rect {
        self.with(|el| el.rect).unwrap_or_default()
    }

    fn owns_window(&self, window: &MemoryWindow) -> bool {
        window.0 == self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detach_removes_from_queries() {
        let page = MemoryPage::new();
        let frame = page.add_frame("f1", "https://a.example.com/x");
        assert_eq!(page.all_frames().len(), 1);
        assert!(frame.detach());
        assert!(!frame.detach());
        assert!(page.all_frames().is_empty());
        assert!(page.element_by_id("f1").is_none());
        assert!(frame.post_message("x").is_err());
    }

    #[test]
    fn test_selectors() {
        let page = MemoryPage::new();
        page.add_frame("pixlee_widget_iframe1", "");
        page.add_frame("other", "");
        page.add_element("div", "box", "");

        assert_eq!(page.query_selector_all("iframe").len(), 2);
        assert_eq!(page.query_selector_all("#box").len(), 1);
        assert_eq!(page.query_selector_all("iframe#other").len(), 1);
        assert_eq!(
            page.query_selector_all("iframe[id*=pixlee_widget_iframe]").len(),
            1
        );
        assert_eq!(page.frames_with_id_containing("pixlee").len(), 1);
    }

    #[test]
    fn test_anchor_lookup_prefers_id_then_name() {
        let page = MemoryPage::new();
        page.add_anchor(None, Some("reviews"), Rect::new(0.0, 900.0, 10.0, 10.0));
        page.add_anchor(Some("reviews"), None, Rect::new(0.0, 300.0, 10.0, 10.0));
        assert_eq!(page.anchor_rect("reviews").map(|r| r.top), Some(300.0));
        assert!(page.anchor_rect("missing").is_none());
    }

    #[test]
    fn test_windows_identify_frames() {
        let page = MemoryPage::new();
        let a = page.add_frame("a", "");
        let b = page.add_frame("b", "");
        assert!(a.owns_window(&a.window()));
        assert!(!b.owns_window(&a.window()));
    }
}
