//! The JS-facing controller.
//!
//! [`FrameHost`] owns a [`HostController`] over the current page, listens for
//! `message` and `scroll` on the window and `load` on registered frames, and
//! drives the controller's deferred work with `requestAnimationFrame` and
//! `setTimeout`.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use framehost_core::{Error, Result};
use framehost_host::{
    EmbedRequest, FrameHandle, FrameOptions, HostConfig, HostController, InboundMessage,
    MessageOutcome, Target,
};
use gloo_timers::callback::Timeout;
use js_sys::{Array, Object, Reflect};
use tracing::{debug, trace, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, Event, EventTarget, MessageEvent};

use crate::callbacks;
use crate::element::WebFrame;
use crate::error::{WebError, describe_js, to_js};
use crate::page::WebPage;

type Listener = Closure<dyn FnMut(Event)>;

/// A DOM listener that stays registered until it is detached.
struct Attached {
    target: EventTarget,
    event: &'static str,
    listener: Listener,
}

impl Attached {
    fn attach(
        target: EventTarget,
        event: &'static str,
        listener: Listener,
    ) -> std::result::Result<Self, WebError> {
        target
            .add_event_listener_with_callback(event, listener.as_ref().unchecked_ref())
            .map_err(|e| WebError::js("addEventListener", &e))?;
        Ok(Self {
            target,
            event,
            listener,
        })
    }

    fn detach(&self) {
        if let Err(e) = self
            .target
            .remove_event_listener_with_callback(self.event, self.listener.as_ref().unchecked_ref())
        {
            warn!(event = self.event, error = %describe_js(&e), "removeEventListener failed");
        }
    }
}

struct Inner {
    page: WebPage,
    host: RefCell<HostController<WebPage>>,
    listeners: RefCell<Vec<Attached>>,
    /// Frame elements that already have a `load` listener.
    loading: RefCell<Vec<Element>>,
    frame_requested: Cell<bool>,
    timer: RefCell<Option<Timeout>>,
    timer_due: Cell<Option<u64>>,
    torn_down: Cell<bool>,
}

impl Inner {
    fn with_host<T>(
        &self,
        call: &'static str,
        f: impl FnOnce(&mut HostController<WebPage>) -> T,
    ) -> std::result::Result<T, WebError> {
        if self.torn_down.get() {
            return Err(WebError::TornDown);
        }
        let mut host = self
            .host
            .try_borrow_mut()
            .map_err(|_| WebError::Busy(call))?;
        Ok(f(&mut host))
    }

    /// Arrange for whatever the controller deferred to run.
    fn pump(self: &Rc<Self>) {
        let Ok(host) = self.host.try_borrow() else {
            return;
        };
        let wants_frame = host.needs_animation_frame();
        let due = host.next_timer_due();
        drop(host);

        if wants_frame && !self.frame_requested.get() {
            self.request_frame();
        }
        if let Some(due) = due {
            self.arm_timer(due);
        }
    }

    fn request_frame(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        let callback = Closure::once_into_js(move |_timestamp: f64| {
            if let Some(inner) = weak.upgrade() {
                inner.frame_requested.set(false);
                inner.run_animation_frame();
            }
        });
        match self
            .page
            .window()
            .request_animation_frame(callback.unchecked_ref())
        {
            Ok(_) => self.frame_requested.set(true),
            Err(e) => {
                warn!(error = %describe_js(&e), "requestAnimationFrame failed; running now");
                self.run_animation_frame();
            }
        }
    }

    fn run_animation_frame(self: &Rc<Self>) {
        match self.with_host("animation frame", HostController::run_animation_frame) {
            Ok(ran) => trace!(ran, "Animation frame tasks done"),
            Err(e) => debug!(error = %e, "Animation frame skipped"),
        }
        self.pump();
    }

    fn arm_timer(self: &Rc<Self>, due: u64) {
        if self.timer_due.get().is_some_and(|armed| armed <= due) {
            return;
        }
        let delay = u32::try_from(due.saturating_sub(self.page.now_ms())).unwrap_or(u32::MAX);
        let weak = Rc::downgrade(self);
        let timeout = Timeout::new(delay, move || {
            if let Some(inner) = weak.upgrade() {
                inner.timer_due.set(None);
                inner.run_timers();
            }
        });
        self.timer_due.set(Some(due));
        // Replacing a fired timeout only clears an id the browser has already retired.
        *self.timer.borrow_mut() = Some(timeout);
    }

    fn run_timers(self: &Rc<Self>) {
        let now = self.page.now_ms();
        match self.with_host("timer", |host| host.run_timers(now)) {
            Ok(ran) => trace!(ran, "Timer tasks done"),
            Err(e) => debug!(error = %e, "Timers skipped"),
        }
        self.pump();
    }

    fn on_message(self: &Rc<Self>, event: &MessageEvent) {
        let Some(data) = message_text(&event.data()) else {
            return;
        };
        let mut message = InboundMessage::new(data, event.origin());
        if let Some(source) = event.source() {
            message = message.from_window(source);
        }
        match self.with_host("message", |host| host.handle_message(message)) {
            Ok(outcome) => trace!(?outcome, "Message handled"),
            Err(e) => warn!(error = %e, "Message dropped"),
        }
        self.pump();
    }

    fn on_scroll(self: &Rc<Self>) {
        let now = self.page.now_ms();
        if let Err(e) = self.with_host("scroll", |host| host.page_scrolled(now)) {
            debug!(error = %e, "Scroll skipped");
        }
        self.pump();
    }

    fn on_load(self: &Rc<Self>, frame_id: &str) {
        match self.with_host("load", |host| host.frame_loaded(frame_id)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(frame_id, error = %e, "Load event not handled"),
            Err(e) => warn!(frame_id, error = %e, "Load event dropped"),
        }
        self.pump();
    }

    fn listen(
        self: &Rc<Self>,
        target: EventTarget,
        event: &'static str,
        mut handler: impl FnMut(&Rc<Self>, Event) + 'static,
    ) -> std::result::Result<(), WebError> {
        let weak: Weak<Self> = Rc::downgrade(self);
        let listener: Listener = Closure::new(move |event: Event| {
            if let Some(inner) = weak.upgrade() {
                handler(&inner, event);
            }
        });
        let attached = Attached::attach(target, event, listener)?;
        self.listeners.borrow_mut().push(attached);
        Ok(())
    }

    fn watch_load(self: &Rc<Self>, frame_id: &str) -> std::result::Result<(), WebError> {
        let Some(element) = self.page.document().get_element_by_id(frame_id) else {
            return Ok(());
        };
        if !claim_load(&mut self.loading.borrow_mut(), &element) {
            return Ok(());
        }
        let id = frame_id.to_string();
        self.listen(element.into(), "load", move |inner, _| inner.on_load(&id))
    }
}

/// Record `element` as watched for `load`; false if it already is.
///
/// Detached elements are forgotten first, so a frame registered under the id
/// of a closed one still gets its own listener.
fn claim_load(watched: &mut Vec<Element>, element: &Element) -> bool {
    watched.retain(|known| known.is_connected());
    if watched.contains(element) {
        return false;
    }
    watched.push(element.clone());
    true
}

/// Text of a `message` event: strings as-is, anything else as JSON.
fn message_text(data: &JsValue) -> Option<String> {
    if let Some(text) = data.as_string() {
        return Some(text);
    }
    if data.is_undefined() || data.is_null() {
        return None;
    }
    js_sys::JSON::stringify(data).ok().map(String::from)
}

fn target_from_js(target: &JsValue) -> Result<Target<WebFrame>> {
    if target.is_undefined() || target.is_null() {
        return Ok(Target::Default);
    }
    if let Some(selector) = target.as_string() {
        return Ok(Target::Selector(selector));
    }
    WebFrame::from_js(target)
        .map(Target::Element)
        .ok_or(Error::NotAnElement)
}

/// Host-page controller for every managed frame on this page.
///
/// ```js
/// const host = new FrameHost({ subscribed_events: ["photoOpened"] });
/// host.register({ maxHeight: 800 }, "iframe.widget", {
///   resizedCallback: (e) => console.log(e.frameId, e.height),
/// });
/// ```
#[wasm_bindgen]
pub struct FrameHost {
    inner: Rc<Inner>,
}

#[wasm_bindgen]
impl FrameHost {
    /// Start listening on the current page. `config` takes the controller
    /// settings by their snake_case names; omit it for the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> std::result::Result<FrameHost, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            HostConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(|e| WebError::InvalidArgument {
                what: "config",
                reason: e.to_string(),
            })?
        };
        let page = WebPage::current()?;
        let mut host = HostController::new(page.clone(), config);
        host.init();

        let inner = Rc::new(Inner {
            page,
            host: RefCell::new(host),
            listeners: RefCell::new(Vec::new()),
            loading: RefCell::new(Vec::new()),
            frame_requested: Cell::new(false),
            timer: RefCell::new(None),
            timer_due: Cell::new(None),
            torn_down: Cell::new(false),
        });

        let window: EventTarget = inner.page.window().clone().into();
        inner.listen(window.clone(), "message", |inner, event| {
            if let Some(event) = event.dyn_ref::<MessageEvent>() {
                inner.on_message(event);
            }
        })?;
        inner.listen(window, "scroll", |inner, _| inner.on_scroll())?;
        Ok(FrameHost { inner })
    }

    /// Register the frames `target` names: `undefined` for the configured
    /// default selector, a selector string, or an element. Returns the frame
    /// ids.
    pub fn register(
        &self,
        options: JsValue,
        target: JsValue,
        callbacks: JsValue,
    ) -> std::result::Result<Array, JsValue> {
        let options: serde_json::Value =
            serde_wasm_bindgen::from_value(options).map_err(|e| WebError::InvalidArgument {
                what: "options",
                reason: e.to_string(),
            })?;
        let options = FrameOptions::from_json(&options).map_err(|e| to_js(&e))?;
        let target = target_from_js(&target).map_err(|e| to_js(&e))?;
        let callbacks = callbacks::from_js(&callbacks)?;

        let handles = self
            .inner
            .with_host("register", |host| host.register(options, target, callbacks))?
            .map_err(|e| to_js(&e))?;
        for handle in &handles {
            self.inner.watch_load(handle.id().as_str())?;
        }
        self.inner.pump();
        Ok(handles
            .iter()
            .map(|handle| JsValue::from_str(handle.id().as_str()))
            .collect())
    }

    /// Deliver a message by hand, as if posted with this origin and no
    /// source window. Returns how it was handled.
    pub fn deliver(&self, data: &str, origin: &str) -> std::result::Result<String, JsValue> {
        let outcome = self.inner.with_host("deliver", |host| {
            host.handle_message(InboundMessage::new(data, origin))
        })?;
        self.inner.pump();
        Ok(outcome_label(&outcome))
    }

    /// Ask a frame to re-measure and report its size.
    pub fn resize(&self, frame_id: &str) -> std::result::Result<(), JsValue> {
        self.with_handle("resize", frame_id, |handle, host| handle.resize(host))
    }

    /// Reapply a frame's last size and ask it to re-measure.
    pub fn reset(&self, frame_id: &str) -> std::result::Result<(), JsValue> {
        self.with_handle("reset", frame_id, |handle, host| handle.reset(host))
    }

    pub fn close(&self, frame_id: &str) -> std::result::Result<(), JsValue> {
        self.with_handle("close", frame_id, |handle, host| handle.close(host))
    }

    /// Send a JSON-compatible value to a frame's message listener.
    #[wasm_bindgen(js_name = sendMessage)]
    pub fn send_message(&self, frame_id: &str, message: JsValue) -> std::result::Result<(), JsValue> {
        let message: serde_json::Value =
            serde_wasm_bindgen::from_value(message).map_err(|e| WebError::InvalidArgument {
                what: "message",
                reason: e.to_string(),
            })?;
        self.with_handle("sendMessage", frame_id, |handle, host| {
            handle.send_message(host, &message)
        })
    }

    /// Build the id and `src` of a new widget frame from page-style options
    /// (`widgetId`, `apiKey`, `type`, ...). Returns `null` when the build
    /// fails; the failure is reported the way message failures are.
    pub fn embed(&self, options: JsValue, root_url: &str) -> std::result::Result<JsValue, JsValue> {
        let request: EmbedRequest =
            serde_wasm_bindgen::from_value(options).map_err(|e| WebError::InvalidArgument {
                what: "options",
                reason: e.to_string(),
            })?;
        let parent_url = self
            .inner
            .page
            .window()
            .location()
            .href()
            .map_err(|e| WebError::js("location.href", &e))?;
        let embed = self
            .inner
            .with_host("embed", |host| host.embed(&request, root_url, &parent_url))?;
        self.inner.pump();

        let Some(embed) = embed else {
            return Ok(JsValue::NULL);
        };
        let result = Object::new();
        for (key, value) in [("id", embed.id.as_str()), ("src", embed.src.as_str())] {
            Reflect::set(&result, &JsValue::from_str(key), &JsValue::from_str(value))
                .map_err(|e| WebError::js("Reflect.set", &e))?;
        }
        Ok(result.into())
    }

    /// Ids of every active frame.
    #[wasm_bindgen(js_name = frameIds)]
    pub fn frame_ids(&self) -> std::result::Result<Array, JsValue> {
        let ids = self
            .inner
            .with_host("frameIds", |host| host.registry().active_ids())?;
        Ok(ids
            .iter()
            .map(|id| JsValue::from_str(id.as_str()))
            .collect())
    }

    /// Remove every listener, drop pending work and forget all frames.
    pub fn teardown(&self) -> std::result::Result<(), JsValue> {
        self.inner
            .with_host("teardown", HostController::teardown)?;
        self.inner.torn_down.set(true);
        for attached in self.inner.listeners.borrow_mut().drain(..) {
            attached.detach();
        }
        self.inner.loading.borrow_mut().clear();
        self.inner.timer.borrow_mut().take();
        self.inner.timer_due.set(None);
        Ok(())
    }
}

impl FrameHost {
    fn with_handle(
        &self,
        call: &'static str,
        frame_id: &str,
        f: impl FnOnce(&FrameHandle, &mut HostController<WebPage>) -> Result<()>,
    ) -> std::result::Result<(), JsValue> {
        self.inner
            .with_host(call, |host| {
                let handle = host
                    .handle(frame_id)
                    .ok_or_else(|| Error::frame_missing(frame_id))?;
                f(&handle, host)
            })?
            .map_err(|e| to_js(&e))?;
        self.inner.pump();
        Ok(())
    }
}

pub(crate) fn outcome_label(outcome: &MessageOutcome) -> String {
    match outcome {
        MessageOutcome::Ignored => "ignored".to_string(),
        MessageOutcome::Stale => "stale".to_string(),
        MessageOutcome::Handled => "handled".to_string(),
        MessageOutcome::Relayed(_) => "relayed".to_string(),
        MessageOutcome::Failed(kind) => format!("failed: {kind}"),
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

    wasm_bindgen_test_configure!(run_in_browser);

    fn attached_frame(id: &str) -> Element {
        let document = web_sys::window().unwrap().document().unwrap();
        let frame = document.create_element("iframe").unwrap();
        frame.set_id(id);
        document.body().unwrap().append_child(&frame).unwrap();
        frame
    }

    #[wasm_bindgen_test]
    fn replacement_frame_with_a_reused_id_is_watched() {
        let mut watched = Vec::new();
        let first = attached_frame("reused");
        assert!(claim_load(&mut watched, &first));
        assert!(!claim_load(&mut watched, &first));

        first.remove();
        let second = attached_frame("reused");
        assert!(claim_load(&mut watched, &second));
        assert_eq!(watched, vec![second.clone()]);
        second.remove();
    }
}
