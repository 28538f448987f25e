//! Consumer callbacks supplied as a JS object.
//!
//! Recognized keys: `initCallback`, `resizedCallback`, `messageCallback`,
//! `scrollCallback` and `closedCallback`. Missing keys keep the controller's
//! defaults; a callback that throws fails with the thrown message.

use framehost_core::{CallbackError, Position};
use framehost_host::{CallbackResult, Callbacks, MessageEvent, ResizedEvent};
use js_sys::{Function, Object, Reflect};
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};

use crate::element::WebFrame;
use crate::error::{WebError, describe_js};

const INIT: &str = "initCallback";
const RESIZED: &str = "resizedCallback";
const MESSAGE: &str = "messageCallback";
const SCROLL: &str = "scrollCallback";
const CLOSED: &str = "closedCallback";

/// Build [`Callbacks`] from `spec`, which may be `undefined`.
///
/// # Errors
///
/// Fails when `spec` is neither an object nor absent, or a recognized key
/// holds something other than a function.
pub fn from_js(spec: &JsValue) -> Result<Callbacks<WebFrame>, WebError> {
    let mut callbacks = Callbacks::new();
    if spec.is_undefined() || spec.is_null() {
        return Ok(callbacks);
    }
    if !spec.is_object() {
        return Err(WebError::InvalidArgument {
            what: "callbacks",
            reason: "expected an object".to_string(),
        });
    }

    if let Some(f) = function(spec, INIT)? {
        callbacks = callbacks.on_init(move |frame: &WebFrame| {
            call(&f, &JsValue::from(frame.element().clone())).map(drop)
        });
    }
    if let Some(f) = function(spec, RESIZED)? {
        callbacks = callbacks.on_resized(move |event: &ResizedEvent| {
            call(&f, &resized_payload(event)?).map(drop)
        });
    }
    if let Some(f) = function(spec, MESSAGE)? {
        callbacks = callbacks.on_message(move |event: MessageEvent<WebFrame>| {
            let payload = Object::new();
            set(&payload, "iframe", &JsValue::from(event.element.element().clone()))?;
            set(&payload, "message", &to_js_value(&event.message)?)?;
            call(&f, &payload).map(drop)
        });
    }
    if let Some(f) = function(spec, SCROLL)? {
        callbacks = callbacks.on_scroll(move |position: Position| {
            let returned = call(&f, &to_js_value(&position)?)?;
            // Only an explicit `false` vetoes the scroll.
            Ok(returned.as_bool() != Some(false))
        });
    }
    if let Some(f) = function(spec, CLOSED)? {
        callbacks = callbacks.on_closed(move |id| {
            call(&f, &JsValue::from_str(id.as_str())).map(drop)
        });
    }
    Ok(callbacks)
}

fn function(spec: &JsValue, key: &'static str) -> Result<Option<Function>, WebError> {
    let value = Reflect::get(spec, &JsValue::from_str(key))
        .map_err(|e| WebError::js("reading callbacks", &e))?;
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    value
        .dyn_into::<Function>()
        .map(Some)
        .map_err(|_| WebError::InvalidArgument {
            what: key,
            reason: "expected a function".to_string(),
        })
}

fn call(f: &Function, arg: &JsValue) -> CallbackResult<JsValue> {
    f.call1(&JsValue::UNDEFINED, arg)
        .map_err(|e| CallbackError::from(describe_js(&e)))
}

fn set(target: &Object, key: &str, value: &JsValue) -> CallbackResult {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(drop)
        .map_err(|e| CallbackError::from(describe_js(&e)))
}

fn to_js_value<T: Serialize + ?Sized>(value: &T) -> CallbackResult<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| CallbackError::from(e.to_string()))
}

/// `{iframe, frameId, height, width, type}`: the serialized event plus the
/// element itself when it is still in the document.
fn resized_payload(event: &ResizedEvent) -> CallbackResult<JsValue> {
    let payload = to_js_value(event)?;
    let element = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.get_element_by_id(event.frame_id.as_str()));
    if let (Some(element), Some(object)) = (element, payload.dyn_ref::<Object>()) {
        set(object, "iframe", &JsValue::from(element))?;
    }
    Ok(payload)
}
