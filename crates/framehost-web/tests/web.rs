//! Browser tests for the web binding.
//!
//! Run with `wasm-pack test --headless --firefox crates/framehost-web`.

#![cfg(target_arch = "wasm32")]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use framehost_host::{FrameElement, HostPage};
use framehost_web::{FrameHost, WebFrame, WebPage};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{Element, HtmlIFrameElement};

wasm_bindgen_test_configure!(run_in_browser);

fn add_frame(id: &str) -> HtmlIFrameElement {
    let document = web_sys::window().unwrap().document().unwrap();
    let frame: HtmlIFrameElement = document
        .create_element("iframe")
        .unwrap()
        .dyn_into()
        .unwrap();
    frame.set_id(id);
    frame.set_src("about:blank");
    document.body().unwrap().append_child(&frame).unwrap();
    frame
}

#[wasm_bindgen_test]
fn page_finds_frames_by_id_marker() {
    let _a = add_frame("pixlee_widget_iframe_t1");
    let _b = add_frame("pixlee_widget_iframe_t2");
    let page = WebPage::current().unwrap();

    let ids: Vec<String> = page
        .frames_with_id_containing("pixlee_widget_iframe_t")
        .iter()
        .map(FrameElement::id)
        .collect();
    assert_eq!(ids, vec!["pixlee_widget_iframe_t1", "pixlee_widget_iframe_t2"]);
}

#[wasm_bindgen_test]
fn frame_styles_and_detach() {
    let element: Element = add_frame("styled").into();
    let frame = WebFrame::new(element);

    frame.set_style("height", "420px");
    assert_eq!(frame.style("height").as_deref(), Some("420px"));
    assert_eq!(frame.tag_name().as_deref(), Some("IFRAME"));
    assert!(frame.detach());
    assert!(!frame.is_attached());
    assert!(!frame.detach());
}

#[wasm_bindgen_test]
fn host_registers_and_applies_init_size() {
    let frame = add_frame("sized");
    let host = FrameHost::new(JsValue::UNDEFINED).unwrap();

    let ids = host
        .register(JsValue::UNDEFINED, frame.clone().into(), JsValue::UNDEFINED)
        .unwrap();
    assert_eq!(ids.length(), 1);

    let outcome = host
        .deliver("[iFrameSizer]sized:321:0:init", "https://evil.example.com")
        .unwrap();
    assert_eq!(outcome, "failed: protocol");

    // Sandboxed and blank frames report the opaque origin.
    let outcome = host.deliver("[iFrameSizer]sized:321:0:init", "null").unwrap();
    assert_eq!(outcome, "handled");
    assert_eq!(frame.style().get_property_value("height").unwrap(), "321px");

    host.teardown().unwrap();
    assert!(host.frame_ids().is_err());
}

#[wasm_bindgen_test]
fn register_rejects_non_frames() {
    let document = web_sys::window().unwrap().document().unwrap();
    let div = document.create_element("div").unwrap();
    let host = FrameHost::new(JsValue::UNDEFINED).unwrap();

    assert!(host
        .register(JsValue::UNDEFINED, div.into(), JsValue::UNDEFINED)
        .is_err());
    assert!(host
        .register(JsValue::UNDEFINED, JsValue::from_f64(3.0), JsValue::UNDEFINED)
        .is_err());
    host.teardown().unwrap();
}

#[wasm_bindgen_test]
fn embed_builds_widget_frame_fields() {
    let host = FrameHost::new(JsValue::UNDEFINED).unwrap();
    let root = "https://instafeed.pixlee.com/widget";

    let options = js_sys::JSON::parse(r#"{"widgetId":"42","apiKey":"k1"}"#).unwrap();
    let embed = host.embed(options, root).unwrap();
    let id = js_sys::Reflect::get(&embed, &JsValue::from_str("id"))
        .unwrap()
        .as_string()
        .unwrap();
    let src = js_sys::Reflect::get(&embed, &JsValue::from_str("src"))
        .unwrap()
        .as_string()
        .unwrap();
    assert!(id.starts_with("pixlee_widget_iframe"));
    assert!(src.contains("widget_id=42"));
    assert!(src.contains("api_key=k1"));

    // Naming no widget is reported asynchronously, not thrown.
    let nothing = js_sys::JSON::parse("{}").unwrap();
    assert!(host.embed(nothing, root).unwrap().is_null());
    host.teardown().unwrap();
}
