//! Browser binding of the framehost controller.
//!
//! Compiled to `wasm32-unknown-unknown`, this crate implements the
//! controller's page traits over `web-sys` ([`WebPage`], [`WebFrame`]) and
//! exports [`FrameHost`] to JavaScript.
//!
//! ## Module Structure
//! - `page`: `HostPage` over the window and document, plus the `parentIFrame` bridge
//! - `element`: `FrameElement` over a DOM element
//! - `callbacks`: consumer callbacks given as a JS object
//! - `frame_host`: the exported controller, its listeners and its scheduling
//! - `error`: binding errors and conversion to thrown JS errors

#![forbid(unsafe_code)]

pub mod callbacks;
pub mod element;
pub mod error;
pub mod frame_host;
pub mod page;

pub use element::WebFrame;
pub use error::WebError;
pub use frame_host::FrameHost;
pub use page::WebPage;

use wasm_bindgen::prelude::*;

/// Module start hook: route Rust panics to the browser console.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}
