//! Errors raised by the browser binding itself.
//!
//! Controller errors cross the JS boundary as `Error` objects carrying the
//! controller's message; binding errors use [`WebError`].

use framehost_core::Error;
use wasm_bindgen::{JsCast, JsValue};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebError {
    #[error("window is not available")]
    WindowNotAvailable,

    #[error("document is not available")]
    DocumentNotAvailable,

    /// The controller is already running a call further up the stack, for
    /// example when a consumer callback calls back into the host.
    #[error("frame host is busy; {0} can not run from inside a callback")]
    Busy(&'static str),

    #[error("frame host has been torn down")]
    TornDown,

    #[error("invalid {what}: {reason}")]
    InvalidArgument { what: &'static str, reason: String },

    #[error("{operation} failed: {reason}")]
    Js { operation: &'static str, reason: String },
}

impl WebError {
    pub(crate) fn js(operation: &'static str, value: &JsValue) -> Self {
        Self::Js {
            operation,
            reason: describe_js(value),
        }
    }
}

impl From<WebError> for JsValue {
    fn from(err: WebError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}

/// Convert a controller error into a thrown JS `Error`.
pub(crate) fn to_js(err: &Error) -> JsValue {
    let js_err = js_sys::Error::new(&err.to_string());
    js_err.set_name(&format!("FrameHost{:?}Error", err.kind()));
    js_err.into()
}

/// Best-effort text of a thrown JS value.
pub(crate) fn describe_js(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{value:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            WebError::Busy("close").to_string(),
            "frame host is busy; close can not run from inside a callback"
        );
        assert_eq!(
            WebError::InvalidArgument {
                what: "options",
                reason: "expected an object".to_string(),
            }
            .to_string(),
            "invalid options: expected an object"
        );
    }
}
