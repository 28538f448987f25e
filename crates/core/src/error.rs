//! Error taxonomy for framehost operations.
//!
//! Every failure belongs to exactly one [`ErrorKind`]; the host router decides
//! how to propagate an error from its kind alone:
//!
//! - **Configuration**: fatal, returned synchronously from registration.
//! - **Protocol**: a message referenced a missing frame or came from an
//!   unexpected origin. Reported, never stops the router.
//! - **Decode**: malformed event-channel payload. Dropped silently.
//! - **Application**: a consumer-supplied callback failed. Surfaced through
//!   the platform's unhandled-error path.
//! - **Managed**: raised internally on purpose; surfaced without telemetry.

use std::fmt;

use thiserror::Error;

use crate::types::Axis;

/// Error returned by consumer-supplied callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification used by the propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid options or element at registration time.
    Configuration,
    /// Message for a missing frame or from a rejected origin.
    Protocol,
    /// Undecodable event-channel payload.
    Decode,
    /// A consumer callback failed.
    Application,
    /// Internally raised and intentionally re-thrown.
    Managed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Protocol => write!(f, "protocol"),
            Self::Decode => write!(f, "decode"),
            Self::Application => write!(f, "application"),
            Self::Managed => write!(f, "managed"),
        }
    }
}

/// Core error type for framehost operations.
#[derive(Debug, Error)]
pub enum Error {
    // Configuration errors
    #[error("value for min{axis} can not be greater than max{axis} ({min} > {max})")]
    InvalidBounds { axis: Axis, min: i64, max: i64 },

    #[error("options is not an object")]
    OptionsNotObject,

    #[error("object is not a valid DOM element")]
    NotAnElement,

    #[error("expected <IFRAME> tag, found <{tag}>")]
    UnexpectedTag { tag: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Protocol errors
    #[error("frame ({frame_id}) does not exist on host page")]
    FrameMissing { frame_id: String },

    #[error(
        "unexpected message received from: {origin} for {frame_id}. Message was: {message}. \
         This error can be disabled by adding the checkOrigin: false option"
    )]
    CrossOrigin {
        origin: String,
        frame_id: String,
        message: String,
    },

    #[error("malformed size-channel message: {reason}")]
    MalformedMessage { reason: String },

    #[error("page operation '{operation}' failed: {reason}")]
    PageOperation { operation: String, reason: String },

    // Decode errors
    #[error("undecodable event-channel payload: {reason}")]
    Decode { reason: String },

    // Application errors
    #[error("{callback} callback failed: {source}")]
    Callback {
        callback: &'static str,
        #[source]
        source: CallbackError,
    },

    // Managed errors
    #[error("{0}")]
    Managed(String),
}

impl Error {
    /// Kind of this error, used to pick a propagation path.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBounds { .. }
            | Self::OptionsNotObject
            | Self::NotAnElement
            | Self::UnexpectedTag { .. }
            | Self::InvalidConfig { .. } => ErrorKind::Configuration,
            Self::FrameMissing { .. }
            | Self::CrossOrigin { .. }
            | Self::MalformedMessage { .. }
            | Self::PageOperation { .. } => ErrorKind::Protocol,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Callback { .. } => ErrorKind::Application,
            Self::Managed(_) => ErrorKind::Managed,
        }
    }

    /// Create an invalid bounds error.
    #[must_use]
    pub const fn invalid_bounds(axis: Axis, min: i64, max: i64) -> Self {
        Self::InvalidBounds { axis, min, max }
    }

    /// Create an unexpected tag error.
    pub fn unexpected_tag(tag: impl Into<String>) -> Self {
        Self::UnexpectedTag { tag: tag.into() }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a missing frame error.
    pub fn frame_missing(frame_id: impl Into<String>) -> Self {
        Self::FrameMissing {
            frame_id: frame_id.into(),
        }
    }

    /// Create a cross-origin rejection error.
    pub fn cross_origin(
        origin: impl Into<String>,
        frame_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CrossOrigin {
            origin: origin.into(),
            frame_id: frame_id.into(),
            message: message.into(),
        }
    }

    /// Create a malformed message error.
    pub fn malformed_message(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    /// Create a page operation error.
    pub fn page_operation(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PageOperation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    /// Wrap a failed consumer callback.
    #[must_use]
    pub fn callback(callback: &'static str, source: CallbackError) -> Self {
        Self::Callback { callback, source }
    }

    /// Create a managed error.
    pub fn managed(message: impl Into<String>) -> Self {
        Self::Managed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            Error::invalid_bounds(Axis::Height, 10, 5).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(Error::frame_missing("f1").kind(), ErrorKind::Protocol);
        assert_eq!(
            Error::cross_origin("https://evil.example.com", "f1", "x").kind(),
            ErrorKind::Protocol
        );
        assert_eq!(Error::decode("eof").kind(), ErrorKind::Decode);
        assert_eq!(
            Error::callback("resized", "boom".into()).kind(),
            ErrorKind::Application
        );
        assert_eq!(Error::managed("stop").kind(), ErrorKind::Managed);
    }

    #[test]
    fn test_invalid_bounds_display_names_axis() {
        let err = Error::invalid_bounds(Axis::Width, 300, 200);
        let text = err.to_string();
        assert!(text.contains("minWidth"));
        assert!(text.contains("maxWidth"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_cross_origin_display_mentions_escape_hatch() {
        let err = Error::cross_origin("https://evil.example.com", "f1", "[iFrameSizer]f1:1:1:init");
        let text = err.to_string();
        assert!(text.contains("https://evil.example.com"));
        assert!(text.contains("checkOrigin: false"));
    }

    #[test]
    fn test_callback_error_keeps_source() {
        let err = Error::callback("closed", "consumer bug".into());
        assert!(err.to_string().contains("closed callback failed"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
