//! Size channel: the colon-delimited positional format used for height/width
//! negotiation and lifecycle control between the host and each frame.
//!
//! ```text
//! [iFrameSizer]<frameId>:<height>:<width>:<type>[:<payload>]
//! ```
//!
//! The payload of `message` and `inPageLink` frames is taken verbatim after
//! the four header fields and is never split on `:`, since arbitrary JSON may
//! contain colons.

use std::fmt;

use framehost_core::{Dimensions, FrameId};
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};
use crate::MSG_ID;

/// Message type carried in the fourth size-channel field.
///
/// Anything not listed is a resize request; that fallback is kept as the
/// explicit [`MessageKind::Resize`] variant so older frame-side agents keep
/// working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Close,
    Message,
    ScrollTo,
    ScrollToOffset,
    InPageLink,
    Reset,
    Init,
    /// `"true"` / `"false"`: an init handshake reflected by an intermediate
    /// parent page in nested-frame setups. Recognized and dropped.
    MetaParentEcho(bool),
    /// Any other type string, e.g. `interval`, `mutationObserver`, `resize`.
    Resize(String),
}

impl MessageKind {
    /// Classify a wire type string.
    #[must_use]
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "close" => Self::Close,
            "message" => Self::Message,
            "scrollTo" => Self::ScrollTo,
            "scrollToOffset" => Self::ScrollToOffset,
            "inPageLink" => Self::InPageLink,
            "reset" => Self::Reset,
            "init" => Self::Init,
            "true" => Self::MetaParentEcho(true),
            "false" => Self::MetaParentEcho(false),
            other => Self::Resize(other.to_string()),
        }
    }

    /// Wire type string.
    #[must_use]
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Close => "close",
            Self::Message => "message",
            Self::ScrollTo => "scrollTo",
            Self::ScrollToOffset => "scrollToOffset",
            Self::InPageLink => "inPageLink",
            Self::Reset => "reset",
            Self::Init => "init",
            Self::MetaParentEcho(true) => "true",
            Self::MetaParentEcho(false) => "false",
            Self::Resize(other) => other,
        }
    }

    /// Whether this kind carries a verbatim payload after the header.
    #[must_use]
    pub const fn has_payload(&self) -> bool {
        matches!(self, Self::Message | Self::InPageLink)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// A decoded size-channel message.
///
/// Height and width are kept as sent: for `scrollTo*` they are x/y
/// coordinates, and for meta-parent echoes they are not numbers at all.
/// Use [`SizeMessage::height`] / [`SizeMessage::width`] to read them as numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeMessage {
    pub frame_id: FrameId,
    pub height: String,
    pub width: String,
    pub kind: MessageKind,
    pub payload: Option<String>,
}

impl SizeMessage {
    /// Build an outbound message from numeric dimensions.
    pub fn new(frame_id: impl Into<FrameId>, dimensions: Dimensions, kind: MessageKind) -> Self {
        Self {
            frame_id: frame_id.into(),
            height: dimensions.height.to_string(),
            width: dimensions.width.to_string(),
            kind,
            payload: None,
        }
    }

    /// Attach a verbatim payload.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Whether `raw` carries the size-channel prefix.
    #[must_use]
    pub fn is_size_message(raw: &str) -> bool {
        raw.starts_with(MSG_ID)
    }

    /// Decode a raw transport string.
    ///
    /// Returns `Ok(None)` when the string does not start with the protocol
    /// prefix: such traffic is not for us and has no side effects.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MissingField`] when the header is truncated.
    pub fn decode(raw: &str) -> CodecResult<Option<Self>> {
        let Some(body) = raw.strip_prefix(MSG_ID) else {
            return Ok(None);
        };

        let mut fields = body.splitn(5, ':');
        let frame_id = fields.next().unwrap_or_default();
        let height = fields
            .next()
            .ok_or(CodecError::missing_field("height"))?;
        let width = fields.next().ok_or(CodecError::missing_field("width"))?;
        let kind = MessageKind::from_wire(fields.next().ok_or(CodecError::missing_field("type"))?);
        let payload = if kind.has_payload() {
            Some(fields.next().unwrap_or_default().to_string())
        } else {
            None
        };

        Ok(Some(Self {
            frame_id: FrameId::from(frame_id),
            height: height.to_string(),
            width: width.to_string(),
            kind,
            payload,
        }))
    }

    /// Encode as a transport string; the exact inverse of [`SizeMessage::decode`].
    #[must_use]
    pub fn encode(&self) -> String {
        let header = format!(
            "{MSG_ID}{}:{}:{}:{}",
            self.frame_id,
            self.height,
            self.width,
            self.kind.as_wire()
        );
        match &self.payload {
            Some(payload) => format!("{header}:{payload}"),
            None => header,
        }
    }

    /// Height field as a number.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidNumber`] when the field is not numeric.
    pub fn height(&self) -> CodecResult<i64> {
        parse_number("height", &self.height)
    }

    /// Width field as a number.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidNumber`] when the field is not numeric.
    pub fn width(&self) -> CodecResult<i64> {
        parse_number("width", &self.width)
    }

    /// Both numeric fields.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidNumber`] when either field is not numeric.
    pub fn dimensions(&self) -> CodecResult<Dimensions> {
        Ok(Dimensions::new(self.height()?, self.width()?))
    }
}

/// Parse a numeric field the way the frame-side agent renders it: an empty
/// field reads as zero and fractional values are truncated.
fn parse_number(field: &'static str, raw: &str) -> CodecResult<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(truncate)
        .ok_or_else(|| CodecError::invalid_number(field, raw))
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(value: f64) -> i64 {
    value.trunc() as i64
}

/// Height measurement strategy the frame-side agent uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HeightCalculationMethod {
    BodyOffset,
    BodyScroll,
    DocumentElementOffset,
    DocumentElementScroll,
    Max,
    Min,
    Grow,
    LowestElement,
    TaggedElement,
    #[default]
    Offset,
    Scroll,
    Other(String),
}

impl HeightCalculationMethod {
    /// Wire name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::BodyOffset => "bodyOffset",
            Self::BodyScroll => "bodyScroll",
            Self::DocumentElementOffset => "documentElementOffset",
            Self::DocumentElementScroll => "documentElementScroll",
            Self::Max => "max",
            Self::Min => "min",
            Self::Grow => "grow",
            Self::LowestElement => "lowestElement",
            Self::TaggedElement => "taggedElement",
            Self::Offset => "offset",
            Self::Scroll => "scroll",
            Self::Other(other) => other,
        }
    }

    /// Methods that need a full reset after navigation inside the frame
    /// rather than an incremental resize.
    #[must_use]
    pub const fn requires_reset(&self) -> bool {
        matches!(
            self,
            Self::Max | Self::Scroll | Self::BodyScroll | Self::DocumentElementScroll
        )
    }
}

impl From<String> for HeightCalculationMethod {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "bodyOffset" => Self::BodyOffset,
            "bodyScroll" => Self::BodyScroll,
            "documentElementOffset" => Self::DocumentElementOffset,
            "documentElementScroll" => Self::DocumentElementScroll,
            "max" => Self::Max,
            "min" => Self::Min,
            "grow" => Self::Grow,
            "lowestElement" => Self::LowestElement,
            "taggedElement" => Self::TaggedElement,
            "offset" => Self::Offset,
            "scroll" => Self::Scroll,
            _ => Self::Other(raw),
        }
    }
}

impl From<HeightCalculationMethod> for String {
    fn from(method: HeightCalculationMethod) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for HeightCalculationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of colon-separated fields in an init handshake, frame id included.
pub const INIT_FIELD_COUNT: usize = 13;

/// Init handshake sent from the host to a frame right after registration and
/// again on every load event of the frame element.
///
/// Optional CSS values render as the literal `null`, matching what older
/// frame-side agents expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitHandshake {
    pub frame_id: FrameId,
    pub body_margin_v1: i64,
    pub size_width: bool,
    pub log: bool,
    pub interval: i64,
    pub enable_public_methods: bool,
    pub auto_resize: bool,
    pub body_margin: Option<String>,
    pub height_calculation_method: HeightCalculationMethod,
    pub body_background: Option<String>,
    pub body_padding: Option<String>,
    pub tolerance: i64,
    pub enable_in_page_links: bool,
}

impl InitHandshake {
    /// Encode as a transport string, prefix included.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{MSG_ID}{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}",
            self.frame_id,
            self.body_margin_v1,
            self.size_width,
            self.log,
            self.interval,
            self.enable_public_methods,
            self.auto_resize,
            css_or_null(self.body_margin.as_deref()),
            self.height_calculation_method,
            css_or_null(self.body_background.as_deref()),
            css_or_null(self.body_padding.as_deref()),
            self.tolerance,
            self.enable_in_page_links,
        )
    }

    /// Decode a handshake string, prefix included.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::FieldCount`] when the string does not carry the
    /// prefix and exactly thirteen fields, or a field-level error when a
    /// number or flag does not parse.
    pub fn decode(raw: &str) -> CodecResult<Self> {
        let body = raw.strip_prefix(MSG_ID).ok_or(CodecError::FieldCount {
            expected: INIT_FIELD_COUNT,
            actual: 0,
        })?;
        let fields: Vec<&str> = body.split(':').collect();
        let [
            frame_id,
            body_margin_v1,
            size_width,
            log,
            interval,
            enable_public_methods,
            auto_resize,
            body_margin,
            height_calculation_method,
            body_background,
            body_padding,
            tolerance,
            enable_in_page_links,
        ] = fields.as_slice()
        else {
            return Err(CodecError::FieldCount {
                expected: INIT_FIELD_COUNT,
                actual: fields.len(),
            });
        };

        Ok(Self {
            frame_id: FrameId::from(*frame_id),
            body_margin_v1: parse_integer("bodyMarginV1", body_margin_v1)?,
            size_width: parse_flag("sizeWidth", size_width)?,
            log: parse_flag("log", log)?,
            interval: parse_integer("interval", interval)?,
            enable_public_methods: parse_flag("enablePublicMethods", enable_public_methods)?,
            auto_resize: parse_flag("autoResize", auto_resize)?,
            body_margin: null_or_css(body_margin),
            height_calculation_method: HeightCalculationMethod::from(
                (*height_calculation_method).to_string(),
            ),
            body_background: null_or_css(body_background),
            body_padding: null_or_css(body_padding),
            tolerance: parse_integer("tolerance", tolerance)?,
            enable_in_page_links: parse_flag("enableInPageLinks", enable_in_page_links)?,
        })
    }
}

fn css_or_null(value: Option<&str>) -> &str {
    value.unwrap_or("null")
}

fn null_or_css(raw: &str) -> Option<String> {
    (raw != "null").then(|| raw.to_string())
}

fn parse_integer(field: &'static str, raw: &str) -> CodecResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| CodecError::invalid_number(field, raw))
}

fn parse_flag(field: &'static str, raw: &str) -> CodecResult<bool> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(CodecError::invalid_flag(field, other)),
    }
}

/// Messages the host sends into a frame's content window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostTrigger {
    /// Configuration handshake.
    Init(InitHandshake),
    /// Ask the frame to re-measure after a host-side reset.
    Reset,
    /// Ask the frame to re-measure and report its size.
    Resize,
    /// Application payload for the frame's message listener.
    Message(String),
}

impl HostTrigger {
    /// Encode as a transport string, prefix included.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Init(handshake) => handshake.encode(),
            Self::Reset => format!("{MSG_ID}reset"),
            Self::Resize => format!("{MSG_ID}resize"),
            Self::Message(json) => format!("{MSG_ID}message:{json}"),
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Reset => "reset",
            Self::Resize => "resize",
            Self::Message(_) => "message",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn test_decode_resize() {
        let msg = SizeMessage::decode("[iFrameSizer]f1:900:300:interval")
            .unwrap()
            .unwrap();
        assert_eq!(msg.frame_id.as_str(), "f1");
        assert_eq!(msg.height().unwrap(), 900);
        assert_eq!(msg.width().unwrap(), 300);
        assert_eq!(msg.kind, MessageKind::Resize("interval".to_string()));
        assert_eq!(msg.payload, None);
    }

    #[test]
    fn test_decode_foreign_prefix_is_not_for_us() {
        assert_eq!(SizeMessage::decode("[otherLib]f1:1:1:init").unwrap(), None);
        assert_eq!(SizeMessage::decode("").unwrap(), None);
    }

    #[test]
    fn test_decode_truncated_header() {
        let err = SizeMessage::decode("[iFrameSizer]reset").unwrap_err();
        assert_eq!(err, CodecError::missing_field("height"));
    }

    #[test]
    fn test_message_payload_keeps_colons() {
        let raw = r#"[iFrameSizer]f1:0:0:message:{"url":"https://a.example.com:8080/x"}"#;
        let msg = SizeMessage::decode(raw).unwrap().unwrap();
        assert_eq!(msg.kind, MessageKind::Message);
        assert_eq!(
            msg.payload.as_deref(),
            Some(r#"{"url":"https://a.example.com:8080/x"}"#)
        );
        assert_eq!(msg.encode(), raw);
    }

    #[test]
    fn test_meta_parent_echo_is_recognized() {
        let handshake = "[iFrameSizer]f1:8:false:true:32:true:true:null:offset:null:null:0:false";
        let msg = SizeMessage::decode(handshake).unwrap().unwrap();
        assert_eq!(msg.kind, MessageKind::MetaParentEcho(true));
        assert!(msg.width().is_err());
    }

    #[test]
    fn test_parse_number_rules() {
        assert_eq!(parse_number("height", "").unwrap(), 0);
        assert_eq!(parse_number("height", "12.9").unwrap(), 12);
        assert_eq!(parse_number("height", "-4").unwrap(), -4);
        assert!(parse_number("height", "NaN").is_err());
        assert!(parse_number("height", "tall").is_err());
    }

    #[test]
    fn test_reset_required_methods() {
        for name in ["max", "scroll", "bodyScroll", "documentElementScroll"] {
            assert!(HeightCalculationMethod::from(name.to_string()).requires_reset());
        }
        for name in ["offset", "min", "lowestElement", "custom"] {
            assert!(!HeightCalculationMethod::from(name.to_string()).requires_reset());
        }
    }

    #[test]
    fn test_init_handshake_encoding() {
        let handshake = InitHandshake {
            frame_id: FrameId::from("iFrameResizer0"),
            body_margin_v1: 8,
            size_width: false,
            log: false,
            interval: 32,
            enable_public_methods: true,
            auto_resize: true,
            body_margin: None,
            height_calculation_method: HeightCalculationMethod::Min,
            body_background: None,
            body_padding: Some("4px".to_string()),
            tolerance: 0,
            enable_in_page_links: false,
        };
        assert_eq!(
            handshake.encode(),
            "[iFrameSizer]iFrameResizer0:8:false:false:32:true:true:null:min:null:4px:0:false"
        );
    }

    #[test]
    fn test_init_handshake_rejects_bad_flag() {
        let raw = "[iFrameSizer]f1:8:maybe:false:32:true:true:null:offset:null:null:0:false";
        assert_eq!(
            InitHandshake::decode(raw).unwrap_err(),
            CodecError::invalid_flag("sizeWidth", "maybe")
        );
    }

    #[test]
    fn test_host_trigger_encoding() {
        assert_eq!(HostTrigger::Reset.encode(), "[iFrameSizer]reset");
        assert_eq!(HostTrigger::Resize.encode(), "[iFrameSizer]resize");
        assert_eq!(
            HostTrigger::Message("{\"a\":1}".to_string()).encode(),
            "[iFrameSizer]message:{\"a\":1}"
        );
    }
}
