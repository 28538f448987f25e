//! Human-readable rendering of raw transport strings.

use framehost_protocol::{
    CodecResult, INIT_FIELD_COUNT, Inbound, InitHandshake, MSG_ID, SizeMessage, classify,
};
use serde_json::{Value, json};

/// Classify `raw` and render it as JSON.
///
/// Host-to-frame handshakes are recognized by their field count and shown
/// field by field; everything else goes through [`classify`].
///
/// # Errors
///
/// Returns the codec error for a truncated size-channel message or for data
/// that is neither channel.
pub fn describe(raw: &str) -> CodecResult<Value> {
    if let Some(handshake) = as_handshake(raw) {
        return Ok(handshake);
    }
    Ok(match classify(raw)? {
        None => json!({ "channel": "none" }),
        Some(Inbound::Size(message)) => describe_size(&message),
        Some(Inbound::Event(envelope)) => json!({
            "channel": "event",
            "envelope": envelope,
        }),
    })
}

fn describe_size(message: &SizeMessage) -> Value {
    json!({
        "channel": "size",
        "frameId": message.frame_id.as_str(),
        "height": message.height().ok(),
        "width": message.width().ok(),
        "type": message.kind.as_wire(),
        "payload": message.payload,
    })
}

fn as_handshake(raw: &str) -> Option<Value> {
    let body = raw.strip_prefix(MSG_ID)?;
    if body.split(':').count() != INIT_FIELD_COUNT {
        return None;
    }
    let handshake = InitHandshake::decode(raw).ok()?;
    Some(json!({
        "channel": "size",
        "direction": "host-to-frame",
        "type": "init",
        "frameId": handshake.frame_id.as_str(),
        "bodyMarginV1": handshake.body_margin_v1,
        "sizeWidth": handshake.size_width,
        "log": handshake.log,
        "interval": handshake.interval,
        "enablePublicMethods": handshake.enable_public_methods,
        "autoResize": handshake.auto_resize,
        "bodyMargin": handshake.body_margin,
        "heightCalculationMethod": handshake.height_calculation_method.as_str(),
        "bodyBackground": handshake.body_background,
        "bodyPadding": handshake.body_padding,
        "tolerance": handshake.tolerance,
        "enableInPageLinks": handshake.enable_in_page_links,
    }))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn field<'a>(value: &'a Value, key: &str) -> &'a Value {
        value.get(key).unwrap_or(&Value::Null)
    }

    #[test]
    fn test_describe_resize() {
        let value = describe("[iFrameSizer]f1:420:0:mutationObserver").unwrap();
        assert_eq!(
            value,
            json!({
                "channel": "size",
                "frameId": "f1",
                "height": 420,
                "width": 0,
                "type": "mutationObserver",
                "payload": null,
            })
        );
    }

    #[test]
    fn test_describe_message_keeps_payload() {
        let value = describe(r#"[iFrameSizer]f1:0:0:message:{"a":"b:c"}"#).unwrap();
        assert_eq!(field(&value, "type"), "message");
        assert_eq!(field(&value, "payload"), r#"{"a":"b:c"}"#);
    }

    #[test]
    fn test_describe_handshake() {
        let value = describe(
            "[iFrameSizer]iFrameResizer0:8:false:false:32:false:true:null:offset:null:null:0:false",
        )
        .unwrap();
        assert_eq!(field(&value, "direction"), "host-to-frame");
        assert_eq!(field(&value, "interval"), 32);
        assert!(field(&value, "bodyMargin").is_null());
    }

    #[test]
    fn test_describe_event_and_garbage() {
        let value = describe(r#"{"name":"pixlee:cta:clicked","type":"relay"}"#).unwrap();
        assert_eq!(field(&value, "channel"), "event");
        assert_eq!(field(field(&value, "envelope"), "type"), "relay");
        assert_eq!(describe("").unwrap(), json!({"channel": "none"}));
        assert!(describe("webpackHotUpdate").is_err());
    }
}
