//! Property-based tests for the wire codec using proptest.
//!
//! Properties verified:
//! - Init handshakes round-trip every field exactly
//! - Strings without the size-channel prefix are never decoded as size messages
//! - `message` payloads survive arbitrary colons

#![allow(clippy::panic)]

use framehost_core::{Dimensions, FrameId};
use framehost_protocol::{
    HeightCalculationMethod, InitHandshake, MessageKind, SizeMessage, classify, Inbound, MSG_ID,
};
use proptest::prelude::*;

/// Test helper: Unwrap a Result or panic with context
fn unwrap_result<T, E: std::fmt::Display>(result: std::result::Result<T, E>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("{}: {}", context, e),
    }
}

fn frame_id_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_-]{0,24}"
}

fn css_strategy() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[0-9]{1,3}(px|em|%)( [0-9]{1,3}px){0,3}")
}

fn method_strategy() -> impl Strategy<Value = HeightCalculationMethod> {
    prop_oneof![
        Just(HeightCalculationMethod::BodyOffset),
        Just(HeightCalculationMethod::BodyScroll),
        Just(HeightCalculationMethod::DocumentElementOffset),
        Just(HeightCalculationMethod::DocumentElementScroll),
        Just(HeightCalculationMethod::Max),
        Just(HeightCalculationMethod::Min),
        Just(HeightCalculationMethod::Grow),
        Just(HeightCalculationMethod::LowestElement),
        Just(HeightCalculationMethod::TaggedElement),
        Just(HeightCalculationMethod::Offset),
        Just(HeightCalculationMethod::Scroll),
    ]
}

// ==========================================================================
// PROPERTY: Init handshake round trip
// ==========================================================================

proptest! {
    #[test]
    fn prop_init_handshake_round_trips(
        frame_id in frame_id_strategy(),
        body_margin_v1 in 0i64..64,
        size_width in any::<bool>(),
        log in any::<bool>(),
        interval in -1000i64..1000,
        enable_public_methods in any::<bool>(),
        auto_resize in any::<bool>(),
        body_margin in css_strategy(),
        height_calculation_method in method_strategy(),
        body_background in proptest::option::of("#[0-9a-f]{6}"),
        body_padding in css_strategy(),
        tolerance in 0i64..50,
        enable_in_page_links in any::<bool>(),
    ) {
        let handshake = InitHandshake {
            frame_id: FrameId::from(frame_id),
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
        };

        let encoded = handshake.encode();
        let decoded = unwrap_result(InitHandshake::decode(&encoded), "handshake should decode");

        prop_assert_eq!(decoded, handshake);
    }

    #[test]
    fn prop_unprefixed_strings_are_not_size_messages(raw in "[^\\[].{0,64}") {
        let decoded = unwrap_result(SizeMessage::decode(&raw), "unprefixed decode never fails");
        prop_assert!(decoded.is_none());
        prop_assert!(!matches!(classify(&raw), Ok(Some(Inbound::Size(_)))));
    }

    #[test]
    fn prop_message_payload_is_verbatim(
        frame_id in frame_id_strategy(),
        payload in "[ -~]{0,80}",
    ) {
        let msg = SizeMessage::new(frame_id, Dimensions::new(0, 0), MessageKind::Message)
            .with_payload(payload.clone());
        let decoded = unwrap_result(SizeMessage::decode(&msg.encode()), "should decode");

        prop_assert_eq!(decoded.map(|m| m.payload), Some(Some(payload)));
    }

    #[test]
    fn prop_resize_dimensions_round_trip(height in -5000i64..50_000, width in 0i64..50_000) {
        let msg = SizeMessage::new("f1", Dimensions::new(height, width), MessageKind::from_wire("interval"));
        let raw = msg.encode();
        prop_assert!(raw.starts_with(MSG_ID));

        let decoded = unwrap_result(SizeMessage::decode(&raw), "should decode");
        let dims = decoded.map(|m| m.dimensions());
        prop_assert_eq!(dims.map(Result::ok), Some(Some(Dimensions::new(height, width))));
    }
}

#[test]
fn test_init_handshake_wrong_field_count() {
    let result = InitHandshake::decode("[iFrameSizer]f1:8:false:false:32");
    assert!(matches!(
        result,
        Err(framehost_protocol::CodecError::FieldCount {
            expected: 13,
            actual: 5
        })
    ));
}
