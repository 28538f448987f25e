//! framehost protocol - wire codec shared by the host controller and its frames
//!
//! Two envelope formats share one transport (`postMessage` strings):
//!
//! - **Size channel**: colon-delimited positional strings behind the literal
//!   prefix [`MSG_ID`], used for height/width negotiation and lifecycle
//!   control. See [`size`].
//! - **Event channel**: JSON envelopes `{name, type, source, destination, data}`
//!   for application-level relay and action events. See [`event`].
//!
//! # Example
//!
//! ```rust
//! use framehost_protocol::{classify, Inbound, MessageKind};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! match classify("[iFrameSizer]f1:420:0:mutationObserver")? {
//!     Some(Inbound::Size(msg)) => {
//!         assert_eq!(msg.height()?, 420);
//!         assert_eq!(msg.kind, MessageKind::Resize("mutationObserver".into()));
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The codec is pure: no state, no I/O.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

mod error;
pub mod event;
pub mod size;

pub use error::{CodecError, CodecResult};
pub use event::{ConsumerEvent, Endpoint, EventEnvelope, EventType};
pub use size::{
    HeightCalculationMethod, HostTrigger, InitHandshake, MessageKind, SizeMessage,
    INIT_FIELD_COUNT,
};

/// Literal prefix identifying size-channel traffic. Must match the frame-side agent.
pub const MSG_ID: &str = "[iFrameSizer]";

/// A classified inbound transport string.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Size(SizeMessage),
    Event(EventEnvelope),
}

/// Classify a raw transport string by channel.
///
/// Returns `Ok(None)` for empty data. Anything carrying [`MSG_ID`] is decoded
/// as a size-channel message; everything else is tried as an event envelope.
///
/// # Errors
///
/// Returns a size-channel error for a truncated prefixed message, and
/// [`CodecError::Json`] for anything else that is not an event envelope.
/// Callers treat the latter as unrelated page traffic.
pub fn classify(raw: &str) -> CodecResult<Option<Inbound>> {
    if raw.is_empty() {
        return Ok(None);
    }
    if SizeMessage::is_size_message(raw) {
        return Ok(SizeMessage::decode(raw)?.map(Inbound::Size));
    }
    EventEnvelope::decode(raw).map(|env| Some(Inbound::Event(env)))
}
