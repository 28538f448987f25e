//! Event channel: JSON envelopes for application-level relay and action
//! events exchanged between the host and its auxiliary frames.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CodecError, CodecResult};

/// Envelope `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// Forward to another frame through the host.
    Relay,
    /// Ask the host itself to act.
    Action,
    Other(String),
}

impl EventType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Relay => "relay",
            Self::Action => "action",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for EventType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "relay" => Self::Relay,
            "action" => Self::Action,
            _ => Self::Other(raw),
        }
    }
}

impl From<EventType> for String {
    fn from(kind: EventType) -> Self {
        kind.as_str().to_string()
    }
}

/// Logical endpoint named by `source` / `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Endpoint {
    /// The host page itself; relays addressed here terminate.
    Parent,
    /// Every widget frame.
    Widget,
    Lightbox,
    Uploader,
    SocialAuth,
    /// Every managed frame.
    All,
    Other(String),
}

impl Endpoint {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Parent => "parent",
            Self::Widget => "widget",
            Self::Lightbox => "lightbox",
            Self::Uploader => "uploader",
            Self::SocialAuth => "social_auth",
            Self::All => "all",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for Endpoint {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "parent" => Self::Parent,
            "widget" => Self::Widget,
            "lightbox" => Self::Lightbox,
            "uploader" => Self::Uploader,
            "social_auth" => Self::SocialAuth,
            "all" => Self::All,
            _ => Self::Other(raw),
        }
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.as_str().to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event-channel envelope.
///
/// Keys this crate does not model are kept in `extra` so a relayed envelope
/// reaches its target with every field the sender wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventEnvelope {
    /// Create an envelope with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            source: None,
            destination: None,
            data: Value::Null,
            extra: Map::new(),
        }
    }

    /// Relay envelope sent by the host itself.
    pub fn relay_from_parent(name: impl Into<String>, destination: Endpoint, data: Value) -> Self {
        Self::new(name)
            .with_kind(EventType::Relay)
            .with_source(Endpoint::Parent)
            .with_destination(destination)
            .with_data(data)
    }

    #[must_use]
    pub fn with_kind(mut self, kind: EventType) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Endpoint) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_destination(mut self, destination: Endpoint) -> Self {
        self.destination = Some(destination);
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Decode an event-channel string.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Json`] when `raw` is not a JSON object with a
    /// string `name`.
    pub fn decode(raw: &str) -> CodecResult<Self> {
        serde_json::from_str(raw).map_err(|e| CodecError::json(e.to_string()))
    }

    /// Encode for posting to a content window.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Json`] if serialization fails.
    pub fn encode(&self) -> CodecResult<String> {
        serde_json::to_string(self).map_err(|e| CodecError::json(e.to_string()))
    }

    #[must_use]
    pub fn is_relay(&self) -> bool {
        self.kind == Some(EventType::Relay)
    }

    #[must_use]
    pub fn is_action(&self) -> bool {
        self.kind == Some(EventType::Action)
    }

    /// Whether the name lives under `namespace` (e.g. `pixlee:`).
    #[must_use]
    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.name.starts_with(namespace)
    }

    /// Name with `namespace` stripped, or the full name outside it.
    #[must_use]
    pub fn local_name<'a>(&'a self, namespace: &str) -> &'a str {
        self.name.strip_prefix(namespace).unwrap_or(&self.name)
    }

    /// Whether the destination is the host page.
    #[must_use]
    pub fn targets_parent(&self) -> bool {
        self.destination == Some(Endpoint::Parent)
    }
}

/// Event re-emitted to the embedding page under a consumer-facing name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerEvent {
    pub event_name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl ConsumerEvent {
    /// Encode for posting to the embedding page.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Json`] if serialization fails.
    pub fn encode(&self) -> CodecResult<String> {
        serde_json::to_string(self).map_err(|e| CodecError::json(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_envelope() {
        let env = EventEnvelope::decode(
            r#"{"name":"pixlee:show:lightbox","type":"action","source":"widget","destination":"lightbox","data":{"id":7}}"#,
        )
        .unwrap();
        assert_eq!(env.kind, Some(EventType::Action));
        assert_eq!(env.source, Some(Endpoint::Widget));
        assert_eq!(env.destination, Some(Endpoint::Lightbox));
        assert_eq!(env.data, json!({"id": 7}));
        assert_eq!(env.local_name("pixlee:"), "show:lightbox");
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(matches!(
            EventEnvelope::decode("[iFrameSizer]f1:1:1:init"),
            Err(CodecError::Json { .. })
        ));
        assert!(EventEnvelope::decode(r#"{"type":"relay"}"#).is_err());
        assert!(EventEnvelope::decode(r#"{"name":3}"#).is_err());
    }

    #[test]
    fn test_unknown_keys_survive_reencode() {
        let raw = r#"{"name":"pixlee:x","type":"relay","destination":"widget","ts":12}"#;
        let env = EventEnvelope::decode(raw).unwrap();
        let back: Value = serde_json::from_str(&env.encode().unwrap()).unwrap();
        assert_eq!(back.get("ts"), Some(&json!(12)));
        assert_eq!(back.get("destination"), Some(&json!("widget")));
        assert!(back.get("data").is_none());
    }

    #[test]
    fn test_social_auth_endpoint_name() {
        let env = EventEnvelope::decode(r#"{"name":"pixlee:a","destination":"social_auth"}"#).unwrap();
        assert_eq!(env.destination, Some(Endpoint::SocialAuth));
        assert_eq!(Endpoint::SocialAuth.to_string(), "social_auth");
    }

    #[test]
    fn test_consumer_event_shape() {
        let event = ConsumerEvent {
            event_name: "photoOpened".to_string(),
            data: json!({"id": 1}),
        };
        assert_eq!(
            event.encode().unwrap(),
            r#"{"eventName":"photoOpened","data":{"id":1}}"#
        );
    }
}
