//! Relay broadcaster: forwards event-channel envelopes to the frames their
//! `destination` names, and re-emits subscribed events to the embedding page.

use framehost_core::Result;
use framehost_protocol::{ConsumerEvent, Endpoint, EventEnvelope};
use tracing::{debug, warn};

use crate::config::HostConfig;
use crate::page::{FrameElement, HostPage};

/// Public event names and the local (namespace-less) names they stand for.
pub const CONSUMER_EVENTS: [(&str, &str); 6] = [
    ("photoOpened", "opened:photo"),
    ("photoClosed", "hide:lightbox"),
    ("ctaClicked", "cta:clicked"),
    ("widgetLoaded", "widget:loaded"),
    ("widgetNumPhotos", "widget:num:photos"),
    ("widgetLoadMore", "widget:load:more"),
];

/// What happened to a relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Posted to this many frames.
    Delivered(usize),
    /// The destination is valid but no frame could receive the envelope.
    NoTargets,
    /// Addressed to the host page itself.
    Terminated,
    /// Missing or unrecognized destination.
    UnknownDestination(String),
}

impl RelayOutcome {
    /// Whether the embedding page's ready callback should be given a chance
    /// to bring the missing frames up.
    #[must_use]
    pub const fn needs_recovery(&self) -> bool {
        matches!(self, Self::NoTargets | Self::UnknownDestination(_))
    }
}

/// Target set for a destination.
#[derive(Debug)]
pub enum Route<E> {
    Frames(Vec<E>),
    Terminated,
    Unknown(String),
}

/// Resolve `destination` against the current document.
pub fn route<P: HostPage>(
    page: &P,
    config: &HostConfig,
    destination: Option<&Endpoint>,
) -> Route<P::Element> {
    let by_id = |id: &str| Route::Frames(page.element_by_id(id).into_iter().collect());
    match destination {
        Some(Endpoint::Widget) => {
            Route::Frames(page.frames_with_id_containing(&config.widget_id_marker))
        }
        Some(Endpoint::Lightbox) => by_id(&config.lightbox_id),
        Some(Endpoint::Uploader) => by_id(&config.uploader_id),
        Some(Endpoint::SocialAuth) => by_id(&config.social_auth_id),
        Some(Endpoint::All) => {
            Route::Frames(page.frames_with_id_containing(&config.managed_id_marker))
        }
        Some(Endpoint::Parent) => Route::Terminated,
        Some(Endpoint::Other(other)) => Route::Unknown(other.clone()),
        None => Route::Unknown(String::new()),
    }
}

/// Post `envelope`, re-serialized, to every frame its destination names.
///
/// A frame whose content window is gone is skipped; when no frame accepts
/// the envelope the outcome is [`RelayOutcome::NoTargets`].
///
/// # Errors
///
/// Returns a decode error if the envelope can not be serialized.
pub fn broadcast<P: HostPage>(
    page: &P,
    config: &HostConfig,
    envelope: &EventEnvelope,
) -> Result<RelayOutcome> {
    let frames = match route(page, config, envelope.destination.as_ref()) {
        Route::Frames(frames) => frames,
        Route::Terminated => return Ok(RelayOutcome::Terminated),
        Route::Unknown(destination) => {
            warn!(name = %envelope.name, destination = %destination, "Unknown target frame");
            return Ok(RelayOutcome::UnknownDestination(destination));
        }
    };

    let encoded = envelope.encode()?;
    let delivered = frames
        .iter()
        .filter(|frame| match frame.post_message(&encoded) {
            Ok(()) => true,
            Err(e) => {
                debug!(frame_id = %frame.id(), error = %e, "Relay target not ready");
                false
            }
        })
        .count();

    debug!(name = %envelope.name, delivered, "Relayed event");
    if delivered == 0 {
        Ok(RelayOutcome::NoTargets)
    } else {
        Ok(RelayOutcome::Delivered(delivered))
    }
}

/// Consumer-facing form of `envelope`, if the embedding page subscribed to it.
#[must_use]
pub fn consumer_event(config: &HostConfig, envelope: &EventEnvelope) -> Option<ConsumerEvent> {
    CONSUMER_EVENTS
        .iter()
        .filter(|(public, _)| is_subscribed(config, public))
        .find(|(_, local)| envelope.name == config.event_name(local))
        .map(|(public, _)| ConsumerEvent {
            event_name: (*public).to_string(),
            data: envelope.data.clone(),
        })
}

/// Whether the embedding page subscribed to the public event `public`.
#[must_use]
pub fn is_subscribed(config: &HostConfig, public: &str) -> bool {
    config.subscribed_events.iter().any(|s| s == public)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::MemoryPage;
    use framehost_protocol::EventType;
    use serde_json::json;

    fn page_with_frames() -> MemoryPage {
        let page = MemoryPage::new();
        page.add_frame("pixlee_widget_iframe_a", "https://widgets.pixlee.com/a");
        page.add_frame("pixlee_widget_iframe_b", "https://widgets.pixlee.com/b");
        page.add_frame("pixlee_lightbox_iframe", "https://widgets.pixlee.com/lb");
        page.add_frame("other", "https://ads.example.com/");
        page
    }

    fn inbox(page: &MemoryPage, id: &str) -> usize {
        page.element_by_id(id).map(|f| f.messages().len()).unwrap_or_default()
    }

    #[test]
    fn test_widget_destination_reaches_only_widgets() {
        let page = page_with_frames();
        let env =
            EventEnvelope::relay_from_parent("pixlee:widget:visible", Endpoint::Widget, json!({}));

        let outcome = broadcast(&page, &HostConfig::default(), &env).unwrap();

        assert_eq!(outcome, RelayOutcome::Delivered(2));
        assert_eq!(inbox(&page, "pixlee_widget_iframe_a"), 1);
        assert_eq!(inbox(&page, "pixlee_widget_iframe_b"), 1);
        assert_eq!(inbox(&page, "pixlee_lightbox_iframe"), 0);
        assert_eq!(inbox(&page, "other"), 0);
    }

    #[test]
    fn test_all_destination_reaches_managed_frames() {
        let page = page_with_frames();
        let env = EventEnvelope::new("pixlee:ping").with_destination(Endpoint::All);
        assert_eq!(
            broadcast(&page, &HostConfig::default(), &env).unwrap(),
            RelayOutcome::Delivered(3)
        );
        assert_eq!(inbox(&page, "other"), 0);
    }

    #[test]
    fn test_envelope_is_forwarded_with_unknown_keys() {
        let page = page_with_frames();
        let raw = r#"{"name":"pixlee:opened:photo","type":"relay","source":"widget","destination":"lightbox","data":{"id":7},"trace":"abc"}"#;
        let env = EventEnvelope::decode(raw).unwrap();

        broadcast(&page, &HostConfig::default(), &env).unwrap();

        let lightbox = page.element_by_id("pixlee_lightbox_iframe").unwrap();
        let forwarded = EventEnvelope::decode(lightbox.messages().first().unwrap()).unwrap();
        assert_eq!(forwarded, env);
        assert_eq!(forwarded.kind, Some(EventType::Relay));
    }

    #[test]
    fn test_missing_targets_and_unknown_destinations() {
        let page = MemoryPage::new();
        let config = HostConfig::default();

        let lightbox = EventEnvelope::new("pixlee:x").with_destination(Endpoint::Lightbox);
        let outcome = broadcast(&page, &config, &lightbox).unwrap();
        assert_eq!(outcome, RelayOutcome::NoTargets);
        assert!(outcome.needs_recovery());

        let typo = EventEnvelope::new("pixlee:x")
            .with_destination(Endpoint::from("widgte".to_string()));
        let outcome = broadcast(&page, &config, &typo).unwrap();
        assert_eq!(outcome, RelayOutcome::UnknownDestination("widgte".to_string()));
        assert!(outcome.needs_recovery());

        let parent = EventEnvelope::new("pixlee:x").with_destination(Endpoint::Parent);
        let outcome = broadcast(&page, &config, &parent).unwrap();
        assert_eq!(outcome, RelayOutcome::Terminated);
        assert!(!outcome.needs_recovery());
    }

    #[test]
    fn test_detached_target_counts_as_missing() {
        let page = MemoryPage::new();
        let frame = page.add_frame("pixlee_uploader", "");
        frame.detach();
        let env = EventEnvelope::new("pixlee:x").with_destination(Endpoint::Uploader);
        assert_eq!(
            broadcast(&page, &HostConfig::default(), &env).unwrap(),
            RelayOutcome::NoTargets
        );
        assert!(frame.messages().is_empty());
    }

    #[test]
    fn test_consumer_event_mapping() {
        let config = HostConfig::default().subscribe(["photoOpened", "widgetLoaded"]);
        let opened = EventEnvelope::new("pixlee:opened:photo").with_data(json!({"id": 3}));
        let event = consumer_event(&config, &opened).unwrap();
        assert_eq!(event.event_name, "photoOpened");
        assert_eq!(event.data, json!({"id": 3}));

        let cta = EventEnvelope::new("pixlee:cta:clicked");
        assert!(consumer_event(&config, &cta).is_none());
        assert!(is_subscribed(&config, "widgetLoaded"));
        assert!(!is_subscribed(&config, "ctaClicked"));
    }
}
