//! Host controller: owns the frame registry, the deferred-work queues and the
//! page-wide flags, and is the single entry point for inbound traffic.
//!
//! One controller serves one host page. Every inbound message is handled to
//! completion before the next; a failure while handling one message is
//! reported through the telemetry sink and the page's unhandled-error path
//! and never reaches the caller.

use framehost_core::{Error, ErrorKind, FrameId, Position, Result, ResultExt};
use framehost_protocol::{Endpoint, EventEnvelope, EventType, HostTrigger, SizeMessage};
use serde_json::{Value, json};
use tracing::{debug, info, trace, warn};

use crate::actions::{self, HostAction};
use crate::config::HostConfig;
use crate::embed::{Embed, EmbedRequest};
use crate::lifecycle::LifecycleEvent;
use crate::options::{Callbacks, FrameOptions};
use crate::origin::has_trusted_marker;
use crate::page::{FrameElement, HostPage, WindowOf};
use crate::position::PagePosition;
use crate::registry::{FrameRegistry, Lookup};
use crate::relay::{self, RelayOutcome};
use crate::scheduler::{Deferred, Scheduler};
use crate::telemetry::{TelemetrySink, TracingTelemetry};
use crate::visibility::{LoadMoreThrottle, is_visible, needs_more_content};

/// Which elements a registration applies to.
#[derive(Debug, Clone)]
pub enum Target<E> {
    /// Every element matching the configured default selector.
    Default,
    Selector(String),
    Element(E),
}

/// A message as delivered by the transport.
#[derive(Debug, Clone)]
pub struct InboundMessage<W> {
    pub data: String,
    /// Origin the transport reports for the sender.
    pub origin: String,
    /// Sender's window, when the transport exposes it.
    pub source: Option<W>,
}

impl<W> InboundMessage<W> {
    pub fn new(data: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            origin: origin.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn from_window(mut self, source: W) -> Self {
        self.source = Some(source);
        self
    }
}

/// What the controller did with one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Not protocol traffic, or not accepted.
    Ignored,
    /// Addressed to a closed frame.
    Stale,
    Handled,
    Relayed(RelayOutcome),
    /// Processing failed; the error has been surfaced.
    Failed(ErrorKind),
}

/// Capability object for one registered frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameHandle {
    id: FrameId,
}

impl FrameHandle {
    #[must_use]
    pub const fn id(&self) -> &FrameId {
        &self.id
    }

    /// Ask the frame to re-measure and report its size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameMissing`] when the frame is closed or unknown,
    /// or the page error if the post fails.
    pub fn resize<P: HostPage>(&self, host: &HostController<P>) -> Result<()> {
        host.trigger(self.id.as_str(), &HostTrigger::Resize)
    }

    /// Host-initiated reset: reapply the last size synchronously and ask the
    /// frame to re-measure.
    ///
    /// # Errors
    ///
    /// See [`HostController::reset_frame`].
    pub fn reset<P: HostPage>(&self, host: &mut HostController<P>) -> Result<()> {
        host.reset_frame(self.id.as_str())
    }

    /// Close the frame as a `close` message would, without the trailing
    /// resized callback.
    ///
    /// # Errors
    ///
    /// See [`HostController::close_frame`].
    pub fn close<P: HostPage>(&self, host: &mut HostController<P>) -> Result<()> {
        host.close_frame(self.id.as_str())
    }

    /// Send an application payload to the frame's message listener.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameMissing`] when the frame is closed or unknown.
    pub fn send_message<P: HostPage>(
        &self,
        host: &HostController<P>,
        message: &Value,
    ) -> Result<()> {
        let json = serde_json::to_string(message).map_err(|e| Error::decode(e.to_string()))?;
        host.trigger(self.id.as_str(), &HostTrigger::Message(json))
    }
}

/// The host-side controller.
pub struct HostController<P: HostPage> {
    pub(crate) page: P,
    pub(crate) config: HostConfig,
    pub(crate) registry: FrameRegistry<P::Element>,
    pub(crate) scheduler: Scheduler,
    pub(crate) position: PagePosition,
    /// Page-wide, not per frame: cleared by the first size-channel message
    /// processed after construction or teardown. Frames registered after
    /// that never get the first-load exemption from reset on load.
    pub(crate) first_run: bool,
    telemetry: Box<dyn TelemetrySink>,
    load_more: LoadMoreThrottle,
    listening: bool,
}

impl<P: HostPage> HostController<P> {
    pub fn new(page: P, config: HostConfig) -> Self {
        Self {
            registry: FrameRegistry::new(config.auto_id_prefix.clone()),
            load_more: LoadMoreThrottle::new(config.load_more_throttle_ms),
            page,
            config,
            scheduler: Scheduler::new(),
            position: PagePosition::new(),
            first_run: true,
            telemetry: Box::new(TracingTelemetry),
            listening: false,
        }
    }

    #[must_use]
    pub fn with_telemetry(mut self, sink: impl TelemetrySink + 'static) -> Self {
        self.telemetry = Box::new(sink);
        self
    }

    /// Start accepting inbound messages.
    pub fn init(&mut self) {
        self.listening = true;
        info!(host = self.page.host_label(), "Listening for frame messages");
    }

    /// Stop accepting messages and forget every frame and pending task.
    pub fn teardown(&mut self) {
        self.listening = false;
        self.scheduler.clear();
        self.registry.clear();
        self.position.discard();
        self.load_more.reset();
        self.first_run = true;
        info!(host = self.page.host_label(), "Stopped listening for frame messages");
    }

    #[must_use]
    pub const fn is_listening(&self) -> bool {
        self.listening
    }

    #[must_use]
    pub const fn page(&self) -> &P {
        &self.page
    }

    #[must_use]
    pub const fn config(&self) -> &HostConfig {
        &self.config
    }

    #[must_use]
    pub const fn registry(&self) -> &FrameRegistry<P::Element> {
        &self.registry
    }

    /// Handle for an active frame.
    #[must_use]
    pub fn handle(&self, frame_id: &str) -> Option<FrameHandle> {
        self.registry.get(frame_id).map(|record| FrameHandle {
            id: record.id().clone(),
        })
    }

    /// Register every element `target` names and send each its init handshake.
    ///
    /// Options and element tags are all checked before any element is
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid bounds, a non-element
    /// target or an element that is not an `<iframe>`.
    pub fn register(
        &mut self,
        options: FrameOptions,
        target: Target<P::Element>,
        callbacks: Callbacks<P::Element>,
    ) -> Result<Vec<FrameHandle>> {
        options.validate()?;

        let elements = match target {
            Target::Default => self.page.query_selector_all(&self.config.default_selector),
            Target::Selector(selector) => self.page.query_selector_all(&selector),
            Target::Element(element) => vec![element],
        };
        for element in &elements {
            match element.tag_name() {
                None => return Err(Error::NotAnElement),
                Some(tag) if !tag.eq_ignore_ascii_case("IFRAME") => {
                    return Err(Error::unexpected_tag(tag));
                }
                Some(_) => {}
            }
        }

        let mut handles = Vec::with_capacity(elements.len());
        for element in elements {
            let id = self
                .registry
                .register(&element, options.clone(), callbacks.clone())?;
            // A frame that can not take the handshake yet gets it from its load event.
            self.send_init(id.as_str()).into_option_logged();
            handles.push(FrameHandle { id });
        }
        Ok(handles)
    }

    /// Entry point for every message the transport delivers.
    pub fn handle_message(&mut self, message: InboundMessage<WindowOf<P>>) -> MessageOutcome {
        if !self.listening || message.data.is_empty() {
            return MessageOutcome::Ignored;
        }

        let result = if SizeMessage::is_size_message(&message.data) {
            self.route_size_message(&message.data, &message.origin)
        } else {
            self.route_event(&message.data, &message.origin, message.source.as_ref())
        };
        result.unwrap_or_else(|err| self.surface(err))
    }

    /// Entry point for a frame element's load event: re-send the handshake
    /// and, once the page has processed its first message, reset frames
    /// whose calculation method needs it.
    ///
    /// Failures past the frame lookup go through the same propagation
    /// policy as message handling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameMissing`] for an unknown frame.
    pub fn frame_loaded(&mut self, frame_id: &str) -> Result<()> {
        let requires_reset = match self.registry.lookup(frame_id) {
            Lookup::Active(record) => record.options().height_calculation_method.requires_reset(),
            Lookup::Closed => return Ok(()),
            Lookup::NotFound => return Err(Error::frame_missing(frame_id)),
        };
        if let Err(err) = self.reload(frame_id, requires_reset) {
            self.surface(err);
        }
        Ok(())
    }

    fn reload(&mut self, frame_id: &str, requires_reset: bool) -> Result<()> {
        let first_run = self.first_run;
        self.send_init(frame_id)?;
        if !first_run && requires_reset {
            self.reset_frame(frame_id)?;
        }

        if frame_id.contains(self.config.widget_id_marker.as_str()) {
            if relay::is_subscribed(&self.config, "widgetLoaded") {
                let loaded = EventEnvelope::new(self.config.event_name("widget:loaded"))
                    .with_kind(EventType::Action)
                    .with_source(Endpoint::Parent)
                    .with_destination(Endpoint::Parent)
                    .with_data(json!({}));
                self.page.post_to_parent(&loaded.encode()?);
            }
            self.check_visibility(frame_id)?;
        }
        Ok(())
    }

    /// Entry point for page scroll events.
    ///
    /// Announces widgets the first time they enter the viewport, and asks
    /// widgets for more content when the page nears a widget's bottom edge.
    #[allow(clippy::cast_precision_loss)]
    pub fn page_scrolled(&mut self, now_ms: u64) {
        self.scheduler.observe(now_ms);

        let widgets: Vec<FrameId> = self
            .registry
            .active_ids()
            .into_iter()
            .filter(|id| id.as_str().contains(self.config.widget_id_marker.as_str()))
            .collect();
        for id in &widgets {
            if let Err(err) = self.check_visibility(id.as_str()) {
                self.surface(err);
            }
        }

        let scroll_top = self.page.scroll_offset().y as f64;
        let viewport = self.page.viewport();
        let wants_more = widgets
            .iter()
            .filter_map(|id| self.registry.get(id.as_str()))
            .any(|record| {
                let bottom = record.element().bounding_rect().bottom() + scroll_top;
                needs_more_content(scroll_top, viewport.height, bottom, self.config.load_more_ratio)
            });

        if wants_more && self.load_more.try_fire(now_ms) {
            let load_more = EventEnvelope::relay_from_parent(
                self.config.event_name("infinite:load:more"),
                Endpoint::Widget,
                json!({}),
            );
            if let Err(err) = relay::broadcast(&self.page, &self.config, &load_more) {
                self.surface(err);
            }
        }
    }

    /// Run the tasks queued for this animation frame. Returns how many ran.
    pub fn run_animation_frame(&mut self) -> usize {
        let tasks = self.scheduler.take_animation_frame();
        let count = tasks.len();
        for task in tasks {
            self.run_deferred(task);
        }
        count
    }

    /// Run every timer due at `now_ms`. Returns how many ran.
    pub fn run_timers(&mut self, now_ms: u64) -> usize {
        let tasks = self.scheduler.take_due_timers(now_ms);
        let count = tasks.len();
        for task in tasks {
            self.run_deferred(task);
        }
        count
    }

    #[must_use]
    pub fn needs_animation_frame(&self) -> bool {
        self.scheduler.needs_animation_frame()
    }

    #[must_use]
    pub fn next_timer_due(&self) -> Option<u64> {
        self.scheduler.next_timer_due()
    }

    /// Build the id and `src` of a new widget frame for this page.
    ///
    /// A request naming no widget is an invalid argument from the embedding
    /// page; it and every other failure go through the propagation policy and
    /// yield `None`.
    pub fn embed(
        &mut self,
        request: &EmbedRequest,
        root_url: &str,
        parent_url: &str,
    ) -> Option<Embed> {
        match request.build(root_url, parent_url, &self.config.widget_id_marker) {
            Ok(embed) => {
                debug!(frame_id = %embed.id, "Widget embed built");
                Some(embed)
            }
            Err(err) => {
                self.surface(err);
                None
            }
        }
    }

    /// Close a frame: detach it, mark it closed and run its closed callback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameMissing`] for an unknown id, or the closed
    /// callback's failure.
    pub fn close_frame(&mut self, frame_id: &str) -> Result<()> {
        self.registry.close(frame_id)
    }

    /// Post a host trigger to an active frame.
    pub(crate) fn trigger(&self, frame_id: &str, trigger: &HostTrigger) -> Result<()> {
        let record = self
            .registry
            .get(frame_id)
            .ok_or_else(|| Error::frame_missing(frame_id))?;
        crate::frame_debug!(
            record.log_enabled(),
            frame_id,
            trigger = trigger.label(),
            "Sending msg to iframe"
        );
        record.element().post_message(&trigger.encode())
    }

    fn send_init(&mut self, frame_id: &str) -> Result<()> {
        let record = self
            .registry
            .get_mut(frame_id)
            .ok_or_else(|| Error::frame_missing(frame_id))?;
        record.advance(LifecycleEvent::InitSent);
        let handshake = HostTrigger::Init(record.options().handshake(record.id()));
        self.trigger(frame_id, &handshake)
    }

    fn route_event(
        &mut self,
        raw: &str,
        origin: &str,
        source: Option<&WindowOf<P>>,
    ) -> Result<MessageOutcome> {
        let mut envelope = match EventEnvelope::decode(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                trace!(error = %e, "Ignoring non-protocol message");
                return Ok(MessageOutcome::Ignored);
            }
        };
        if !has_trusted_marker(origin, &self.config.trusted_origin_markers)
            && !envelope.in_namespace(&self.config.namespace)
        {
            trace!(origin, name = %envelope.name, "Ignoring event from untrusted origin");
            return Ok(MessageOutcome::Ignored);
        }

        if let Some(event) = relay::consumer_event(&self.config, &envelope) {
            debug!(event = %event.event_name, "Re-emitting subscribed event");
            self.page.post_to_parent(&event.encode()?);
        }

        if envelope.is_action() {
            let action = HostAction::parse(envelope.local_name(&self.config.namespace));
            self.perform_action(&action, source);
            if !envelope.targets_parent() {
                envelope.kind = Some(EventType::Relay);
            }
        }

        if !envelope.is_relay() {
            return Ok(MessageOutcome::Handled);
        }
        let outcome = relay::broadcast(&self.page, &self.config, &envelope)?;
        if outcome.needs_recovery() {
            self.recover_missing_targets();
        }
        Ok(MessageOutcome::Relayed(outcome))
    }

    fn perform_action(&mut self, action: &HostAction, source: Option<&WindowOf<P>>) {
        debug!(action = %action, "Host action requested");
        match action {
            HostAction::CloseWidget => self.close_sender(source),
            HostAction::ScrollTopFix => self.page.scroll_to(Position::new(0, 0)),
            HostAction::ShowLightbox => self.scheduler.set_timeout(0, Deferred::ShowLightbox),
            HostAction::HideLightbox => self.scheduler.set_timeout(0, Deferred::HideLightbox),
            HostAction::CloseUploader => self.scheduler.set_timeout(0, Deferred::CloseUploader),
            HostAction::Unknown(name) => trace!(action = %name, "No host action for event"),
        }
    }

    /// Detach the frame whose content window sent `close:widget`. The
    /// lightbox is never closed this way.
    fn close_sender(&mut self, source: Option<&WindowOf<P>>) {
        let Some(window) = source else {
            debug!("close:widget without a sender window");
            return;
        };
        let sender = self
            .page
            .all_frames()
            .into_iter()
            .find(|frame| frame.id() != self.config.lightbox_id && frame.owns_window(window));
        if let Some(frame) = sender {
            let frame_id = frame.id();
            frame.detach();
            self.registry.mark_removed(&frame_id);
            debug!(frame_id = %frame_id, "Removed widget frame");
        }
    }

    /// Give the embedding page a chance to create missing frames.
    fn recover_missing_targets(&self) {
        if !self.page.invoke_ready_callback() {
            warn!("Widget iframe is not initialized, please check your embed code");
        }
    }

    /// Relay a one-time visibility notice for a widget that just entered the
    /// viewport. Returns whether a notice was sent.
    fn check_visibility(&mut self, frame_id: &str) -> Result<bool> {
        let Some(record) = self.registry.get_mut(frame_id) else {
            return Ok(false);
        };
        if record.was_seen_visible()
            || !is_visible(record.element().bounding_rect(), self.page.viewport())
        {
            return Ok(false);
        }
        record.mark_seen_visible();
        let src = record.element().src();

        let visible = EventEnvelope::relay_from_parent(
            self.config.event_name("widget:visible"),
            Endpoint::Widget,
            json!({ "src": src }),
        );
        relay::broadcast(&self.page, &self.config, &visible)?;
        Ok(true)
    }

    fn run_deferred(&mut self, task: Deferred) {
        trace!(task = task.label(), "Running deferred task");
        match task {
            Deferred::ApplySize {
                frame_id,
                dimensions,
                kind,
            } => {
                if let Err(err) = self.apply_size(&frame_id, dimensions, &kind) {
                    self.surface(err);
                }
            }
            Deferred::ShowLightbox => match self.page.element_by_id(&self.config.lightbox_id) {
                Some(lightbox) => actions::show_lightbox(&lightbox),
                None => debug!("No lightbox frame to show"),
            },
            Deferred::HideLightbox => match self.page.element_by_id(&self.config.lightbox_id) {
                Some(lightbox) => actions::hide_lightbox(&lightbox),
                None => debug!("No lightbox frame to hide"),
            },
            Deferred::CloseUploader => {
                if let Some(uploader) = self.page.element_by_id(&self.config.uploader_id) {
                    uploader.detach();
                    self.registry.mark_removed(&self.config.uploader_id);
                }
            }
            Deferred::Surface(err) => self.page.report_unhandled(&err),
        }
    }

    /// Apply the propagation policy to a failure and report how it ended.
    pub(crate) fn surface(&mut self, err: Error) -> MessageOutcome {
        let kind = err.kind();
        match kind {
            ErrorKind::Decode => debug!(error = %err, "Dropped undecodable message"),
            ErrorKind::Managed => self.scheduler.set_timeout(0, Deferred::Surface(err)),
            ErrorKind::Configuration | ErrorKind::Protocol | ErrorKind::Application => {
                self.telemetry.capture(&err);
                warn!(kind = %kind, error = %err, "Message handling failed");
                self.scheduler.set_timeout(0, Deferred::Surface(err));
            }
        }
        MessageOutcome::Failed(kind)
    }
}
