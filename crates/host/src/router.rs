//! Size-channel router: resolves, validates and dispatches one message.
//!
//! Order per message: decode, drop meta-parent echoes, resolve the frame,
//! check the origin, dispatch on the message kind. Per-frame traces follow
//! the addressed frame's `log` option, re-read on every message.

use framehost_core::{Axis, Dimensions, Error, FrameId, Position, Result};
use framehost_protocol::{HostTrigger, MessageKind, SizeMessage};
use tracing::{debug, warn};

use crate::controller::{HostController, MessageOutcome};
use crate::frame_debug;
use crate::lifecycle::{LifecycleEvent, Limit, ensure_in_range};
use crate::options::{Callbacks, FrameOptions, MessageEvent, ResizedEvent};
use crate::origin::{remote_host, validate_origin};
use crate::page::{FrameElement, HostPage};
use crate::registry::{FrameRecord, Lookup};
use crate::scheduler::Deferred;

/// Per-message scratch state, built once and passed down the dispatch chain.
#[derive(Debug)]
pub(crate) struct MessageContext<E> {
    frame_id: FrameId,
    message: SizeMessage,
    element: E,
    callbacks: Callbacks<E>,
    /// The frame's `log` option at the time the message arrived.
    log: bool,
}

impl<P: HostPage> HostController<P> {
    pub(crate) fn route_size_message(&mut self, raw: &str, origin: &str) -> Result<MessageOutcome> {
        let Some(message) = SizeMessage::decode(raw)? else {
            return Ok(MessageOutcome::Ignored);
        };
        let frame_id = message.frame_id.clone();
        let log = self
            .registry
            .get_mut(frame_id.as_str())
            .is_some_and(FrameRecord::refresh_log_flag);
        frame_debug!(log, frame_id = %frame_id, host = self.page.host_label(), "Received: {raw}");

        if matches!(message.kind, MessageKind::MetaParentEcho(_)) {
            frame_debug!(log, frame_id = %frame_id, "Ignoring init message from meta parent page");
            return Ok(MessageOutcome::Ignored);
        }

        let (element, callbacks, check_origin) = match self.registry.lookup(frame_id.as_str()) {
            Lookup::Active(record) => (
                record.element().clone(),
                record.callbacks.clone(),
                record.options().check_origin,
            ),
            Lookup::Closed => {
                frame_debug!(log, frame_id = %frame_id, "Ignoring message for closed frame");
                return Ok(MessageOutcome::Stale);
            }
            Lookup::NotFound => return Err(Error::frame_missing(frame_id.as_str())),
        };
        if !element.is_attached() {
            self.registry.mark_removed(frame_id.as_str());
            return Err(Error::frame_missing(frame_id.as_str()));
        }

        let src = element.src();
        if check_origin {
            frame_debug!(log, frame_id = %frame_id, "Checking connection is from: {}", remote_host(&src));
        }
        validate_origin(origin, &src, check_origin, frame_id.as_str(), raw)?;

        let ctx = MessageContext {
            frame_id,
            message,
            element,
            callbacks,
            log,
        };
        self.dispatch(&ctx)?;
        self.first_run = false;
        Ok(MessageOutcome::Handled)
    }

    fn dispatch(&mut self, ctx: &MessageContext<P::Element>) -> Result<()> {
        match &ctx.message.kind {
            MessageKind::Close => self.close_from_frame(ctx),
            MessageKind::Message => self.forward_message(ctx),
            MessageKind::ScrollTo => self.scroll_request(ctx, false),
            MessageKind::ScrollToOffset => self.scroll_request(ctx, true),
            MessageKind::InPageLink => self.in_page_link(ctx),
            MessageKind::Reset => self.reset_from_frame(ctx),
            MessageKind::Init => self.init_from_frame(ctx),
            MessageKind::Resize(kind) => self.resize(ctx, kind),
            MessageKind::MetaParentEcho(_) => Ok(()),
        }
    }

    fn advance(&mut self, frame_id: &FrameId, event: LifecycleEvent) {
        if let Some(record) = self.registry.get_mut(frame_id.as_str()) {
            record.advance(event);
        }
    }

    /// Close, then one more resized callback for observers that only watch resizes.
    fn close_from_frame(&mut self, ctx: &MessageContext<P::Element>) -> Result<()> {
        self.registry.close(ctx.frame_id.as_str())?;
        let event = ResizedEvent::new(
            ctx.frame_id.clone(),
            ctx.message.dimensions().unwrap_or_default(),
            ctx.message.kind.as_wire(),
        );
        ctx.callbacks.resized(&event)
    }

    fn forward_message(&mut self, ctx: &MessageContext<P::Element>) -> Result<()> {
        let payload = ctx.message.payload.as_deref().unwrap_or_default();
        frame_debug!(
            ctx.log,
            frame_id = %ctx.frame_id,
            "MessageCallback passed: {{iframe: {}, message: {payload}}}",
            ctx.frame_id
        );
        let message = serde_json::from_str(payload)
            .map_err(|e| Error::malformed_message(format!("message payload is not JSON: {e}")))?;
        self.advance(&ctx.frame_id, LifecycleEvent::Message);
        ctx.callbacks.message(MessageEvent {
            element: ctx.element.clone(),
            message,
        })
    }

    /// `scrollTo` / `scrollToOffset`: width and height carry x and y.
    fn scroll_request(&mut self, ctx: &MessageContext<P::Element>, add_offset: bool) -> Result<()> {
        let x = ctx.message.width()?;
        let y = ctx.message.height()?;
        let offset = if add_offset {
            self.position.absolute(&self.page, ctx.element.bounding_rect())
        } else {
            Position::default()
        };
        let target = Position::new(x, y).offset_by(offset);
        frame_debug!(
            ctx.log,
            frame_id = %ctx.frame_id,
            "Reposition requested from iFrame (offset x:{} y:{})",
            offset.x,
            offset.y
        );
        self.advance(&ctx.frame_id, LifecycleEvent::Message);

        if self.page.is_nested() {
            match self.page.parent_bridge() {
                Some(bridge) if add_offset => bridge.scroll_to_offset(target.x, target.y),
                Some(bridge) => bridge.scroll_to(x, y),
                None => warn!(
                    frame_id = %ctx.frame_id,
                    "Unable to scroll to requested position, parentIFrame not found"
                ),
            }
            return Ok(());
        }

        self.position.set(target);
        self.scroll_to_cached(ctx)
    }

    fn in_page_link(&mut self, ctx: &MessageContext<P::Element>) -> Result<()> {
        let location = ctx.message.payload.as_deref().unwrap_or_default();
        let hash = location.split('#').nth(1).unwrap_or_default();
        let anchor = urlencoding::decode(hash).map_err(|e| {
            Error::malformed_message(format!("in-page link #{hash} is not valid percent-encoding: {e}"))
        })?;
        self.advance(&ctx.frame_id, LifecycleEvent::Message);

        if self.page.is_nested() {
            match self.page.parent_bridge() {
                Some(bridge) => bridge.move_to_anchor(hash),
                None => frame_debug!(
                    ctx.log,
                    frame_id = %ctx.frame_id,
                    "In page link #{hash} not found and parentIFrame not found"
                ),
            }
            return Ok(());
        }

        let Some(rect) = self.page.anchor_rect(&anchor) else {
            frame_debug!(ctx.log, frame_id = %ctx.frame_id, "In page link #{hash} not found");
            return Ok(());
        };
        let target = self.position.absolute(&self.page, rect);
        frame_debug!(
            ctx.log,
            frame_id = %ctx.frame_id,
            "Moving to in page link (#{hash}) at x: {} y: {}",
            target.x,
            target.y
        );
        self.position.set(target);
        self.scroll_to_cached(ctx)
    }

    /// Scroll to the cached position unless the scroll callback vetoes it.
    /// A vetoed position is dropped.
    fn scroll_to_cached(&mut self, ctx: &MessageContext<P::Element>) -> Result<()> {
        let Some(position) = self.position.pending() else {
            return Ok(());
        };
        match ctx.callbacks.scroll(position) {
            Ok(true) => {
                if let Some(applied) = self.position.apply(&self.page) {
                    frame_debug!(ctx.log, frame_id = %ctx.frame_id, "Set page position: {applied}");
                }
                Ok(())
            }
            Ok(false) => {
                frame_debug!(ctx.log, frame_id = %ctx.frame_id, "Scroll suppressed by scroll callback");
                self.position.discard();
                Ok(())
            }
            Err(err) => {
                self.position.discard();
                Err(err)
            }
        }
    }

    fn init_from_frame(&mut self, ctx: &MessageContext<P::Element>) -> Result<()> {
        let dimensions = self.clamp(ctx)?;
        self.apply_size(&ctx.frame_id, dimensions, ctx.message.kind.as_wire())?;
        self.advance(&ctx.frame_id, LifecycleEvent::InitReceived);
        ctx.callbacks.init(&ctx.element)
    }

    fn reset_from_frame(&mut self, ctx: &MessageContext<P::Element>) -> Result<()> {
        frame_debug!(ctx.log, frame_id = %ctx.frame_id, "Size reset requested by iFrame");
        let dimensions = self.clamp(ctx)?;
        self.advance(&ctx.frame_id, LifecycleEvent::Message);
        self.reset_to(&ctx.frame_id, dimensions)
    }

    /// Host-initiated reset: reapply the last applied size, clamped, and ask
    /// the frame to re-measure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameMissing`] when the frame is closed or unknown,
    /// or the resized callback's failure.
    pub fn reset_frame(&mut self, frame_id: &str) -> Result<()> {
        let record = self
            .registry
            .get(frame_id)
            .ok_or_else(|| Error::frame_missing(frame_id))?;
        let id = record.id().clone();
        let log = record.log_enabled();
        frame_debug!(log, frame_id, "Size reset requested by host page");
        let dimensions = clamp_to_bounds(record.options(), record.last_dimensions(), &id, log)?;
        self.reset_to(&id, dimensions)
    }

    /// Apply synchronously, then send `reset` to the frame.
    fn reset_to(&mut self, frame_id: &FrameId, dimensions: Dimensions) -> Result<()> {
        self.position.capture(&self.page);
        self.apply_size(frame_id, dimensions, MessageKind::Reset.as_wire())?;
        self.trigger(frame_id.as_str(), &HostTrigger::Reset)
    }

    /// Default branch: clamp, then apply on the next animation frame when the
    /// page has them.
    fn resize(&mut self, ctx: &MessageContext<P::Element>, kind: &str) -> Result<()> {
        let dimensions = self.clamp(ctx)?;
        self.advance(&ctx.frame_id, LifecycleEvent::Message);
        if !self.page.supports_animation_frame() {
            return self.apply_size(&ctx.frame_id, dimensions, kind);
        }
        frame_debug!(ctx.log, frame_id = %ctx.frame_id, "Requesting animation frame");
        self.scheduler.request_animation_frame(Deferred::ApplySize {
            frame_id: ctx.frame_id.clone(),
            dimensions,
            kind: kind.to_string(),
        });
        Ok(())
    }

    fn clamp(&self, ctx: &MessageContext<P::Element>) -> Result<Dimensions> {
        let requested = ctx.message.dimensions()?;
        let record = self
            .registry
            .get(ctx.frame_id.as_str())
            .ok_or_else(|| Error::frame_missing(ctx.frame_id.as_str()))?;
        clamp_to_bounds(record.options(), requested, &ctx.frame_id, ctx.log)
    }

    /// Write the size to the element, restore the page position and run the
    /// resized callback. A frame closed or detached in the meantime is skipped.
    pub(crate) fn apply_size(
        &mut self,
        frame_id: &FrameId,
        dimensions: Dimensions,
        kind: &str,
    ) -> Result<()> {
        let Some(record) = self.registry.get_mut(frame_id.as_str()) else {
            debug!(frame_id = %frame_id, "Skipping size update for closed frame");
            return Ok(());
        };
        let element = record.element().clone();
        if !element.is_attached() {
            debug!(frame_id = %frame_id, "Skipping size update for detached frame");
            return Ok(());
        }

        let log = record.log_enabled();
        for axis in [Axis::Height, Axis::Width] {
            if record.options().sizes(axis) {
                let css = format!("{}px", dimensions.get(axis));
                element.set_style(axis.css_property(), &css);
                frame_debug!(log, frame_id = %frame_id, "IFrame {} set to {css}", axis.css_property());
            }
        }
        record.record_applied(dimensions);
        let callbacks = record.callbacks.clone();

        if let Some(position) = self.position.apply(&self.page) {
            frame_debug!(log, frame_id = %frame_id, "Set page position: {position}");
        }
        callbacks.resized(&ResizedEvent::new(frame_id.clone(), dimensions, kind))
    }
}

/// Clamp both axes of `requested` into the frame's bounds.
fn clamp_to_bounds(
    options: &FrameOptions,
    requested: Dimensions,
    frame_id: &FrameId,
    log: bool,
) -> Result<Dimensions> {
    let mut clamped = requested;
    for axis in [Axis::Height, Axis::Width] {
        let (min, max) = options.bounds(axis);
        let property = axis.css_property();
        frame_debug!(log, frame_id = %frame_id, "Checking {property} is in range {min}-{max:?}");
        let value = ensure_in_range(axis, requested.get(axis), min, max)?;
        match value.limit {
            Some(Limit::Min) => frame_debug!(log, frame_id = %frame_id, "Set {property} to min value"),
            Some(Limit::Max) => frame_debug!(log, frame_id = %frame_id, "Set {property} to max value"),
            None => {}
        }
        clamped = clamped.with(axis, value.value);
    }
    Ok(clamped)
}
