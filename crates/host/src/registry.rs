//! Frame registry: the only owner of per-frame configuration and runtime state.

use std::collections::HashMap;

use framehost_core::{Dimensions, Error, FrameId, Result};
use tracing::debug;

use crate::lifecycle::{FrameState, LifecycleEvent};
use crate::options::{Callbacks, FrameOptions};
use crate::page::FrameElement;

/// Registry entry for one frame.
#[derive(Debug)]
pub struct FrameRecord<E> {
    id: FrameId,
    element: E,
    pub(crate) options: FrameOptions,
    pub(crate) callbacks: Callbacks<E>,
    state: FrameState,
    last: Dimensions,
    log_enabled: bool,
    was_seen_visible: bool,
}

impl<E: FrameElement> FrameRecord<E> {
    #[must_use]
    pub const fn id(&self) -> &FrameId {
        &self.id
    }

    #[must_use]
    pub const fn element(&self) -> &E {
        &self.element
    }

    #[must_use]
    pub const fn options(&self) -> &FrameOptions {
        &self.options
    }

    #[must_use]
    pub const fn state(&self) -> FrameState {
        self.state
    }

    /// Last applied dimensions.
    #[must_use]
    pub const fn last_dimensions(&self) -> Dimensions {
        self.last
    }

    #[must_use]
    pub const fn log_enabled(&self) -> bool {
        self.log_enabled
    }

    #[must_use]
    pub const fn was_seen_visible(&self) -> bool {
        self.was_seen_visible
    }

    pub(crate) fn advance(&mut self, event: LifecycleEvent) {
        self.state = self.state.next(event);
    }

    pub(crate) fn record_applied(&mut self, dimensions: Dimensions) {
        self.last = dimensions;
    }

    /// Latch the visibility flag. Returns `true` only the first time.
    pub(crate) fn mark_seen_visible(&mut self) -> bool {
        !std::mem::replace(&mut self.was_seen_visible, true)
    }

    pub(crate) fn refresh_log_flag(&mut self) -> bool {
        self.log_enabled = self.options.log;
        self.log_enabled
    }
}

/// Outcome of a registry lookup. A closed frame and an unknown frame are
/// different situations: the first is a late message, the second a protocol error.
#[derive(Debug)]
pub enum Lookup<T> {
    Active(T),
    Closed,
    NotFound,
}

/// Map from frame id to [`FrameRecord`].
#[derive(Debug)]
pub struct FrameRegistry<E> {
    records: HashMap<FrameId, FrameRecord<E>>,
    auto_id_prefix: String,
    next_auto_id: u64,
}

impl<E: FrameElement> FrameRegistry<E> {
    pub fn new(auto_id_prefix: impl Into<String>) -> Self {
        Self {
            records: HashMap::new(),
            auto_id_prefix: auto_id_prefix.into(),
            next_auto_id: 0,
        }
    }

    /// Register `element` and return its id.
    ///
    /// Bounds are validated before the element is touched. An element
    /// without an id gets `<prefix><n>`. Re-registering an id that is not
    /// closed swaps configuration and callbacks but keeps state, last
    /// dimensions and the visibility flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] when `min > max` on either axis.
    pub fn register(
        &mut self,
        element: &E,
        options: FrameOptions,
        callbacks: Callbacks<E>,
    ) -> Result<FrameId> {
        options.validate()?;

        let id = self.ensure_has_id(element, options.log);
        apply_scrolling(element, &options);
        apply_limits(element, &options);

        match self.records.get_mut(&id) {
            Some(record) if !record.state.is_closed() => {
                debug!(frame_id = %id, state = %record.state, "Replacing configuration of registered frame");
                record.element = element.clone();
                record.options = options;
                record.callbacks = callbacks;
                record.refresh_log_flag();
            }
            _ => {
                let log_enabled = options.log;
                self.records.insert(
                    id.clone(),
                    FrameRecord {
                        id: id.clone(),
                        element: element.clone(),
                        options,
                        callbacks,
                        state: FrameState::Registered,
                        last: Dimensions::default(),
                        log_enabled,
                        was_seen_visible: false,
                    },
                );
            }
        }

        Ok(id)
    }

    fn ensure_has_id(&mut self, element: &E, log: bool) -> FrameId {
        let existing = element.id();
        if !existing.is_empty() {
            return FrameId::from(existing);
        }

        let id = loop {
            let candidate = FrameId::from(format!("{}{}", self.auto_id_prefix, self.next_auto_id));
            self.next_auto_id = self.next_auto_id.saturating_add(1);
            if !self.records.contains_key(&candidate) {
                break candidate;
            }
        };
        element.set_id(id.as_str());
        if log {
            debug!(frame_id = %id, src = %element.src(), "Added missing iframe ID");
        }
        id
    }

    pub fn lookup(&self, id: &str) -> Lookup<&FrameRecord<E>> {
        match self.records.get(id) {
            Some(record) if record.state.is_closed() => Lookup::Closed,
            Some(record) => Lookup::Active(record),
            None => Lookup::NotFound,
        }
    }

    pub fn lookup_mut(&mut self, id: &str) -> Lookup<&mut FrameRecord<E>> {
        match self.records.get_mut(id) {
            Some(record) if record.state.is_closed() => Lookup::Closed,
            Some(record) => Lookup::Active(record),
            None => Lookup::NotFound,
        }
    }

    /// Active record, if any.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FrameRecord<E>> {
        match self.lookup(id) {
            Lookup::Active(record) => Some(record),
            Lookup::Closed | Lookup::NotFound => None,
        }
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut FrameRecord<E>> {
        match self.lookup_mut(id) {
            Lookup::Active(record) => Some(record),
            Lookup::Closed | Lookup::NotFound => None,
        }
    }

    /// Any record, closed or not.
    #[must_use]
    pub fn record(&self, id: &str) -> Option<&FrameRecord<E>> {
        self.records.get(id)
    }

    /// Detach the element, mark the record closed and run the closed
    /// callback. Closing a closed frame does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameMissing`] for an unknown id, or the closed
    /// callback's failure.
    pub fn close(&mut self, id: &str) -> Result<()> {
        let record = match self.lookup_mut(id) {
            Lookup::Active(record) => record,
            Lookup::Closed => return Ok(()),
            Lookup::NotFound => return Err(Error::frame_missing(id)),
        };

        if record.log_enabled {
            debug!(frame_id = %id, "Removing iFrame");
        }
        record.element.detach();
        record.advance(LifecycleEvent::Closed);
        let callbacks = record.callbacks.clone();
        let frame_id = record.id.clone();
        callbacks.closed(&frame_id)
    }

    /// Mark a frame closed after its element left the document without
    /// going through [`FrameRegistry::close`]. No callbacks run.
    pub fn mark_removed(&mut self, id: &str) {
        if let Some(record) = self.get_mut(id) {
            record.advance(LifecycleEvent::Closed);
        }
    }

    /// Ids of every active frame.
    #[must_use]
    pub fn active_ids(&self) -> Vec<FrameId> {
        let mut ids: Vec<FrameId> = self
            .records
            .values()
            .filter(|record| !record.state.is_closed())
            .map(|record| record.id.clone())
            .collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Forget every record. Auto-id numbering continues.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

fn apply_scrolling<E: FrameElement>(element: &E, options: &FrameOptions) {
    let (overflow, scrolling) = if options.scrolling {
        ("auto", "yes")
    } else {
        ("hidden", "no")
    };
    if options.log {
        debug!(
            frame_id = %element.id(),
            enabled = options.scrolling,
            "IFrame scrolling"
        );
    }
    element.set_style("overflow", overflow);
    element.set_scrolling(scrolling);
}

/// Write CSS for every bound that is finite and non-zero.
fn apply_limits<E: FrameElement>(element: &E, options: &FrameOptions) {
    let limits = [
        ("max-height", options.max_height),
        ("min-height", Some(options.min_height)),
        ("max-width", options.max_width),
        ("min-width", Some(options.min_width)),
    ];
    for (property, value) in limits {
        if let Some(value) = value.filter(|v| *v != 0) {
            let css = format!("{value}px");
            if options.log {
                debug!(frame_id = %element.id(), property, value = %css, "Set limit");
            }
            element.set_style(property, &css);
        }
    }
}
