//! Telemetry seam.
//!
//! The controller hands every surfaced error to a [`TelemetrySink`] before
//! reporting it to the page. Capture is best-effort and infallible: a sink
//! swallows its own failures.

use std::cell::RefCell;

use framehost_core::{Error, ErrorKind};
use tracing::error;

/// Receives captured errors.
pub trait TelemetrySink {
    fn capture(&self, error: &Error);
}

/// Logs captured errors through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn capture(&self, err: &Error) {
        error!(kind = %err.kind(), error = %err, "Captured exception");
    }
}

/// Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn capture(&self, _error: &Error) {}
}

/// Keeps the kind and message of every capture.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    captured: RefCell<Vec<(ErrorKind, String)>>,
}

impl RecordingTelemetry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn captured(&self) -> Vec<(ErrorKind, String)> {
        self.captured.borrow().clone()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn capture(&self, err: &Error) {
        self.captured.borrow_mut().push((err.kind(), err.to_string()));
    }
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for std::rc::Rc<T> {
    fn capture(&self, err: &Error) {
        (**self).capture(err);
    }
}
