//! Host side of the frame messaging protocol.
//!
//! A [`HostController`] sits on the embedding page. It registers iframes,
//! answers their size reports, keeps their on-screen dimensions in bounds,
//! and relays event-channel envelopes between widget, lightbox and uploader
//! frames.
//!
//! The page itself is reached through the [`HostPage`] and [`FrameElement`]
//! traits so the controller runs the same against a browser document or the
//! in-memory [`MemoryPage`].
//!
//! # Example
//!
//! ```
//! use framehost_host::{
//!     Callbacks, FrameOptions, HostConfig, HostController, InboundMessage, MemoryPage,
//!     MessageOutcome, Target,
//! };
//!
//! let page = MemoryPage::new();
//! let frame = page.add_frame("pixlee_widget_iframe", "https://widgets.pixlee.com/w");
//!
//! let mut host = HostController::new(page, HostConfig::default());
//! host.init();
//! host.register(FrameOptions::default(), Target::Default, Callbacks::new())
//!     .unwrap();
//!
//! let outcome = host.handle_message(InboundMessage::new(
//!     "[iFrameSizer]pixlee_widget_iframe:480:640:init",
//!     "https://widgets.pixlee.com",
//! ));
//! assert_eq!(outcome, MessageOutcome::Handled);
//! # let _ = frame;
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

/// `tracing::debug!` gated on a frame's `log` option.
macro_rules! frame_debug {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            ::tracing::debug!($($arg)+);
        }
    };
}
pub(crate) use frame_debug;

pub mod actions;
pub mod config;
pub mod controller;
pub mod embed;
pub mod lifecycle;
pub mod memory;
pub mod options;
pub mod origin;
pub mod page;
pub mod position;
pub mod registry;
pub mod relay;
mod router;
pub mod scheduler;
pub mod telemetry;
pub mod visibility;

pub use actions::HostAction;
pub use config::HostConfig;
pub use controller::{FrameHandle, HostController, InboundMessage, MessageOutcome, Target};
pub use embed::{Embed, EmbedRequest};
pub use lifecycle::{Clamped, FrameState, LifecycleEvent, Limit, ensure_in_range};
pub use memory::{BridgeCall, MemoryBridge, MemoryFrame, MemoryPage, MemoryWindow};
pub use options::{
    BodyMargin, CallbackResult, Callbacks, FrameOptions, MessageEvent, ResizedEvent,
};
pub use origin::{is_accepted, remote_host, validate_origin};
pub use page::{FrameElement, HostPage, ParentBridge, Viewport, WindowOf};
pub use registry::{FrameRecord, FrameRegistry, Lookup};
pub use relay::RelayOutcome;
pub use scheduler::{Deferred, Scheduler};
pub use telemetry::{NoopTelemetry, RecordingTelemetry, TelemetrySink, TracingTelemetry};
