//! Core types, errors, and result helpers shared by the framehost crates.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod result;
pub mod types;

pub use error::{CallbackError, Error, ErrorKind};
pub use result::{Result, ResultExt};
pub use types::{Axis, Dimensions, FrameId, Position, Rect};
