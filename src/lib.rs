//! # framehost
//!
//! Command-line companion of the framehost workspace: decodes wire strings
//! and replays scripted host sessions against the in-memory page.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod decode;
pub mod replay;

pub use framehost_host;
pub use framehost_protocol;
