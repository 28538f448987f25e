//! Result type definition and extension traits for Railway-Oriented Programming.
//!
//! Provides functional combinators for Result types, enabling clean error handling
//! without unwrap/expect/panic.

use crate::error::Error;

/// The standard Result type for framehost operations.
///
/// # Examples
///
/// ```ignore
/// fn register() -> Result<FrameId> {
///     let options = FrameOptions::from_json(&value)?;
///     Ok(registry.register(&element, options, callbacks)?)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait providing safe combinators for Results.
///
/// This trait provides ergonomic methods that avoid the need for unwrap/expect.
pub trait ResultExt<T> {
    /// Convert a Result to an Option, logging the error if present.
    fn into_option_logged(self) -> Option<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn into_option_logged(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(kind = %e.kind(), "Operation failed: {}", e);
                None
            }
        }
    }
}
