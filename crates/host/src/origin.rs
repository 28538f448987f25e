//! Origin validation for size-channel messages and origin trust for the
//! event channel.

use framehost_core::{Error, Result};

/// Opaque origin reported for sandboxed frames and `file:` pages.
pub const OPAQUE_ORIGIN: &str = "null";

/// Scheme, host and port prefix of a frame `src`: everything before the third `/`.
///
/// `https://a.example.com:8443/widget?x=1` yields `https://a.example.com:8443`.
#[must_use]
pub fn remote_host(src: &str) -> String {
    src.split('/').take(3).collect::<Vec<_>>().join("/")
}

/// Decide whether a size-channel message claiming `origin` may address a
/// frame loaded from `src`.
#[must_use]
pub fn is_accepted(origin: &str, src: &str, check_origin: bool) -> bool {
    !check_origin || origin == OPAQUE_ORIGIN || origin == remote_host(src)
}

/// Validate the claimed origin of a size-channel message.
///
/// # Errors
///
/// Returns [`Error::CrossOrigin`] when origin checking is enabled for the
/// frame and the origin matches neither the frame's remote host nor the
/// opaque origin. Only the offending message is rejected.
pub fn validate_origin(
    origin: &str,
    src: &str,
    check_origin: bool,
    frame_id: &str,
    raw: &str,
) -> Result<()> {
    if is_accepted(origin, src, check_origin) {
        Ok(())
    } else {
        Err(Error::cross_origin(origin, frame_id, raw))
    }
}

/// Event-channel trust: the sender's origin contains one of `markers`.
#[must_use]
pub fn has_trusted_marker(origin: &str, markers: &[String]) -> bool {
    markers.iter().any(|marker| origin.contains(marker.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use framehost_core::ErrorKind;

    const SRC: &str = "https://a.example.com/x";

    #[test]
    fn test_remote_host_prefix() {
        assert_eq!(remote_host(SRC), "https://a.example.com");
        assert_eq!(
            remote_host("http://localhost:8080/a/b/c"),
            "http://localhost:8080"
        );
        assert_eq!(remote_host("about:blank"), "about:blank");
        assert_eq!(remote_host(""), "");
    }

    #[test]
    fn test_matching_origin_accepted() {
        assert!(validate_origin("https://a.example.com", SRC, true, "f1", "m").is_ok());
    }

    #[test]
    fn test_foreign_origin_rejected() {
        let err = validate_origin("https://evil.example.com", SRC, true, "f1", "m");
        assert!(matches!(err, Err(ref e) if e.kind() == ErrorKind::Protocol));
    }

    #[test]
    fn test_opaque_origin_accepted_regardless_of_src() {
        assert!(is_accepted("null", SRC, true));
        assert!(is_accepted("null", "", true));
    }

    #[test]
    fn test_disabled_check_accepts_anything() {
        assert!(is_accepted("https://evil.example.com", SRC, false));
    }

    #[test]
    fn test_origin_prefix_is_not_enough() {
        assert!(!is_accepted("https://a.example.com.evil.net", SRC, true));
        assert!(!is_accepted("https://a.example", SRC, true));
    }

    #[test]
    fn test_trusted_markers() {
        let markers = vec!["pixlee".to_string(), "ngrok".to_string()];
        assert!(has_trusted_marker("https://instafeed.pixlee.com", &markers));
        assert!(has_trusted_marker("https://ab12.ngrok.io", &markers));
        assert!(!has_trusted_marker("https://shop.example.com", &markers));
    }
}
