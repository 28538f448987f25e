//! Actions frames ask the host page to perform.

use std::fmt;

use crate::page::FrameElement;

/// Top-most stacking level, used for the lightbox overlay.
pub const TOP_Z_INDEX: &str = "2147483647";

/// An action event, keyed by its name with the namespace removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    /// Remove the widget frame that sent the event.
    CloseWidget,
    /// Scroll the page back to the origin.
    ScrollTopFix,
    ShowLightbox,
    HideLightbox,
    CloseUploader,
    /// Accepted and ignored.
    Unknown(String),
}

impl HostAction {
    #[must_use]
    pub fn parse(local_name: &str) -> Self {
        match local_name {
            "close:widget" => Self::CloseWidget,
            "scroll:top:fix" => Self::ScrollTopFix,
            "show:lightbox" => Self::ShowLightbox,
            "hide:lightbox" => Self::HideLightbox,
            "close:uploader" => Self::CloseUploader,
            other => Self::Unknown(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CloseWidget => "close:widget",
            Self::ScrollTopFix => "scroll:top:fix",
            Self::ShowLightbox => "show:lightbox",
            Self::HideLightbox => "hide:lightbox",
            Self::CloseUploader => "close:uploader",
            Self::Unknown(other) => other,
        }
    }
}

impl fmt::Display for HostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bring the lightbox frame on screen above everything else.
pub fn show_lightbox<E: FrameElement>(lightbox: &E) {
    lightbox.set_style("display", "");
    lightbox.set_style("-webkit-transform", "translatez(0)");
    lightbox.set_style("position", "fixed");
    lightbox.set_style("z-index", TOP_Z_INDEX);
}

pub fn hide_lightbox<E: FrameElement>(lightbox: &E) {
    lightbox.set_style("display", "none");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryPage;

    #[test]
    fn test_parse_round_trips_names() {
        for name in [
            "close:widget",
            "scroll:top:fix",
            "show:lightbox",
            "hide:lightbox",
            "close:uploader",
            "open:lightbox",
        ] {
            assert_eq!(HostAction::parse(name).as_str(), name);
        }
        assert_eq!(
            HostAction::parse("open:lightbox"),
            HostAction::Unknown("open:lightbox".to_string())
        );
    }

    #[test]
    fn test_show_then_hide_lightbox() {
        let page = MemoryPage::new();
        let lightbox = page.add_frame("pixlee_lightbox_iframe", "");
        lightbox.set_style("display", "none");

        show_lightbox(&lightbox);
        assert_eq!(lightbox.style("display").as_deref(), Some(""));
        assert_eq!(lightbox.style("position").as_deref(), Some("fixed"));
        assert_eq!(lightbox.style("z-index").as_deref(), Some(TOP_Z_INDEX));

        hide_lightbox(&lightbox);
        assert_eq!(lightbox.style("display").as_deref(), Some("none"));
    }
}
