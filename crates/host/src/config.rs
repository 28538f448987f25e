//! Controller-level configuration.
//!
//! Everything here has a default matching the production embed, so an empty
//! TOML document is a valid configuration.

use std::path::Path;

use framehost_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Settings shared by every frame the controller manages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Prefix of every event-channel name.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Substrings that mark an event-channel sender origin as trusted.
    #[serde(default = "default_trusted_origin_markers")]
    pub trusted_origin_markers: Vec<String>,

    /// Id substring shared by all widget frames.
    #[serde(default = "default_widget_id_marker")]
    pub widget_id_marker: String,

    /// Id substring shared by every frame the `all` destination reaches.
    #[serde(default = "default_managed_id_marker")]
    pub managed_id_marker: String,

    #[serde(default = "default_lightbox_id")]
    pub lightbox_id: String,

    #[serde(default = "default_uploader_id")]
    pub uploader_id: String,

    #[serde(default = "default_social_auth_id")]
    pub social_auth_id: String,

    /// Prefix for ids assigned to frames registered without one.
    #[serde(default = "default_auto_id_prefix")]
    pub auto_id_prefix: String,

    /// Selector used when registration names no target.
    #[serde(default = "default_selector")]
    pub default_selector: String,

    /// Consumer-facing event names to re-emit to the embedding page
    /// (`photoOpened`, `widgetLoaded`, ...).
    #[serde(default)]
    pub subscribed_events: Vec<String>,

    /// Minimum spacing of infinite-scroll load requests.
    #[serde(default = "default_load_more_throttle_ms")]
    pub load_more_throttle_ms: u64,

    /// Fraction of a widget's bottom edge left unscrolled when more content
    /// is requested.
    #[serde(default = "default_load_more_ratio")]
    pub load_more_ratio: f64,
}

fn default_namespace() -> String {
    "pixlee:".to_string()
}

fn default_trusted_origin_markers() -> Vec<String> {
    vec!["pixlee".to_string(), "ngrok".to_string()]
}

fn default_widget_id_marker() -> String {
    "pixlee_widget_iframe".to_string()
}

fn default_managed_id_marker() -> String {
    "pixlee".to_string()
}

fn default_lightbox_id() -> String {
    "pixlee_lightbox_iframe".to_string()
}

fn default_uploader_id() -> String {
    "pixlee_uploader".to_string()
}

fn default_social_auth_id() -> String {
    "pixlee_social_auth".to_string()
}

fn default_auto_id_prefix() -> String {
    "iFrameResizer".to_string()
}

fn default_selector() -> String {
    "iframe".to_string()
}

const fn default_load_more_throttle_ms() -> u64 {
    500
}

const fn default_load_more_ratio() -> f64 {
    0.25
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            trusted_origin_markers: default_trusted_origin_markers(),
            widget_id_marker: default_widget_id_marker(),
            managed_id_marker: default_managed_id_marker(),
            lightbox_id: default_lightbox_id(),
            uploader_id: default_uploader_id(),
            social_auth_id: default_social_auth_id(),
            auto_id_prefix: default_auto_id_prefix(),
            default_selector: default_selector(),
            subscribed_events: Vec::new(),
            load_more_throttle_ms: default_load_more_throttle_ms(),
            load_more_ratio: default_load_more_ratio(),
        }
    }
}

impl HostConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] on a syntax error, a wrong value
    /// type, or a value [`HostConfig::validate`] rejects.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| Error::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the file can not be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Subscribe to consumer-facing events.
    #[must_use]
    pub fn subscribe<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subscribed_events.extend(events.into_iter().map(Into::into));
        self
    }

    /// Check values serde can not.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an empty namespace or marker, or
    /// a load-more ratio outside `0..=1`.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(Error::invalid_config("namespace must not be empty"));
        }
        if self.widget_id_marker.is_empty() || self.managed_id_marker.is_empty() {
            return Err(Error::invalid_config("frame id markers must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.load_more_ratio) {
            return Err(Error::invalid_config(format!(
                "load_more_ratio must be between 0 and 1, got {}",
                self.load_more_ratio
            )));
        }
        Ok(())
    }

    /// Fully namespaced event name.
    #[must_use]
    pub fn event_name(&self, local: &str) -> String {
        format!("{}{local}", self.namespace)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::io::Write;

    use super::*;
    use framehost_core::ErrorKind;

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(HostConfig::from_toml_str("").unwrap(), HostConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = HostConfig::from_toml_str(
            r#"
            namespace = "acme:"
            subscribed_events = ["photoOpened", "widgetLoaded"]
            load_more_throttle_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.namespace, "acme:");
        assert_eq!(config.subscribed_events.len(), 2);
        assert_eq!(config.load_more_throttle_ms, 250);
        assert_eq!(config.widget_id_marker, "pixlee_widget_iframe");
        assert_eq!(config.event_name("widget:visible"), "acme:widget:visible");
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        let err = HostConfig::from_toml_str("load_more_ratio = 3.0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let err = HostConfig::from_toml_str("namespace = 7").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "lightbox_id = \"custom_lightbox\"").unwrap();
        let config = HostConfig::load(file.path()).unwrap();
        assert_eq!(config.lightbox_id, "custom_lightbox");

        let missing = HostConfig::load(Path::new("/definitely/not/here.toml"));
        assert!(missing.is_err());
    }
}
