//! Widget embed builder: the id and `src` of a new widget frame.

use framehost_core::{Error, FrameId, Result};
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

/// A widget frame ready to be inserted and registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub id: FrameId,
    pub src: Url,
}

/// Parameters of a widget embed, as the embedding page passes them
/// (`widgetId`, `apiKey`, `type`, ...).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbedRequest {
    pub api_key: Option<String>,
    pub widget_id: Option<String>,
    #[serde(rename = "type")]
    pub widget_type: Option<String>,
    pub recipe_id: Option<String>,
    pub display_options_id: Option<String>,
    pub account_id: Option<String>,
    pub display_options: Option<String>,
    pub recipe: Option<String>,
    pub preview_mode: Option<String>,
    pub is_facebook: Option<String>,
    pub ab_test: bool,
    /// `Some(false)` turns the widget's own lightbox off.
    pub lightbox: Option<bool>,
}

impl EmbedRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn widget_id(mut self, id: impl Into<String>) -> Self {
        self.widget_id = Some(id.into());
        self
    }

    /// Ad-hoc widget definition, used only when no widget id is set.
    #[must_use]
    pub fn ad_hoc(
        mut self,
        widget_type: impl Into<String>,
        recipe_id: impl Into<String>,
        display_options_id: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        self.widget_type = Some(widget_type.into());
        self.recipe_id = Some(recipe_id.into());
        self.display_options_id = Some(display_options_id.into());
        self.account_id = Some(account_id.into());
        self
    }

    #[must_use]
    pub fn lightbox(mut self, enabled: bool) -> Self {
        self.lightbox = Some(enabled);
        self
    }

    /// Build the frame id (`<id_marker><uuid>`) and `src`.
    ///
    /// `parent_url` is the embedding page's location; its query and fragment
    /// are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Managed`] when the request names neither a widget id
    /// nor a widget type, and [`Error::InvalidConfig`] when `root_url` is not
    /// an absolute URL.
    pub fn build(&self, root_url: &str, parent_url: &str, id_marker: &str) -> Result<Embed> {
        if self.widget_id.is_none() && self.widget_type.is_none() {
            return Err(Error::managed(
                "Invalid argument: embed needs a widget id or a widget type",
            ));
        }
        let mut src = Url::parse(root_url)
            .map_err(|e| Error::invalid_config(format!("invalid widget root URL: {e}")))?;

        if let Some(widget_id) = &self.widget_id {
            set_param(&mut src, "widget_id", widget_id);
        }
        let optional = [
            ("display_options", &self.display_options),
            ("recipe", &self.recipe),
            ("previewMode", &self.preview_mode),
            ("is_facebook", &self.is_facebook),
        ];
        for (name, value) in present(optional) {
            set_param(&mut src, name, value);
        }
        if self.ab_test {
            set_param(&mut src, "ab_test", "true");
        }
        if self.lightbox == Some(false) {
            set_param(&mut src, "show_lightbox", "false");
        }
        if let Some(key) = &self.api_key {
            set_param(&mut src, "api_key", key);
        }
        if self.widget_id.is_none() {
            let ad_hoc = [
                ("type", &self.widget_type),
                ("recipe_id", &self.recipe_id),
                ("display_options_id", &self.display_options_id),
                ("account_id", &self.account_id),
            ];
            for (name, value) in present(ad_hoc) {
                set_param(&mut src, name, value);
            }
        }
        set_param(&mut src, "parent_url", strip_query_and_fragment(parent_url));

        Ok(Embed {
            id: FrameId::from(format!("{id_marker}{}", Uuid::new_v4())),
            src,
        })
    }
}

fn present<'a, const N: usize>(
    params: [(&'static str, &'a Option<String>); N],
) -> impl Iterator<Item = (&'static str, &'a str)> {
    params
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|value| (name, value)))
}

/// Set `name` to `value`, dropping any earlier value for `name`.
fn set_param(url: &mut Url, name: &str, value: &str) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(key, val)| (key.into_owned(), val.into_owned()))
        .collect();
    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    for (key, val) in &kept {
        pairs.append_pair(key, val);
    }
    pairs.append_pair(name, value);
}

fn strip_query_and_fragment(location: &str) -> &str {
    location.split(['?', '#']).next().unwrap_or(location)
}
