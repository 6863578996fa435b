//! `routes-manifest.json`: base path and locale configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoutesManifest {
    /// Prefix under which the whole application is served (`""` or `/app`).
    pub base_path: String,

    pub i18n: Option<I18nConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct I18nConfig {
    pub default_locale: String,
    /// Configured locales, in preference order.
    pub locales: Vec<String>,
}
