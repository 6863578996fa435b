//! `prerender-manifest.json`: revalidation windows and fallback pages.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::ordered;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrerenderManifest {
    /// Pages prerendered at build time, keyed by exact path.
    pub routes: HashMap<String, PrerenderedRoute>,

    /// Pattern routes that render a placeholder on first miss.
    #[serde(with = "ordered")]
    pub dynamic_routes: Vec<(String, FallbackRoute)>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrerenderedRoute {
    /// Seconds after build before the page should be regenerated.
    #[serde(deserialize_with = "revalidate_window")]
    pub initial_revalidate_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackRoute {
    pub route_regex: String,

    /// Placeholder page path (`/posts/[id].html`).
    #[serde(default, deserialize_with = "fallback_page")]
    pub fallback: Option<String>,
}

/// `false` in the manifest means "never revalidate".
fn revalidate_window<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Window {
        Seconds(u64),
        Flag(bool),
    }

    Ok(match Option::<Window>::deserialize(deserializer)? {
        Some(Window::Seconds(secs)) => Some(secs),
        Some(Window::Flag(_)) | None => None,
    })
}

/// Accepts a page path, `null`, or `false` (blocking fallback).
fn fallback_page<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Fallback {
        Page(String),
        Flag(bool),
    }

    Ok(match Option::<Fallback>::deserialize(deserializer)? {
        Some(Fallback::Page(page)) => Some(page),
        Some(Fallback::Flag(_)) | None => None,
    })
}
