//! Build manifest subsystem.
//!
//! # Data Flow
//! ```text
//! Build output (already parsed JSON):
//!     manifest.json           → build.rs     (pages, public files, build id)
//!     prerender-manifest.json → prerender.rs (revalidate windows, fallbacks)
//!     routes-manifest.json    → routes.rs    (base path, i18n)
//!     → ManifestSet::new (compile every regex once)
//!     → Arc<ManifestSet> shared read-only by all handlers
//! ```
//!
//! # Design Decisions
//! - Manifests are plain data; nothing here touches the filesystem
//! - Invalid patterns fail at startup, never per request
//! - Dynamic route order is preserved exactly as declared

pub mod build;
mod ordered;
pub mod prerender;
pub mod routes;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

pub use build::{BuildManifest, DynamicRoute, Pages, RouteTable};
pub use prerender::{FallbackRoute, PrerenderManifest, PrerenderedRoute};
pub use routes::{I18nConfig, RoutesManifest};

use crate::routing::matcher::RouteMatcher;

/// Errors raised while assembling the manifest set.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A route pattern in a manifest failed to compile.
    #[error("invalid route pattern for {route}: {source}")]
    InvalidPattern {
        route: String,
        #[source]
        source: regex::Error,
    },
}

/// Compile a manifest pattern, tagging failures with the route they belong to.
pub(crate) fn compile_pattern(
    route: &str,
    pattern: &str,
    case_insensitive: bool,
) -> Result<Regex, ManifestError> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|source| ManifestError::InvalidPattern {
            route: route.to_string(),
            source,
        })
}

/// A prerender fallback with its compiled pattern.
#[derive(Debug)]
struct CompiledFallback {
    pattern: Regex,
    fallback: Option<String>,
}

/// Immutable bundle of every manifest the edge handlers consult.
#[derive(Debug)]
pub struct ManifestSet {
    pub build: BuildManifest,
    pub prerender: PrerenderManifest,
    pub routes: RoutesManifest,
    matcher: RouteMatcher,
    fallbacks: Vec<CompiledFallback>,
}

impl ManifestSet {
    /// Assemble the manifest set, compiling all route patterns.
    pub fn new(
        build: BuildManifest,
        prerender: PrerenderManifest,
        routes: RoutesManifest,
    ) -> Result<Self, ManifestError> {
        let locales = routes
            .i18n
            .as_ref()
            .map(|i18n| i18n.locales.as_slice())
            .unwrap_or_default();
        let matcher = RouteMatcher::new(&build.pages)?
            .with_build_id(build.build_id.clone())
            .with_locales(locales);

        let fallbacks = prerender
            .dynamic_routes
            .iter()
            .map(|(name, route)| {
                Ok(CompiledFallback {
                    pattern: compile_pattern(name, &route.route_regex, false)?,
                    fallback: route.fallback.clone(),
                })
            })
            .collect::<Result<Vec<_>, ManifestError>>()?;

        tracing::info!(
            build_id = %build.build_id,
            dynamic_routes = matcher.dynamic_len(),
            fallback_routes = fallbacks.len(),
            base_path = %routes.base_path,
            i18n = routes.i18n.is_some(),
            "Manifests compiled"
        );

        Ok(Self {
            build,
            prerender,
            routes,
            matcher,
            fallbacks,
        })
    }

    /// The compiled page router.
    pub fn matcher(&self) -> &RouteMatcher {
        &self.matcher
    }

    pub fn base_path(&self) -> &str {
        &self.routes.base_path
    }

    /// First prerendered dynamic route whose pattern matches the uri.
    ///
    /// The outer `Option` is "has a fallback route at all"; the inner one is
    /// the placeholder page, which some routes do not declare.
    pub fn fallback_for(&self, uri: &str) -> Option<Option<&str>> {
        self.fallbacks
            .iter()
            .find(|f| f.pattern.is_match(uri))
            .map(|f| f.fallback.as_deref())
    }

    /// Whether `uri` names a statically exported or prerendered page.
    pub fn is_html_page(&self, uri: &str) -> bool {
        self.build.pages.html.non_dynamic.contains_key(uri)
            || self.prerender.routes.contains_key(uri)
    }

    pub fn is_public_file(&self, uri: &str) -> bool {
        self.build.public_files.contains_key(uri)
    }

    /// Revalidation window declared for a prerendered page.
    pub fn revalidate_seconds(&self, page_uri: &str) -> Option<u64> {
        self.prerender
            .routes
            .get(page_uri)
            .and_then(|route| route.initial_revalidate_seconds)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::json;

    pub(crate) fn build_manifest() -> BuildManifest {
        serde_json::from_value(json!({
            "buildId": "build-id",
            "pages": {
                "ssr": {
                    "nonDynamic": { "/api/hello": "pages/api/hello.js", "/isr": "pages/isr.js" },
                    "dynamic": {
                        "/blog/[slug]": { "file": "pages/blog/[slug].js", "regex": "^\\/blog\\/([^\\/]+?)(?:\\/)?$" }
                    }
                },
                "html": {
                    "nonDynamic": { "/terms": "pages/terms.html", "/404": "pages/404.html" },
                    "dynamic": {}
                }
            },
            "publicFiles": { "/favicon.ico": "favicon.ico" },
            "trailingSlash": false
        }))
        .expect("build manifest")
    }

    pub(crate) fn prerender_manifest() -> PrerenderManifest {
        serde_json::from_value(json!({
            "routes": { "/isr": { "initialRevalidateSeconds": 10 } },
            "dynamicRoutes": {
                "/fallback/[slug]": { "routeRegex": "^\\/fallback\\/([^\\/]+?)(?:\\/)?$", "fallback": "/fallback/[slug].html" }
            }
        }))
        .expect("prerender manifest")
    }

    pub(crate) fn manifest_set() -> ManifestSet {
        ManifestSet::new(build_manifest(), prerender_manifest(), RoutesManifest::default())
            .expect("manifest set")
    }

    pub(crate) fn i18n_routes(base_path: &str) -> RoutesManifest {
        RoutesManifest {
            base_path: base_path.to_string(),
            i18n: Some(I18nConfig {
                default_locale: "en".to_string(),
                locales: vec!["en".to_string(), "nl".to_string(), "fr-BE".to_string()],
            }),
        }
    }
}
