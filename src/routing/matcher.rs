//! Route matching logic.
//!
//! # Responsibilities
//! - Exact lookup in the server-rendered page table
//! - Ordered pattern test over dynamic routes
//! - Resolve every input to a page (404 page or error page as last resort)
//!
//! # Design Decisions
//! - Patterns are case-insensitive, matching the build's route regexes
//! - SSR dynamic routes come before HTML ones; a duplicate name keeps the
//!   SSR position but takes the HTML target
//! - Total function: there is no "no match" result

use std::collections::HashMap;

use regex::Regex;

use crate::manifest::{compile_pattern, ManifestError, Pages};
use crate::routing::normalize::{data_request_page_path, is_data_request};

/// Page identifier of the exported 404 page.
pub const NOT_FOUND_PAGE: &str = "pages/404.html";

/// Page identifier of the generic error page.
pub const ERROR_PAGE: &str = "pages/_error.js";

/// Outcome of resolving a URI. Every URI resolves to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMatch<'a> {
    /// Exact entry in the server-rendered table.
    Static(&'a str),
    /// First dynamic pattern that matched.
    Dynamic(&'a str),
    /// No route; the build exports a 404 page.
    NotFound,
    /// No route and no 404 page.
    Error,
}

impl<'a> RouteMatch<'a> {
    /// Page identifier to serve or render.
    pub fn page(&self) -> &'a str {
        match self {
            RouteMatch::Static(page) | RouteMatch::Dynamic(page) => page,
            RouteMatch::NotFound => NOT_FOUND_PAGE,
            RouteMatch::Error => ERROR_PAGE,
        }
    }

    /// Whether the page is a pre-built HTML file rather than a render target.
    pub fn is_html(&self) -> bool {
        self.page().ends_with(".html")
    }
}

#[derive(Debug)]
struct CompiledRoute {
    name: String,
    page: String,
    pattern: Regex,
}

/// Immutable page router compiled from the build manifest.
#[derive(Debug)]
pub struct RouteMatcher {
    non_dynamic: HashMap<String, String>,
    dynamic: Vec<CompiledRoute>,
    has_not_found_page: bool,
    build_id: String,
    locales: Vec<String>,
}

impl RouteMatcher {
    /// Compile the page tables. Fails only on an invalid pattern.
    pub fn new(pages: &Pages) -> Result<Self, ManifestError> {
        let mut dynamic: Vec<CompiledRoute> = Vec::new();

        for (name, route) in pages.ssr.dynamic.iter().chain(pages.html.dynamic.iter()) {
            let compiled = CompiledRoute {
                name: name.clone(),
                page: route.file.clone(),
                pattern: compile_pattern(name, &route.regex, true)?,
            };
            match dynamic.iter_mut().find(|existing| existing.name == *name) {
                Some(existing) => *existing = compiled,
                None => dynamic.push(compiled),
            }
        }

        for (order, route) in dynamic.iter().enumerate() {
            tracing::trace!(route = %route.name, page = %route.page, order, "Compiled dynamic route");
        }

        Ok(Self {
            non_dynamic: pages.ssr.non_dynamic.clone(),
            dynamic,
            has_not_found_page: pages.html.non_dynamic.contains_key("/404"),
            build_id: String::new(),
            locales: Vec::new(),
        })
    }

    /// Attach the build id used to decode data-request paths.
    pub fn with_build_id(mut self, build_id: impl Into<String>) -> Self {
        self.build_id = build_id.into();
        self
    }

    /// Attach the configured locales; a leading locale segment is ignored when resolving.
    pub fn with_locales(mut self, locales: &[String]) -> Self {
        self.locales = locales.to_vec();
        self
    }

    pub fn dynamic_len(&self) -> usize {
        self.dynamic.len()
    }

    /// Resolve a normalized page path.
    pub fn resolve(&self, uri: &str) -> RouteMatch<'_> {
        if let Some(page) = self.non_dynamic.get(uri) {
            return RouteMatch::Static(page);
        }

        if let Some(route) = self.dynamic.iter().find(|route| route.pattern.is_match(uri)) {
            return RouteMatch::Dynamic(&route.page);
        }

        if self.has_not_found_page {
            RouteMatch::NotFound
        } else {
            RouteMatch::Error
        }
    }

    /// Resolve a normalized request URI, decoding data requests and
    /// dropping a locale segment first.
    pub fn resolve_request(&self, uri: &str) -> RouteMatch<'_> {
        let page_path = if is_data_request(uri) {
            data_request_page_path(uri, &self.build_id)
        } else {
            uri.to_string()
        };
        self.resolve(self.without_locale(&page_path))
    }

    fn without_locale<'p>(&self, path: &'p str) -> &'p str {
        for locale in &self.locales {
            let Some(rest) = path.strip_prefix('/').and_then(|p| p.strip_prefix(locale.as_str())) else {
                continue;
            };
            if rest.is_empty() {
                return "/";
            }
            if rest.starts_with('/') {
                return rest;
            }
        }
        path
    }
}
