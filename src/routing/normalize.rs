//! URI normalization.
//!
//! # Responsibilities
//! - Strip the configured base path
//! - Canonicalize a single trailing slash away
//! - Recognize client-side navigation data requests
//!
//! # Design Decisions
//! - Never fails: a URI outside the base path becomes the not-found sentinel
//! - Base path must match on a segment boundary (`/app` does not own `/apple`)

/// Reserved prefix of client-side navigation payload requests.
pub const DATA_REQUEST_PREFIX: &str = "/_next/data";

/// Path every out-of-base-path URI is routed to.
pub const NOT_FOUND_PATH: &str = "/404";

/// Result of normalizing a raw request URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedUri {
    /// Application path with base path and trailing slash removed.
    Path(String),
    /// The URI does not live under the configured base path.
    OutsideBasePath,
}

impl NormalizedUri {
    /// Normalize `raw` against `base_path`.
    pub fn new(raw: &str, base_path: &str) -> Self {
        let mut uri = raw;

        if !base_path.is_empty() {
            match strip_base_path(uri, base_path) {
                Some(rest) => uri = rest,
                None => return NormalizedUri::OutsideBasePath,
            }
        }

        let uri = uri.strip_suffix('/').unwrap_or(uri);

        if uri.is_empty() {
            NormalizedUri::Path("/".to_string())
        } else {
            NormalizedUri::Path(uri.to_string())
        }
    }

    /// The path used for lookups; the sentinel reads as `/404`.
    pub fn as_str(&self) -> &str {
        match self {
            NormalizedUri::Path(path) => path,
            NormalizedUri::OutsideBasePath => NOT_FOUND_PATH,
        }
    }

    pub fn is_outside_base_path(&self) -> bool {
        matches!(self, NormalizedUri::OutsideBasePath)
    }
}

/// Strip `base_path` from `uri` when it is a whole-segment prefix.
pub fn strip_base_path<'a>(uri: &'a str, base_path: &str) -> Option<&'a str> {
    let rest = uri.strip_prefix(base_path)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

pub fn is_data_request(uri: &str) -> bool {
    uri.starts_with(DATA_REQUEST_PREFIX)
}

/// Page path addressed by a data request (`/_next/data/<build>/a.json` → `/a`).
pub fn data_request_page_path(uri: &str, build_id: &str) -> String {
    let prefix = format!("{DATA_REQUEST_PREFIX}/{build_id}");
    let path = uri.strip_prefix(&prefix).unwrap_or(uri);
    let path = path.strip_suffix(".json").unwrap_or(path);

    match path {
        "" | "/index" => "/".to_string(),
        other => other.to_string(),
    }
}

/// Page path behind an object-store key (`/blog/a.html` → `/blog/a`, `/index.html` → `/`).
pub fn page_path_from_origin_uri(uri: &str) -> String {
    let path = uri.strip_suffix(".html").unwrap_or(uri);
    match path {
        "" | "index" | "/index" => "/".to_string(),
        other if other.starts_with('/') => other.to_string(),
        other => format!("/{other}"),
    }
}

/// Page path behind a served object, whether an HTML page (`/isr.html`) or a
/// data payload (`<basePath>/_next/data/<build>/isr.json`).
pub fn page_path_for_object(uri: &str, base_path: &str, build_id: &str) -> String {
    let data_uri = if base_path.is_empty() {
        Some(uri)
    } else {
        strip_base_path(uri, base_path)
    }
    .filter(|path| is_data_request(path));

    match data_uri {
        Some(path) => data_request_page_path(path, build_id),
        None => page_path_from_origin_uri(uri),
    }
}
