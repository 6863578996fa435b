//! Object-store origin helpers.
//!
//! # Responsibilities
//! - Rewrite the origin domain to the regional endpoint
//! - Point a request at a key prefix (`static-pages`, `public`)
//! - Derive bucket name and region for writes and queue messages

use thiserror::Error;

use crate::edge::event::{EdgeRequest, S3Origin};

/// Region whose global endpoint needs no rewriting.
const GLOBAL_REGION: &str = "us-east-1";

/// Key prefix of exported and regenerated HTML pages.
pub const STATIC_PAGES_PREFIX: &str = "static-pages";

/// Key prefix of public files.
pub const PUBLIC_PREFIX: &str = "public";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginError {
    #[error("Expected bucket name to be defined")]
    MissingBucketName,

    #[error("Expected region to be defined")]
    MissingRegion,
}

/// Regional endpoint for the origin's bucket.
///
/// The global endpoint is kept for `us-east-1` and for domains that already
/// name their region.
pub fn normalize_s3_domain(origin: &S3Origin) -> String {
    if origin.region == GLOBAL_REGION || origin.region.is_empty() {
        return origin.domain_name.clone();
    }

    if origin.domain_name.contains(&origin.region) {
        return origin.domain_name.clone();
    }

    origin.domain_name.replacen(
        "s3.amazonaws.com",
        &format!("s3.{}.amazonaws.com", origin.region),
        1,
    )
}

/// Bucket name and region of the request's origin.
pub fn bucket_and_region(request: &EdgeRequest) -> Result<(String, String), OriginError> {
    let origin = request.s3_origin().ok_or(OriginError::MissingBucketName)?;

    if origin.region.is_empty() {
        return Err(OriginError::MissingRegion);
    }

    let regional_suffix = format!(".s3.{}.amazonaws.com", origin.region);
    let bucket = origin
        .domain_name
        .strip_suffix(&regional_suffix)
        .or_else(|| origin.domain_name.strip_suffix(".s3.amazonaws.com"))
        .unwrap_or(&origin.domain_name);

    if bucket.is_empty() {
        return Err(OriginError::MissingBucketName);
    }

    Ok((bucket.to_string(), origin.region.clone()))
}

/// Join a base path and a prefix into an origin path (`/app/static-pages`).
pub fn origin_path(base_path: &str, prefix: &str) -> String {
    format!("{base_path}/{prefix}")
}

/// Bucket-relative key of an object under `base_path/prefix`, with `path` starting at `/`.
pub fn object_key(base_path: &str, prefix: &str, path: &str) -> String {
    let key = format!("{}{path}", origin_path(base_path, prefix));
    key.trim_start_matches('/').to_string()
}

/// Rewrite the request so the CDN fetches it from the object store.
///
/// `origin_path` of `None` keeps the configured path. The host header always
/// follows the (normalized) origin domain.
pub fn forward_to_store(request: &mut EdgeRequest, origin_path: Option<String>) {
    let Some(origin) = request.s3_origin_mut() else {
        tracing::warn!(uri = %request.uri, "Request has no object-store origin, forwarding unchanged");
        return;
    };

    origin.domain_name = normalize_s3_domain(origin);
    if let Some(path) = origin_path {
        origin.path = path;
    }
    let host = origin.domain_name.clone();
    request.headers.set("host", host);
}

/// Key the CDN would read for a forwarded request.
pub fn forwarded_key(request: &EdgeRequest) -> String {
    let path = request
        .s3_origin()
        .map(|origin| origin.path.as_str())
        .unwrap_or_default();
    format!("{path}{}", request.uri)
        .trim_start_matches('/')
        .to_string()
}
