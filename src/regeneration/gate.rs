//! Staleness evaluation for served pages.
//!
//! A page is eligible for regeneration when it carries an `Expires` header,
//! or a `Last-Modified` header plus a revalidation window declared in the
//! prerender manifest. Pages regenerated after the build have `Expires`; pages
//! still in their build-time state only have the manifest window.

use chrono::{DateTime, Duration, Utc};

use crate::edge::headers::parse_http_date;
use crate::manifest::ManifestSet;
use crate::routing::normalize::page_path_for_object;

/// Directive used after a throttled enqueue: cache for one second only.
pub const THROTTLED_CACHE_CONTROL: &str = "public, max-age=0, s-maxage=1, must-revalidate";

/// Inputs for one origin-response evaluation.
#[derive(Debug, Clone, Copy)]
pub struct StaticRegenerationRequest<'a> {
    /// Object-store uri of the served page (`/isr.html`) or data payload.
    pub requested_uri: &'a str,
    pub expires: Option<&'a str>,
    pub last_modified: Option<&'a str>,
    pub manifests: &'a ManifestSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerationDecision {
    pub cache_control: String,
    pub seconds_remaining: u64,
}

impl RegenerationDecision {
    /// The page has expired and a regeneration should be triggered.
    pub fn is_due(&self) -> bool {
        self.seconds_remaining == 0
    }
}

/// CDN-cacheable, never browser-cacheable, for `seconds`.
pub fn cache_control_for(seconds: u64) -> String {
    format!("public, max-age=0, s-maxage={seconds}, must-revalidate")
}

/// Evaluate staleness at `now`. `None` means the page does not regenerate.
pub fn evaluate(request: &StaticRegenerationRequest<'_>, now: DateTime<Utc>) -> Option<RegenerationDecision> {
    let expires_at = expiry(request)?;

    let remaining_ms = (expires_at - now).num_milliseconds();
    let seconds_remaining = if remaining_ms <= 0 {
        0
    } else {
        (remaining_ms as u64).div_ceil(1000)
    };

    Some(RegenerationDecision {
        cache_control: cache_control_for(seconds_remaining),
        seconds_remaining,
    })
}

fn expiry(request: &StaticRegenerationRequest<'_>) -> Option<DateTime<Utc>> {
    if let Some(expires) = request.expires.filter(|v| !v.is_empty()) {
        match parse_http_date(expires) {
            Some(at) => return Some(at),
            None => tracing::debug!(expires, "Ignoring unparseable Expires header"),
        }
    }

    let last_modified = parse_http_date(request.last_modified?)?;
    let manifests = request.manifests;
    let page_path = page_path_for_object(
        request.requested_uri,
        manifests.base_path(),
        &manifests.build.build_id,
    );
    let revalidate = manifests.revalidate_seconds(&page_path)?;

    let window = Duration::seconds(i64::try_from(revalidate).ok()?);
    last_modified.checked_add_signed(window)
}
