//! Redirect policy.
//!
//! # Responsibilities
//! - Canonicalize trailing slashes before any route resolution
//! - Build the redirect target with the original querystring
//!
//! # Design Decisions
//! - Data requests and public files never keep a trailing slash
//! - Pages follow the build's `trailingSlash` setting
//! - `/`, empty and out-of-base-path URIs are never redirected; browsers
//!   append a slash to the bare origin and that would loop

use crate::routing::normalize::NormalizedUri;

/// A terminal redirect disposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub status: u16,
    pub status_description: &'static str,
    pub location: String,
}

impl Redirect {
    /// 308: permanent and method-preserving.
    pub fn permanent(uri: &str, querystring: &str) -> Self {
        Self {
            status: 308,
            status_description: "Permanent Redirect",
            location: with_querystring(uri, querystring),
        }
    }

    /// 307: depends on request headers, so it must not be cached as permanent.
    pub fn temporary(uri: &str, querystring: &str) -> Self {
        Self {
            status: 307,
            status_description: "Temporary Redirect",
            location: with_querystring(uri, querystring),
        }
    }
}

fn with_querystring(uri: &str, querystring: &str) -> String {
    if querystring.is_empty() {
        uri.to_string()
    } else {
        format!("{uri}?{querystring}")
    }
}

/// Trailing-slash canonicalization rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedirectPolicy {
    trailing_slash: bool,
}

impl RedirectPolicy {
    pub fn new(trailing_slash: bool) -> Self {
        Self { trailing_slash }
    }

    /// Decide whether `original_uri` must be redirected before resolution.
    pub fn decide(
        &self,
        original_uri: &str,
        normalized: &NormalizedUri,
        is_data_request: bool,
        is_static_asset: bool,
        querystring: &str,
    ) -> Option<Redirect> {
        let target = if is_data_request || is_static_asset {
            original_uri.strip_suffix('/').map(str::to_string)
        } else if original_uri == "/" || original_uri.is_empty() || normalized.is_outside_base_path() {
            None
        } else if self.trailing_slash {
            (!original_uri.ends_with('/')).then(|| format!("{original_uri}/"))
        } else {
            original_uri.strip_suffix('/').map(str::to_string)
        };

        target.map(|uri| Redirect::permanent(&uri, querystring))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decide(policy: RedirectPolicy, uri: &str, data: bool, asset: bool) -> Option<String> {
        let normalized = NormalizedUri::new(uri, "");
        policy.decide(uri, &normalized, data, asset, "").map(|r| r.location)
    }

    #[test]
    fn test_data_and_assets_lose_trailing_slash() {
        let policy = RedirectPolicy::new(true);
        assert_eq!(
            decide(policy, "/_next/data/b/a.json/", true, false),
            Some("/_next/data/b/a.json".into())
        );
        assert_eq!(decide(policy, "/favicon.ico/", false, true), Some("/favicon.ico".into()));
        assert_eq!(decide(policy, "/favicon.ico", false, true), None);
    }

    #[test]
    fn test_page_policy_without_trailing_slash() {
        let policy = RedirectPolicy::new(false);
        assert_eq!(decide(policy, "/about/", false, false), Some("/about".into()));
        assert_eq!(decide(policy, "/about", false, false), None);
    }

    #[test]
    fn test_page_policy_with_trailing_slash() {
        let policy = RedirectPolicy::new(true);
        assert_eq!(decide(policy, "/about", false, false), Some("/about/".into()));
        assert_eq!(decide(policy, "/about/", false, false), None);
    }

    #[test]
    fn test_root_and_outside_base_path_never_redirect() {
        for trailing in [true, false] {
            let policy = RedirectPolicy::new(trailing);
            assert_eq!(decide(policy, "/", false, false), None);
            assert_eq!(decide(policy, "", false, false), None);

            let outside = NormalizedUri::new("/elsewhere", "/app");
            assert_eq!(policy.decide("/elsewhere", &outside, false, false, ""), None);
        }
    }

    #[test]
    fn test_redirect_carries_querystring() {
        let policy = RedirectPolicy::new(false);
        let normalized = NormalizedUri::new("/about/", "");
        let redirect = policy.decide("/about/", &normalized, false, false, "a=1&b=2").unwrap();
        assert_eq!(redirect.status, 308);
        assert_eq!(redirect.location, "/about?a=1&b=2");
    }
}
