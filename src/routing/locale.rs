//! Locale prefix handling.
//!
//! # Responsibilities
//! - Prefix page paths with the default locale for manifest lookups
//! - Strip a leading locale segment
//! - Pick a locale from an `Accept-Language` header
//!
//! # Design Decisions
//! - Locale segments match whole segments only (`/en` never matches `/english`)
//! - Without i18n configuration every function is the identity (or empty)

use crate::manifest::RoutesManifest;
use crate::routing::normalize::strip_base_path;

/// True when `path` is exactly `prefix` or starts with `prefix/`.
fn has_segment_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Insert the default locale after the base path unless a locale is already present.
pub fn add_default_locale(path: &str, routes: &RoutesManifest) -> String {
    let Some(i18n) = &routes.i18n else {
        return path.to_string();
    };

    let base_path = match strip_base_path(path, &routes.base_path) {
        Some(_) => routes.base_path.as_str(),
        None => "",
    };

    let already_localized = i18n
        .locales
        .iter()
        .any(|locale| has_segment_prefix(path, &format!("{base_path}/{locale}")));
    if already_localized {
        return path.to_string();
    }

    if path == "/" || path == base_path {
        return format!("{base_path}/{}", i18n.default_locale);
    }

    match path.strip_prefix(&format!("{base_path}/")) {
        Some(rest) => format!("{base_path}/{}/{rest}", i18n.default_locale),
        None => path.to_string(),
    }
}

/// Remove a leading locale segment; `/<locale>` alone becomes `/`.
pub fn drop_locale(path: &str, routes: &RoutesManifest) -> String {
    let Some(i18n) = &routes.i18n else {
        return path.to_string();
    };

    for locale in &i18n.locales {
        let prefix = format!("/{locale}");
        if path == prefix {
            return "/".to_string();
        }
        if let Some(rest) = path.strip_prefix(&prefix) {
            if rest.starts_with('/') {
                return rest.to_string();
            }
        }
    }

    path.to_string()
}

/// Languages from an `Accept-Language` header, most preferred first.
///
/// Entries with `q=0` and the `*` wildcard are dropped; equal weights keep
/// header order.
pub fn parse_accept_language(header: &str) -> Vec<&str> {
    let mut entries: Vec<(&str, f64)> = Vec::new();

    for part in header.split(',') {
        let mut segments = part.split(';');
        let lang = segments.next().unwrap_or("").trim();
        if lang.is_empty() || lang == "*" {
            continue;
        }

        let mut q = 1.0_f64;
        for segment in segments {
            if let Some(value) = segment.trim().strip_prefix("q=") {
                q = value.trim().parse().unwrap_or(0.0);
            }
        }
        if q > 0.0 {
            entries.push((lang, q));
        }
    }

    // sort_by is stable, so ties keep client order
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    entries.into_iter().map(|(lang, _)| lang).collect()
}

/// Configured locale the client prefers over the default, if any.
///
/// Reaching the default locale in the preference list means no redirect is
/// needed, even if a configured locale appears later.
pub fn accept_language_locale<'a>(header: &str, routes: &'a RoutesManifest) -> Option<&'a str> {
    let i18n = routes.i18n.as_ref()?;

    for language in parse_accept_language(header) {
        if language.eq_ignore_ascii_case(&i18n.default_locale) {
            return None;
        }
        if let Some(locale) = i18n
            .locales
            .iter()
            .find(|locale| locale.eq_ignore_ascii_case(language))
        {
            return Some(locale);
        }
    }

    None
}

/// Root path of a locale, e.g. `/app/nl` or `/app/nl/`.
pub fn locale_root_path(locale: &str, routes: &RoutesManifest, trailing_slash: bool) -> String {
    let slash = if trailing_slash { "/" } else { "" };
    format!("{}/{locale}{slash}", routes.base_path)
}

/// Locale segment of a URI (`/nl`), the default locale's when absent, or `""` without i18n.
pub fn locale_prefix_from_uri(uri: &str, routes: &RoutesManifest) -> String {
    let uri = if routes.base_path.is_empty() {
        uri
    } else {
        uri.strip_prefix(routes.base_path.as_str()).unwrap_or(uri)
    };

    let Some(i18n) = &routes.i18n else {
        return String::new();
    };

    i18n.locales
        .iter()
        .find(|locale| has_segment_prefix(uri, &format!("/{locale}")))
        .map(|locale| format!("/{locale}"))
        .unwrap_or_else(|| format!("/{}", i18n.default_locale))
}
