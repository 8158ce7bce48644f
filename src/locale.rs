//! Locale-prefix utilities.
//!
//! Some sites scope content by a leading path segment (`/uk`, `/de`,
//! `/en-us`). The notifier uses these helpers to restrict alternative-URL
//! suggestions to the same locale as the broken links they accompany.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

// Leading path segment that looks like a language or language-region code.
static LOCALE_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{2}(?:-[a-z]{2})?$").expect("Failed to parse locale regex - this is a bug")
});

/// Strips a single trailing slash, leaving the root path `/` untouched.
pub fn strip_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

/// Extracts the leading path-locale segment of a URL, e.g. `/uk`.
///
/// Returns an empty string when the URL has no path, the first segment does
/// not look like a locale code, or the URL does not parse. Matching is
/// case-insensitive; the returned prefix is lowercase.
pub fn extract_locale_prefix(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    let first_segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next())
        .unwrap_or("");
    let candidate = first_segment.to_lowercase();
    if LOCALE_SEGMENT.is_match(&candidate) {
        format!("/{candidate}")
    } else {
        String::new()
    }
}
