//! Audit-scope filtering.
//!
//! A site audit may be scoped to a subpath of a domain (e.g.
//! `https://example.com/blog`). Links and top pages outside that scope are
//! excluded from detection and from alternative-URL suggestions.

use anyhow::{bail, Result};
use log::{debug, info};
use url::Url;

use crate::locale::strip_trailing_slash;
use crate::models::BrokenLinkCandidate;

/// Parsed audit scope: the host plus an optional path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditScope {
    host: String,
    path_prefix: String,
}

impl AuditScope {
    /// Parses a base URL into a scope. Returns `None` when the base URL is
    /// malformed or has no host.
    pub fn parse(base_url: &str) -> Option<Self> {
        let parsed = Url::parse(base_url).ok()?;
        let host = parsed.host_str()?.to_string();
        let path = strip_trailing_slash(parsed.path());
        let path_prefix = if path == "/" { String::new() } else { path.to_string() };
        Some(Self { host, path_prefix })
    }

    /// Host component of the scope.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Path prefix of the scope; empty when the base URL has no subpath.
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// Whether a URL falls under this scope. Malformed URLs are out of scope.
    pub fn contains(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        if parsed.host_str() != Some(self.host.as_str()) {
            return false;
        }
        self.path_prefix.is_empty() || parsed.path().starts_with(&self.path_prefix)
    }
}

/// Retains only links whose `url_from` and `url_to` both fall under the
/// audit scope.
///
/// Malformed URLs are treated as out-of-scope and filtered silently, never
/// an error. The rejected count is logged.
pub fn filter_by_scope(
    base_url: &str,
    links: Vec<BrokenLinkCandidate>,
) -> Vec<BrokenLinkCandidate> {
    let Some(scope) = AuditScope::parse(base_url) else {
        debug!("Filtered out all {} links: base URL {base_url} is unparseable, everything is out of scope", links.len());
        info!("Filtered out {} links out of audit scope", links.len());
        return Vec::new();
    };

    let total = links.len();
    let kept: Vec<BrokenLinkCandidate> = links
        .into_iter()
        .filter(|link| {
            let in_scope = scope.contains(&link.url_from) && scope.contains(&link.url_to);
            if !in_scope {
                debug!(
                    "Filtered out link {} -> {} as out of scope",
                    link.url_from, link.url_to
                );
            }
            in_scope
        })
        .collect();

    let rejected = total - kept.len();
    if rejected > 0 {
        info!("Filtered out {rejected} links out of audit scope");
    }
    kept
}

/// Retains only URLs falling under the audit scope; used for top-page lists.
pub fn filter_urls_by_scope(base_url: &str, urls: &[String]) -> Vec<String> {
    let Some(scope) = AuditScope::parse(base_url) else {
        return Vec::new();
    };
    let kept: Vec<String> = urls
        .iter()
        .filter(|url| scope.contains(url))
        .cloned()
        .collect();
    let rejected = urls.len() - kept.len();
    if rejected > 0 {
        debug!("Filtered out {rejected} top pages as out of scope");
    }
    kept
}

/// Scoping step of scrape preparation: narrows the site's top pages to the
/// audit scope and fails when nothing remains to scrape.
pub fn prepare_scrape_targets(base_url: &str, top_pages: &[String]) -> Result<Vec<String>> {
    let targets = filter_urls_by_scope(base_url, top_pages);
    if targets.is_empty() && !top_pages.is_empty() {
        bail!("All {} pages filtered out by audit scope {base_url}", top_pages.len());
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(from: &str, to: &str) -> BrokenLinkCandidate {
        BrokenLinkCandidate::new(from, to, 0)
    }

    #[test]
    fn test_scope_parse_with_subpath() {
        let scope = AuditScope::parse("https://example.com/blog/").unwrap();
        assert_eq!(scope.host(), "example.com");
        assert_eq!(scope.path_prefix(), "/blog");
    }

    #[test]
    fn test_scope_parse_without_subpath() {
        let scope = AuditScope::parse("https://example.com").unwrap();
        assert_eq!(scope.path_prefix(), "");
        assert!(scope.contains("https://example.com/anything"));
    }

    #[test]
    fn test_scope_parse_malformed() {
        assert!(AuditScope::parse("not a url").is_none());
        assert!(AuditScope::parse("").is_none());
    }

    #[test]
    fn test_filter_by_scope_host_mismatch() {
        let links = vec![
            link("https://example.com/a", "https://example.com/b"),
            link("https://other.com/a", "https://example.com/b"),
            link("https://example.com/a", "https://other.com/b"),
        ];
        let kept = filter_by_scope("https://example.com", links);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].url_from, "https://example.com/a");
    }

    #[test]
    fn test_filter_by_scope_path_prefix() {
        let links = vec![
            link("https://example.com/blog/a", "https://example.com/blog/b"),
            link("https://example.com/blog/a", "https://example.com/shop/b"),
            link("https://example.com/about", "https://example.com/blog/b"),
        ];
        let kept = filter_by_scope("https://example.com/blog", links);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].url_to, "https://example.com/blog/b");
    }

    #[test]
    fn test_filter_by_scope_malformed_links_dropped_silently() {
        let links = vec![
            link("::::", "https://example.com/b"),
            link("https://example.com/a", ""),
            link("https://example.com/a", "https://example.com/b"),
        ];
        let kept = filter_by_scope("https://example.com", links);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_scope_filter_invariant_survivors_in_scope() {
        let scope = AuditScope::parse("https://example.com/blog").unwrap();
        let links = vec![
            link("https://example.com/blog/a", "https://example.com/blog/b"),
            link("https://example.com/a", "https://example.com/blog/b"),
            link("https://sub.example.com/blog/a", "https://example.com/blog/b"),
        ];
        for survivor in filter_by_scope("https://example.com/blog", links) {
            assert!(scope.contains(&survivor.url_from));
            assert!(scope.contains(&survivor.url_to));
        }
    }

    #[test]
    fn test_prepare_scrape_targets_all_filtered_is_error() {
        // Scenario: base URL scoped to /blog, no top pages under it.
        let top_pages = vec![
            "https://example.com/products".to_string(),
            "https://example.com/about".to_string(),
        ];
        let result = prepare_scrape_targets("https://example.com/blog", &top_pages);
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(
            message.contains("filtered out by audit scope"),
            "unexpected error: {message}"
        );
    }

    #[test]
    fn test_prepare_scrape_targets_keeps_in_scope_pages() {
        let top_pages = vec![
            "https://example.com/blog/post".to_string(),
            "https://example.com/about".to_string(),
        ];
        let targets = prepare_scrape_targets("https://example.com/blog", &top_pages).unwrap();
        assert_eq!(targets, vec!["https://example.com/blog/post".to_string()]);
    }

    #[test]
    fn test_prepare_scrape_targets_empty_input_is_ok() {
        let targets = prepare_scrape_targets("https://example.com", &[]).unwrap();
        assert!(targets.is_empty());
    }
}
