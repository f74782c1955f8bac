//! URL handling module for Frontier-Crawler
//!
//! This module provides frontier-key normalization, host comparison, path
//! denylist matching, and the `LinkFilter` that turns raw hrefs into
//! frontier-insertable URLs.

mod domain;
mod matcher;
mod normalize;

use crate::config::FilterConfig;
use std::collections::BTreeSet;
use url::Url;

// Re-export main functions
pub use domain::{extract_host, same_host};
pub use matcher::{has_denied_extension, has_denied_substring};
pub use normalize::{frontier_key, normalize_url};

/// Converts links discovered on a page into absolute, in-scope frontier keys
///
/// The filter is pure: it performs no I/O and the same inputs always give the
/// same output set.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    schemes: Vec<String>,
    denied_extensions: Vec<String>,
    denied_path_substrings: Vec<String>,
}

impl LinkFilter {
    /// Builds a filter from configuration
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            schemes: config.schemes.iter().map(|s| s.to_lowercase()).collect(),
            denied_extensions: config
                .denied_extensions
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
            denied_path_substrings: config.denied_path_substrings.clone(),
        }
    }

    /// Filters raw links found on `page_url`
    ///
    /// # Filtering Steps
    ///
    /// 1. Resolve against the page URL (relative paths)
    /// 2. Strip the fragment
    /// 3. Keep allowed schemes only
    /// 4. Keep links on the page's own host only
    /// 5. Drop paths ending in a denied extension
    /// 6. Drop paths containing a denied substring
    /// 7. Strip a single trailing slash
    ///
    /// # Examples
    ///
    /// ```
    /// use frontier_crawler::url::LinkFilter;
    /// use url::Url;
    ///
    /// let filter = LinkFilter::default();
    /// let page = Url::parse("https://example.com/a").unwrap();
    /// let raw = vec!["/b".to_string(), "https://other.com/c".to_string()];
    ///
    /// let accepted = filter.filter(&page, &raw);
    /// assert_eq!(accepted.len(), 1);
    /// assert!(accepted.contains("https://example.com/b"));
    /// ```
    pub fn filter(&self, page_url: &Url, raw_links: &[String]) -> BTreeSet<String> {
        raw_links
            .iter()
            .filter_map(|raw| self.accept(page_url, raw))
            .collect()
    }

    /// Runs a single raw link through the filter
    ///
    /// Returns the frontier key if the link is accepted.
    pub fn accept(&self, page_url: &Url, raw: &str) -> Option<String> {
        let mut resolved = page_url.join(raw.trim()).ok()?;
        resolved.set_fragment(None);

        if !self.schemes.iter().any(|s| s == resolved.scheme()) {
            return None;
        }

        if !same_host(&resolved, page_url) {
            return None;
        }

        let path = resolved.path();
        if has_denied_extension(path, &self.denied_extensions) {
            return None;
        }

        if has_denied_substring(path, &self.denied_path_substrings) {
            return None;
        }

        Some(frontier_key(&resolved))
    }
}

impl Default for LinkFilter {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://example.com/a").unwrap()
    }

    fn links(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_mixed_links() {
        let filter = LinkFilter::default();
        let accepted = filter.filter(
            &page(),
            &links(&[
                "/b",
                "https://example.com/c#frag",
                "https://other.com/d",
                "/e.pdf",
                "/de/f",
            ]),
        );

        let expected: BTreeSet<String> = ["https://example.com/b", "https://example.com/c"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(accepted, expected);
    }

    #[test]
    fn test_deterministic() {
        let filter = LinkFilter::default();
        let raw = links(&["/z", "/y", "/x/", "/y#again"]);

        let first = filter.filter(&page(), &raw);
        let second = filter.filter(&page(), &raw);
        assert_eq!(first, second);
        assert_eq!(
            first.into_iter().collect::<Vec<_>>(),
            vec![
                "https://example.com/x",
                "https://example.com/y",
                "https://example.com/z"
            ]
        );
    }

    #[test]
    fn test_relative_path_resolution() {
        let filter = LinkFilter::default();
        let page = Url::parse("https://example.com/docs/intro").unwrap();

        assert_eq!(
            filter.accept(&page, "setup"),
            Some("https://example.com/docs/setup".to_string())
        );
        assert_eq!(
            filter.accept(&page, "../blog/"),
            Some("https://example.com/blog".to_string())
        );
    }

    #[test]
    fn test_non_http_schemes_rejected() {
        let filter = LinkFilter::default();
        assert_eq!(filter.accept(&page(), "mailto:team@example.com"), None);
        assert_eq!(filter.accept(&page(), "javascript:void(0)"), None);
        assert_eq!(filter.accept(&page(), "ftp://example.com/file"), None);
    }

    #[test]
    fn test_scheme_allowlist_from_config() {
        let config = FilterConfig {
            schemes: vec!["https".to_string()],
            ..FilterConfig::default()
        };
        let filter = LinkFilter::new(&config);

        assert_eq!(filter.accept(&page(), "http://example.com/plain"), None);
        assert!(filter.accept(&page(), "https://example.com/secure").is_some());
    }

    #[test]
    fn test_same_host_across_scheme() {
        let filter = LinkFilter::default();
        assert_eq!(
            filter.accept(&page(), "http://example.com/insecure"),
            Some("http://example.com/insecure".to_string())
        );
    }

    #[test]
    fn test_subdomain_rejected() {
        let filter = LinkFilter::default();
        assert_eq!(filter.accept(&page(), "https://blog.example.com/post"), None);
    }

    #[test]
    fn test_asset_extensions_rejected() {
        let filter = LinkFilter::default();
        for raw in ["/logo.png", "/photo.JPG", "/app.js", "/main.css", "/a.zip", "/favicon.ico"] {
            assert_eq!(filter.accept(&page(), raw), None, "{} should be rejected", raw);
        }
    }

    #[test]
    fn test_extension_check_ignores_query() {
        let filter = LinkFilter::default();
        assert_eq!(
            filter.accept(&page(), "/download?file=report.pdf"),
            Some("https://example.com/download?file=report.pdf".to_string())
        );
    }

    #[test]
    fn test_locale_paths_rejected() {
        let filter = LinkFilter::default();
        assert_eq!(filter.accept(&page(), "/fr/about"), None);
        assert_eq!(filter.accept(&page(), "/docs/zh-hant/start"), None);
        assert!(filter.accept(&page(), "/french-cooking").is_some());
    }

    #[test]
    fn test_fragment_only_link_points_at_page() {
        let filter = LinkFilter::default();
        assert_eq!(
            filter.accept(&page(), "#top"),
            Some("https://example.com/a".to_string())
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let filter = LinkFilter::default();
        let accepted = filter.filter(&page(), &links(&["/b", "/b/", "/b#x", "https://example.com/b"]));
        assert_eq!(accepted.len(), 1);
    }

    #[test]
    fn test_unparseable_link_skipped() {
        let filter = LinkFilter::default();
        assert_eq!(filter.accept(&page(), "http://[::1"), None);
    }
}
