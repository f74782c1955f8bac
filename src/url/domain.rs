use url::Url;

/// Extracts the lowercase host from a URL
///
/// Ports are not part of the host, so `example.com:8080` yields `example.com`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use frontier_crawler::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.COM:8443/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if both URLs have the same host
///
/// URLs without a host never match anything, including each other.
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (extract_host(a), extract_host(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
