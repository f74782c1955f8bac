use crate::UrlError;
use url::Url;

/// Normalizes a URL string into its frontier key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an `http` or `https` scheme and a host
/// 3. Remove the fragment (everything after #)
/// 4. Strip a single trailing slash from the serialized form
///
/// The scheme and host are lowercased by the parser. Query strings are kept
/// verbatim since they frequently select distinct content.
///
/// # Examples
///
/// ```
/// use frontier_crawler::url::normalize_url;
///
/// let key = normalize_url("https://EXAMPLE.com/docs/#intro").unwrap();
/// assert_eq!(key, "https://example.com/docs");
/// ```
pub fn normalize_url(url_str: &str) -> Result<String, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    Ok(frontier_key(&url))
}

/// Serializes an already-resolved URL as a frontier key
///
/// Only one trailing slash is removed, so `https://example.com/a//` keeps one.
pub fn frontier_key(url: &Url) -> String {
    let serialized = url.as_str();
    serialized
        .strip_suffix('/')
        .unwrap_or(serialized)
        .to_string()
}
