/// Checks if a URL path ends in one of the denied file extensions
///
/// The comparison is case-insensitive; `extensions` must already be lowercase
/// and include the leading dot.
///
/// # Examples
///
/// ```
/// use frontier_crawler::url::has_denied_extension;
///
/// let denied = vec![".pdf".to_string(), ".png".to_string()];
/// assert!(has_denied_extension("/files/report.PDF", &denied));
/// assert!(!has_denied_extension("/files/report.html", &denied));
/// ```
pub fn has_denied_extension(path: &str, extensions: &[String]) -> bool {
    let path = path.to_ascii_lowercase();
    extensions.iter().any(|ext| path.ends_with(ext.as_str()))
}

/// Checks if a URL path contains any denied substring
///
/// Used to skip mirrored locale trees such as `/de/` or `/zh-hant/`.
pub fn has_denied_substring(path: &str, substrings: &[String]) -> bool {
    substrings.iter().any(|s| path.contains(s.as_str()))
}
