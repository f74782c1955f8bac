//! HTML parser for extracting links, text and title
//!
//! Parsing is best effort: `scraper` (html5ever) recovers from any malformed
//! markup, so extraction never fails. Broken input simply yields fewer links
//! or an absent title.

use scraper::{Html, Node, Selector};

/// Elements whose contents are never visible text
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Raw `href` values, as written in the markup (not resolved)
    pub links: Vec<String>,

    /// Visible text with whitespace collapsed to single spaces
    pub text: String,

    /// The page title (from `<title>`), absent if missing or blank
    pub title: Option<String>,
}

/// Parses HTML content and extracts links, text and title
///
/// # Example
///
/// ```
/// use frontier_crawler::crawler::extract_page;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let page = extract_page(html);
/// assert_eq!(page.title, Some("Test".to_string()));
/// assert_eq!(page.links, vec!["/page".to_string()]);
/// assert_eq!(page.text, "Test Link");
/// ```
pub fn extract_page(html: &str) -> ExtractedPage {
    let document = Html::parse_document(html);

    ExtractedPage {
        links: extract_links(&document),
        text: extract_text(&document),
        title: extract_title(&document),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts raw href values from `<a>` tags
fn extract_links(document: &Html) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collects visible text, skipping text inside hidden elements
fn extract_text(document: &Html) -> String {
    let mut words = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            matches!(ancestor.value(), Node::Element(element) if HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ")
}
