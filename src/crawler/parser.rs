//! HTML anchor extraction
//!
//! The crawl only needs raw `href` values; resolution against the page URL and
//! canonicalization happen in [`crate::url::normalize`].

use scraper::{Html, Selector};

/// Schemes that never lead to a fetchable resource
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Extracts the `href` of every `<a>` element in the document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - every `<a href="...">`, including ones carrying a `download` attribute
///
/// **Exclude:**
/// - empty hrefs and fragment-only hrefs (`#top`)
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
///
/// # Example
///
/// ```
/// use sumi_harvest::crawler::extract_anchors;
///
/// let html = r#"<a href="/a.pdf">A</a><a href="mailto:x@example.test">mail</a>"#;
/// assert_eq!(extract_anchors(html), vec!["/a.pdf".to_string()]);
/// ```
pub fn extract_anchors(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| is_followable(href))
        .map(str::to_string)
        .collect()
}

fn is_followable(href: &str) -> bool {
    if href.is_empty() || href.starts_with('#') {
        return false;
    }

    let lower = href.to_lowercase();
    !SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}
