//! HTML parser for extracting links and resource references
//!
//! This module handles parsing HTML content to extract:
//! - Hyperlinks to other pages (from <a> tags and canonical links)
//! - Static resources the page needs (images, scripts, stylesheets, media)
//! - Page title

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// `<link rel>` values that point at a resource rather than a page
const RESOURCE_LINK_RELS: &[&str] = &[
    "stylesheet",
    "icon",
    "shortcut",
    "apple-touch-icon",
    "preload",
    "prefetch",
    "manifest",
    "modulepreload",
];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Hyperlinks found on the page (absolute URLs, document order)
    pub links: Vec<Url>,

    /// Static resources referenced by the page (absolute URLs, document order)
    pub resources: Vec<Url>,
}

/// Parses HTML content and extracts links, resources and the title
///
/// # Link Extraction Rules
///
/// **Links:**
/// - `<a href="...">` tags, except those with a `download` attribute
/// - `<link rel="canonical" href="...">`
///
/// **Resources:**
/// - `<img src>`, `<script src>`, `<source src>`, `<video src>`, `<audio src>`
/// - `<link href>` with a rel of stylesheet, icon, preload, prefetch, manifest
/// - `<a href download>`
///
/// **Skipped:** `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only references
///
/// Relative references resolve against `base_url`, which should be the final
/// URL after redirects. A `<base href>` in the document takes precedence.
///
/// # Example
///
/// ```
/// use sumi_mirror::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title><link rel="stylesheet" href="s.css"></head>
///               <body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// assert_eq!(parsed.resources[0].as_str(), "https://example.com/s.css");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);
    let base = document_base(&document, base_url);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, &base),
        resources: extract_resources(&document, &base),
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

/// Honors `<base href>` when present
fn document_base(document: &Html, base_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| base_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| base_url.clone())
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            push_resolved(&mut links, element.value().attr("href"), base_url);
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            push_resolved(&mut links, element.value().attr("href"), base_url);
        }
    }

    links
}

fn extract_resources(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut resources = Vec::new();

    if let Ok(selector) = Selector::parse("img[src], script[src], source[src], video[src], audio[src]")
    {
        for element in document.select(&selector) {
            push_resolved(&mut resources, element.value().attr("src"), base_url);
        }
    }

    if let Ok(selector) = Selector::parse("video[poster]") {
        for element in document.select(&selector) {
            push_resolved(&mut resources, element.value().attr("poster"), base_url);
        }
    }

    if let Ok(selector) = Selector::parse("link[href]") {
        for element in document.select(&selector) {
            if is_resource_link(&element) {
                push_resolved(&mut resources, element.value().attr("href"), base_url);
            }
        }
    }

    if let Ok(selector) = Selector::parse("a[href][download]") {
        for element in document.select(&selector) {
            push_resolved(&mut resources, element.value().attr("href"), base_url);
        }
    }

    resources
}

fn is_resource_link(element: &ElementRef<'_>) -> bool {
    element
        .value()
        .attr("rel")
        .map(|rel| {
            rel.split_ascii_whitespace()
                .any(|token| RESOURCE_LINK_RELS.contains(&token.to_ascii_lowercase().as_str()))
        })
        .unwrap_or(false)
}

fn push_resolved(out: &mut Vec<Url>, href: Option<&str>, base_url: &Url) {
    if let Some(url) = href.and_then(|h| resolve_link(h, base_url)) {
        out.push(url);
    }
}

/// Resolves a reference to an absolute URL and validates it
///
/// Returns None if the reference should be ignored:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only references
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') || is_special_reference(href) {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" => {
            Some(absolute_url)
        }
        _ => None,
    }
}

/// References that never point at a fetchable document
pub fn is_special_reference(href: &str) -> bool {
    let lower = href.trim_start().to_ascii_lowercase();
    ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}
