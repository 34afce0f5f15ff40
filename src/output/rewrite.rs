//! Reference rewriting for offline browsing
//!
//! Every `href`, `src` and `poster` attribute in a saved page is rewritten in
//! place, whatever its quoting:
//! - a target that exists in the mirror becomes a relative path to its file,
//!   fragment kept
//! - any other http(s) target becomes its original absolute URL
//! - fragments, `mailto:`, `javascript:`, `tel:` and `data:` are left alone

use crate::crawler::is_special_reference;
use crate::url::normalize_parsed;
use html_escape::decode_html_entities;
use lol_html::errors::RewritingError;
use lol_html::{element, HtmlRewriter, Settings};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Normalized URL to local path for everything present in the mirror
#[derive(Debug, Clone, Default)]
pub struct LinkMap {
    entries: HashMap<String, PathBuf>,
}

impl LinkMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str, local_path: PathBuf) {
        self.entries.insert(url.to_string(), local_path);
    }

    pub fn get(&self, url: &str) -> Option<&Path> {
        self.entries.get(url).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<(String, PathBuf)> for LinkMap {
    fn extend<I: IntoIterator<Item = (String, PathBuf)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

/// Rewrites reference attributes of one page at a time
#[derive(Debug, Clone, Default)]
pub struct LinkRewriter;

impl LinkRewriter {
    pub fn new() -> Self {
        Self
    }

    /// Returns `html` with every reference attribute rewritten
    ///
    /// Attributes that keep their value are passed through byte for byte;
    /// rewritten ones are emitted double-quoted.
    ///
    /// # Arguments
    ///
    /// * `html` - Original page markup
    /// * `base_url` - URL the page was served from (after redirects)
    /// * `page_path` - The page's own local path
    /// * `links` - What the mirror contains
    pub fn rewrite(
        &self,
        html: &str,
        base_url: &Url,
        page_path: &Path,
        links: &LinkMap,
    ) -> Result<String, RewritingError> {
        let mut output = Vec::with_capacity(html.len());
        let replacement = |value: &str| {
            rewrite_reference(value, base_url, page_path, links).filter(|new| new != value)
        };

        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![
                    element!("[href]", |el| {
                        if let Some(new) = el.get_attribute("href").and_then(|v| replacement(&v)) {
                            el.set_attribute("href", &new)?;
                        }
                        Ok(())
                    }),
                    element!("[src]", |el| {
                        if let Some(new) = el.get_attribute("src").and_then(|v| replacement(&v)) {
                            el.set_attribute("src", &new)?;
                        }
                        Ok(())
                    }),
                    element!("[poster]", |el| {
                        if let Some(new) = el.get_attribute("poster").and_then(|v| replacement(&v)) {
                            el.set_attribute("poster", &new)?;
                        }
                        Ok(())
                    }),
                ],
                ..Settings::default()
            },
            |chunk: &[u8]| output.extend_from_slice(chunk),
        );

        rewriter.write(html.as_bytes())?;
        rewriter.end()?;

        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}

/// Rewrites a single raw attribute value
///
/// Returns None for values that stay as they are: empty, fragment-only,
/// special schemes, and anything that does not resolve to http(s).
pub fn rewrite_reference(
    value: &str,
    base_url: &Url,
    page_path: &Path,
    links: &LinkMap,
) -> Option<String> {
    let decoded = decode_html_entities(value.trim());
    let reference = decoded.trim();
    if reference.is_empty() || reference.starts_with('#') || is_special_reference(reference) {
        return None;
    }

    let absolute = base_url
        .join(reference)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")?;

    let fragment = absolute.fragment().map(str::to_string);
    let key = match normalize_parsed(absolute.clone()) {
        Ok(normalized) => normalized,
        Err(_) => return Some(absolute.to_string()),
    };

    match links.get(key.as_str()) {
        Some(target) => {
            let mut relative = relative_path(page_path, target);
            if let Some(fragment) = fragment {
                relative.push('#');
                relative.push_str(&fragment);
            }
            Some(relative)
        }
        None => Some(absolute.to_string()),
    }
}

/// Relative reference from the file `from` to the file `to`, both inside the mirror
///
/// `%` is escaped so the browser's percent-decoding lands on the file name as
/// stored on disk.
pub fn relative_path(from: &Path, to: &Path) -> String {
    let from_dir: Vec<String> = from
        .parent()
        .map(normal_components)
        .unwrap_or_default();
    let to_parts = normal_components(to);

    let common = from_dir
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from_dir.len() {
        parts.push("..".to_string());
    }
    parts.extend(to_parts[common..].iter().map(|p| p.replace('%', "%25")));

    if parts.is_empty() {
        return ".".to_string();
    }
    parts.join("/")
}

fn normal_components(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/guide/intro.html").unwrap()
    }

    fn links() -> LinkMap {
        let mut map = LinkMap::new();
        map.insert(
            "https://example.com/docs/guide/intro.html",
            PathBuf::from("docs/guide/intro.html"),
        );
        map.insert(
            "https://example.com/docs/",
            PathBuf::from("docs/index.html"),
        );
        map.insert(
            "https://example.com/docs/css/site.css",
            PathBuf::from("docs/css/site.css"),
        );
        map
    }

    fn rewrite(html: &str) -> String {
        LinkRewriter::new()
            .rewrite(html, &base(), Path::new("docs/guide/intro.html"), &links())
            .unwrap()
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("docs/guide/intro.html"), Path::new("docs/index.html")),
            "../index.html"
        );
        assert_eq!(
            relative_path(Path::new("index.html"), Path::new("docs/a/b.html")),
            "docs/a/b.html"
        );
        assert_eq!(
            relative_path(Path::new("a/b/c.html"), Path::new("a/b/d.html")),
            "d.html"
        );
        assert_eq!(
            relative_path(Path::new("a/b/c.html"), Path::new("x/y.css")),
            "../../x/y.css"
        );
        assert_eq!(
            relative_path(Path::new("a.html"), Path::new("my%20file.html")),
            "my%2520file.html"
        );
    }

    #[test]
    fn test_downloaded_targets_become_relative() {
        let html = r#"<a href="../">Up</a> <link rel="stylesheet" href="/docs/css/site.css">"#;
        assert_eq!(
            rewrite(html),
            r#"<a href="../index.html">Up</a> <link rel="stylesheet" href="../css/site.css">"#
        );
    }

    #[test]
    fn test_fragment_preserved() {
        let html = r#"<a href="https://example.com/docs/#install">Install</a>"#;
        assert_eq!(rewrite(html), r#"<a href="../index.html#install">Install</a>"#);
    }

    #[test]
    fn test_self_link() {
        let html = r#"<a href="intro.html">Self</a>"#;
        assert_eq!(rewrite(html), r#"<a href="intro.html">Self</a>"#);
    }

    #[test]
    fn test_missing_targets_become_absolute() {
        let html = r#"<a href="../../blog/post.html">Blog</a><img src='https://cdn.example.net/x.png'>"#;
        assert_eq!(
            rewrite(html),
            r#"<a href="https://example.com/blog/post.html">Blog</a><img src='https://cdn.example.net/x.png'>"#
        );
    }

    #[test]
    fn test_special_references_untouched() {
        let html = r##"<a href="#top">T</a><a href="mailto:a@b.c">M</a><a href="javascript:void(0)">J</a><img src="data:image/png;base64,AA">"##;
        assert_eq!(rewrite(html), html);
    }

    #[test]
    fn test_script_expressions_untouched() {
        let html = r#"<script>link.href="next.html";</script>"#;
        assert_eq!(rewrite(html), html);
    }

    #[test]
    fn test_unquoted_and_single_quoted_attributes() {
        let html = r#"<a href=../../blog/post.html>b</a><a href='../../blog/post.html'>s</a><a href="../../blog/post.html">q</a>"#;
        let out = rewrite(html);
        assert_eq!(
            out.matches(r#"href="https://example.com/blog/post.html""#).count(),
            3
        );
        assert!(!out.contains("../../blog"));

        let out = rewrite(r#"<link rel=stylesheet href=/docs/css/site.css><img src='/docs/css/site.css'>"#);
        assert!(out.contains(r#"href="../css/site.css""#));
        assert!(out.contains(r#"src="../css/site.css""#));
    }

    #[test]
    fn test_src_and_poster_of_external_assets() {
        let out = rewrite(
            r#"<img src="../../shared/logo.png"><video poster=../../media/poster.jpg src="//cdn.example.net/v.mp4"></video>"#,
        );
        assert!(out.contains(r#"src="https://example.com/shared/logo.png""#));
        assert!(out.contains(r#"poster="https://example.com/media/poster.jpg""#));
        assert!(out.contains(r#"src="https://cdn.example.net/v.mp4""#));
    }

    #[test]
    fn test_entities_in_query() {
        let mut map = links();
        map.insert(
            "https://example.com/docs/search?a=1&b=2",
            PathBuf::from("docs/search-abcdef12.html"),
        );
        for html in [
            r#"<a href="/docs/search?b=2&amp;a=1">S</a>"#,
            r#"<a href="/docs/search?b=2&#38;a=1">S</a>"#,
            r#"<a href='/docs/search?b=2&#x26;a=1'>S</a>"#,
        ] {
            let out = LinkRewriter::new()
                .rewrite(html, &base(), Path::new("docs/guide/intro.html"), &map)
                .unwrap();
            assert_eq!(out, r#"<a href="../search-abcdef12.html">S</a>"#);
        }
    }

    #[test]
    fn test_rewrite_reference_leaves_special_values() {
        let page = Path::new("docs/guide/intro.html");
        assert_eq!(rewrite_reference("", &base(), page, &links()), None);
        assert_eq!(rewrite_reference("#top", &base(), page, &links()), None);
        assert_eq!(rewrite_reference("tel:+123", &base(), page, &links()), None);
        assert_eq!(
            rewrite_reference("/docs/", &base(), page, &links()).as_deref(),
            Some("../index.html")
        );
    }

    #[test]
    fn test_link_map() {
        let mut map = LinkMap::new();
        assert!(map.is_empty());
        map.extend(vec![("https://example.com/a".to_string(), PathBuf::from("a.html"))]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("https://example.com/a"), Some(Path::new("a.html")));
    }
}
