use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

/// File name used for URLs that denote a directory
pub const INDEX_FILE: &str = "index.html";

/// Maps a normalized URL to a relative path inside the mirror directory
///
/// The mapping is deterministic so that re-runs, resume, and freshness checks
/// all agree on which file belongs to a URL:
///
/// - an empty path or one ending in `/` maps to `index.html` in that directory
/// - a last segment without an extension becomes `<name>-<tag>.html`, so `a`,
///   `a.html` and `a/` all map to different files
/// - a literal `index.html` file becomes `index-<tag>.html`, leaving
///   `index.html` to the directory URL
/// - a query string adds `-<tag>` of the query before the extension
/// - `.` and `..` segments are dropped, so the result never escapes the mirror
///
/// A tag is the first 8 hex chars of the SHA-256 of what it stands for.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use sumi_mirror::url::to_local_path;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/docs/guide/").unwrap();
/// assert_eq!(to_local_path(&url), PathBuf::from("docs/guide/index.html"));
/// ```
pub fn to_local_path(url: &Url) -> PathBuf {
    let path = url.path();
    let mut segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(str::to_string)
        .collect();

    let is_directory = path.is_empty() || path.ends_with('/') || segments.is_empty();
    if is_directory {
        segments.push(INDEX_FILE.to_string());
    } else if let Some(last) = segments.last_mut() {
        if Path::new(last.as_str()).extension().is_none() {
            let name = format!("{}.html", last);
            *last = with_hash_suffix(&name, last);
        } else if last.as_str() == INDEX_FILE {
            *last = with_hash_suffix(INDEX_FILE, INDEX_FILE);
        }
    }

    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        if let Some(last) = segments.last_mut() {
            *last = with_hash_suffix(last, query);
        }
    }

    segments.iter().collect()
}

/// Inserts the tag of `input` before the file extension
fn with_hash_suffix(file_name: &str, input: &str) -> String {
    let digest = hex::encode(Sha256::digest(input.as_bytes()));
    let suffix = &digest[..8];

    match file_name.rfind('.') {
        Some(idx) if idx > 0 => format!("{}-{}{}", &file_name[..idx], suffix, &file_name[idx..]),
        _ => format!("{}-{}", file_name, suffix),
    }
}
