use crate::UrlError;
use url::Url;

/// Normalizes a URL into the identity used for deduplication and local paths
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http` and `https`
/// 3. Lowercase the scheme and host, drop a default port (done by `Url`)
/// 4. Normalize path:
///    - Collapse duplicate slashes
///    - Remove dot segments (. and ..)
///    - Keep a trailing slash when present (it marks a directory)
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Sort query parameters
/// 7. Remove empty query string (trailing ?)
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM:80/docs//guide/./intro.html#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/docs/guide/intro.html");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Same as [`normalize_url`] for an already parsed URL
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = sorted_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Normalizes a URL path by collapsing slashes and removing dot segments
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let trailing_slash = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");

    let mut normalized_segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            // Empty segments come from repeated slashes
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", normalized_segments.join("/"));
    if trailing_slash {
        result.push('/');
    }
    result
}

/// Returns the query parameters sorted by key, then value
fn sorted_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !key.is_empty())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}
