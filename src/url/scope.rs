use crate::UrlError;
use url::Url;

/// The part of a site a crawl is allowed to download
///
/// A URL is in scope when its host and port equal the target's and its path
/// lives under the target's base directory (the path up to and including its
/// last `/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    host: String,
    port: Option<u16>,
    base_dir: String,
}

impl Scope {
    /// Builds the scope for a crawl rooted at `target`
    pub fn from_target(target: &Url) -> Result<Self, UrlError> {
        let host = target
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(UrlError::MissingDomain)?
            .to_lowercase();

        let path = target.path();
        let base_dir = match path.rfind('/') {
            Some(idx) => path[..=idx].to_string(),
            None => "/".to_string(),
        };

        Ok(Self {
            host,
            port: target.port_or_known_default(),
            base_dir,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn base_dir(&self) -> &str {
        &self.base_dir
    }

    /// Returns true if `url` may be downloaded
    pub fn contains(&self, url: &Url) -> bool {
        let same_host = url
            .host_str()
            .map_or(false, |h| h.eq_ignore_ascii_case(&self.host));
        if !same_host || url.port_or_known_default() != self.port {
            return false;
        }

        let path = url.path();
        if path.ends_with('/') {
            path.starts_with(&self.base_dir)
        } else {
            format!("{}/", path).starts_with(&self.base_dir)
        }
    }
}
