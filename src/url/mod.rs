//! Scope and exclusion resolution for Sumi-Mirror
//!
//! Pure functions over URLs: normalization for identity, the in-scope test,
//! exclusion rules, and the URL to local path mapping.

mod local_path;
mod matcher;
mod normalize;
mod scope;

pub use local_path::{to_local_path, INDEX_FILE};
pub use matcher::{ExclusionRule, ExclusionRules};
pub use normalize::{normalize_parsed, normalize_url};
pub use scope::Scope;

use url::Url;

/// How a discovered reference is treated by the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Same host, under the base directory, not excluded
    Eligible,
    /// Outside the base directory or on another host
    OutOfScope,
    /// In scope but matched an exclusion rule
    Excluded,
}

impl Classification {
    /// Returns true if the URL may be scheduled
    pub fn should_download(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Classifies a normalized URL against the crawl scope and exclusion list
///
/// Scope is checked first; exclusion only matters for in-scope URLs.
pub fn classify(url: &Url, scope: &Scope, exclusions: &ExclusionRules) -> Classification {
    if !scope.contains(url) {
        return Classification::OutOfScope;
    }
    if exclusions.is_excluded(url) {
        return Classification::Excluded;
    }
    Classification::Eligible
}
