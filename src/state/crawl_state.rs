//! Persisted resume record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Completed work of a crawl, as saved to the state file
///
/// Every field defaults when missing, and unknown fields are ignored, so
/// files written by older or newer versions still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlState {
    /// Normalized page URLs that were processed
    #[serde(default)]
    pub visited_urls: BTreeSet<String>,

    /// Resource URL to local path (relative to the output directory)
    #[serde(default)]
    pub downloaded_files: BTreeMap<String, PathBuf>,

    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.visited_urls.is_empty() && self.downloaded_files.is_empty()
    }

    pub fn record_visit(&mut self, url: &str) {
        self.visited_urls.insert(url.to_string());
    }

    pub fn record_download(&mut self, url: &str, local_path: PathBuf) {
        self.downloaded_files.insert(url.to_string(), local_path);
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited_urls.contains(url)
    }

    pub fn is_downloaded(&self, url: &str) -> bool {
        self.downloaded_files.contains_key(url)
    }
}
