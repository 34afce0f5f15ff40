use crate::state::TaskOutcome;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use url::Url;

/// An HTML page obtained during the crawl
///
/// Created by the crawl worker that fetched (or reloaded) the page, then
/// only read: by plugins, and by the page store at crawl end.
#[derive(Debug, Clone)]
pub struct PageRecord {
    /// Normalized task URL; decides the local path
    pub url: Url,
    /// URL after redirects; relative links resolve against it
    pub final_url: Url,
    /// Path relative to the output directory
    pub local_path: PathBuf,
    /// Original markup, before any link rewriting
    pub content: String,
    pub depth: u32,
    pub fetched_at: DateTime<Utc>,
    pub remote_last_modified: Option<DateTime<Utc>>,
    /// `Fetched` or `Unchanged`
    pub outcome: TaskOutcome,
}

impl PageRecord {
    /// Local path as a `/`-separated string
    pub fn local_path_str(&self) -> String {
        self.local_path.to_string_lossy().replace('\\', "/")
    }
}
