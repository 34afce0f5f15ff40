//! Freshness oracle: decides whether a local copy must be re-downloaded

use crate::crawler::fetcher::Transport;
use crate::crawler::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Why a URL is or is not fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessDecision {
    /// Force download is on
    Forced,
    /// Incremental mode is off
    NotIncremental,
    /// Nothing on disk yet
    NoLocalCopy,
    /// Remote `Last-Modified` is strictly newer than the local file
    RemoteNewer,
    /// No usable remote timestamp, configured to fetch anyway
    AssumedStale,
    /// No usable remote timestamp, configured to keep the local copy
    AssumedFresh,
    /// Local file is at least as new as the remote one
    UpToDate,
}

impl FreshnessDecision {
    pub fn needs_fetch(&self) -> bool {
        !matches!(self, Self::AssumedFresh | Self::UpToDate)
    }
}

/// Compares local file times with remote `Last-Modified` headers
pub struct FreshnessOracle {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    assume_stale_without_timestamp: bool,
}

impl FreshnessOracle {
    pub fn new(
        transport: Arc<dyn Transport>,
        retry: RetryPolicy,
        assume_stale_without_timestamp: bool,
    ) -> Self {
        Self {
            transport,
            retry,
            assume_stale_without_timestamp,
        }
    }

    /// Returns true if `url` must be downloaded again
    pub async fn needs_fetch(
        &self,
        url: &Url,
        local_path: &Path,
        incremental: bool,
        force: bool,
        cancel: &CancellationToken,
    ) -> bool {
        self.decide(url, local_path, incremental, force, cancel)
            .await
            .needs_fetch()
    }

    /// Same as [`FreshnessOracle::needs_fetch`] but says why
    pub async fn decide(
        &self,
        url: &Url,
        local_path: &Path,
        incremental: bool,
        force: bool,
        cancel: &CancellationToken,
    ) -> FreshnessDecision {
        if force {
            return FreshnessDecision::Forced;
        }
        if !incremental {
            return FreshnessDecision::NotIncremental;
        }

        let local_modified = match local_mtime(local_path).await {
            Some(t) => t,
            None => return FreshnessDecision::NoLocalCopy,
        };

        let remote_modified = self.probe_last_modified(url, cancel).await;
        let decision = compare(
            local_modified,
            remote_modified,
            self.assume_stale_without_timestamp,
        );

        tracing::debug!(
            "Freshness of {}: local {}, remote {:?} -> {:?}",
            url,
            local_modified,
            remote_modified,
            decision
        );
        decision
    }

    /// HEAD probe for the remote `Last-Modified`; any failure means unknown
    async fn probe_last_modified(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Option<DateTime<Utc>> {
        let label = format!("HEAD {}", url);
        let response = self
            .retry
            .execute(cancel, &label, || async {
                self.transport.head(url).await?.error_for_status()
            })
            .await;

        match response {
            Ok(response) => response.last_modified(),
            Err(e) => {
                tracing::debug!("Freshness probe for {} failed: {}", url, e);
                None
            }
        }
    }
}

/// Pure freshness rule
pub fn compare(
    local_modified: DateTime<Utc>,
    remote_modified: Option<DateTime<Utc>>,
    assume_stale_without_timestamp: bool,
) -> FreshnessDecision {
    match remote_modified {
        Some(remote) if remote > local_modified => FreshnessDecision::RemoteNewer,
        Some(_) => FreshnessDecision::UpToDate,
        None if assume_stale_without_timestamp => FreshnessDecision::AssumedStale,
        None => FreshnessDecision::AssumedFresh,
    }
}

/// Modification time of a regular file, or None if it does not exist
pub async fn local_mtime(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }
    metadata.modified().ok().map(DateTime::<Utc>::from)
}
