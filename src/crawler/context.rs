use crate::config::{Config, FailureDisposition};
use crate::crawler::fetcher::Transport;
use crate::crawler::freshness::FreshnessOracle;
use crate::crawler::queue::{Frontier, ResourceQueue};
use crate::crawler::renderer::Renderer;
use crate::crawler::retry::{RetryError, RetryPolicy};
use crate::crawler::throttle::Throttle;
use crate::output::CrawlStats;
use crate::plugins::PluginDispatcher;
use crate::state::{PageRecord, TaskOutcome};
use crate::storage::Checkpointer;
use crate::url::{ExclusionRules, Scope};
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything the worker pools share during one run
pub(crate) struct CrawlContext {
    pub config: Arc<Config>,
    pub output_dir: PathBuf,
    pub scope: Scope,
    pub exclusions: ExclusionRules,
    pub frontier: Frontier,
    pub resources: ResourceQueue,
    pub transport: Arc<dyn Transport>,
    pub renderer: Option<Arc<dyn Renderer>>,
    pub retry: RetryPolicy,
    pub freshness: FreshnessOracle,
    pub throttle: Throttle,
    pub checkpointer: Checkpointer,
    pub plugins: PluginDispatcher,
    pub stats: CrawlStats,
    pub pages: Mutex<Vec<PageRecord>>,
    pub pages_done: AtomicU64,
    pub cancel: CancellationToken,
    abort: Mutex<Option<(String, String)>>,
}

impl CrawlContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        scope: Scope,
        exclusions: ExclusionRules,
        transport: Arc<dyn Transport>,
        renderer: Option<Arc<dyn Renderer>>,
        checkpointer: Checkpointer,
        plugins: PluginDispatcher,
        cancel: CancellationToken,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        let freshness = FreshnessOracle::new(
            transport.clone(),
            retry.clone(),
            config.incremental.assume_stale_without_timestamp,
        );

        Self {
            output_dir: config.output.directory.clone(),
            frontier: Frontier::new(config.crawler.max_depth, config.crawler.max_files),
            resources: ResourceQueue::new(),
            throttle: Throttle::new(config.delay),
            scope,
            exclusions,
            transport,
            renderer,
            retry,
            freshness,
            checkpointer,
            plugins,
            stats: CrawlStats::new(),
            pages: Mutex::new(Vec::new()),
            pages_done: AtomicU64::new(0),
            cancel,
            abort: Mutex::new(None),
            config,
        }
    }

    pub fn incremental(&self) -> bool {
        self.config.incremental.enabled
    }

    pub fn force_download(&self) -> bool {
        self.config.incremental.force_download
    }

    pub fn push_page(&self, page: PageRecord) {
        self.pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(page);
    }

    pub fn take_pages(&self) -> Vec<PageRecord> {
        std::mem::take(&mut *self.pages.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Records a failure that is not subject to the retry disposition
    pub fn report_failure(&self, url: &Url, cause: &str) {
        tracing::error!("Failed {}: {}", url, cause);
        self.stats.record_failure(url.as_str(), cause);
        self.plugins.error(url.as_str(), cause);
    }

    /// Applies the configured exhaustion disposition to a failed fetch
    pub fn dispose(&self, url: &Url, error: RetryError) -> TaskOutcome {
        if error.is_cancelled() {
            return TaskOutcome::Cancelled;
        }
        let cause = error.to_string();

        match self.retry.on_exhausted {
            FailureDisposition::Log => {
                self.report_failure(url, &cause);
                TaskOutcome::Failed
            }
            FailureDisposition::Skip => {
                tracing::info!("Skipping {}: {}", url, cause);
                TaskOutcome::Skipped
            }
            FailureDisposition::Abort => {
                self.report_failure(url, &cause);
                self.abort(url, &cause);
                TaskOutcome::Failed
            }
        }
    }

    /// Stops the crawl; the first reason wins
    pub fn abort(&self, url: &Url, reason: &str) {
        {
            let mut abort = self.abort.lock().unwrap_or_else(PoisonError::into_inner);
            if abort.is_none() {
                tracing::error!("Aborting crawl at {}: {}", url, reason);
                *abort = Some((url.to_string(), reason.to_string()));
            }
        }
        self.cancel.cancel();
        self.shutdown_queues();
    }

    pub fn abort_reason(&self) -> Option<(String, String)> {
        self.abort
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rejects new work and releases every waiting worker
    pub fn shutdown_queues(&self) {
        self.frontier.close();
        self.resources.close();
    }
}
