//! Crawler coordinator - main crawl orchestration logic
//!
//! This module wires one run together:
//! - Loading saved state and seeding the queues with completed work
//! - Spawning the crawl and resource worker pools
//! - Detecting completion through queue drain instead of thread liveness
//! - Writing the page store, flushing or clearing state, and reporting

use crate::config::Config;
use crate::crawler::context::CrawlContext;
use crate::crawler::fetcher::{ReqwestTransport, Transport};
use crate::crawler::queue::Admission;
use crate::crawler::renderer::Renderer;
use crate::crawler::resources::run_resource_worker;
use crate::crawler::worker::run_crawl_worker;
use crate::output::{CrawlStatistics, SiteWriter};
use crate::plugins::{Plugin, PluginDispatcher};
use crate::state::CrawlState;
use crate::storage::{open_state_store, Checkpointer, StateStore};
use crate::url::{normalize_url, ExclusionRules, Scope};
use crate::MirrorError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// What one run did
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub target: Url,
    pub output_dir: PathBuf,
    pub statistics: CrawlStatistics,
    /// Pages written to the mirror at the end of the run
    pub pages_written: usize,
    pub elapsed: Duration,
    /// The stop signal fired before the queues drained
    pub cancelled: bool,
    /// Set when the abort disposition stopped the run
    pub aborted: Option<String>,
}

impl CrawlReport {
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.aborted.is_none()
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    target: Url,
    scope: Scope,
    exclusions: ExclusionRules,
    transport: Arc<dyn Transport>,
    renderer: Option<Arc<dyn Renderer>>,
    plugins: PluginDispatcher,
    store: Option<Arc<dyn StateStore>>,
    ignore_saved_state: bool,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated mirror configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(MirrorError)` - Bad target URL, bad exclusion rule, or HTTP client setup failure
    pub fn new(config: Config) -> Result<Self, MirrorError> {
        let target = normalize_url(&config.target.url)?;
        let scope = Scope::from_target(&target)?;
        let exclusions = ExclusionRules::compile(&config.exclude, &target)?;
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&config.crawler)?);
        let store = open_state_store(&config.resume);

        tracing::debug!(
            "Scope: host {}, base directory {}, {} exclusion rules",
            scope.host(),
            scope.base_dir(),
            exclusions.len()
        );

        Ok(Self {
            config: Arc::new(config),
            target,
            scope,
            exclusions,
            transport,
            renderer: None,
            plugins: PluginDispatcher::new(),
            store,
            ignore_saved_state: false,
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the HTTP transport
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Installs a renderer; it is used only when `[renderer] enabled = true`
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.register(plugin);
        self
    }

    /// Starts from empty state even if a saved state exists
    pub fn ignore_saved_state(mut self, ignore: bool) -> Self {
        self.ignore_saved_state = ignore;
        self
    }

    /// The shared stop signal; cancelling it ends the run early
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    async fn initial_state(&self) -> CrawlState {
        let store = match &self.store {
            Some(store) => store.clone(),
            None => return CrawlState::new(),
        };
        if self.ignore_saved_state || self.config.incremental.force_download {
            tracing::info!("Ignoring saved state at {}", store.location());
            return CrawlState::new();
        }
        match tokio::task::spawn_blocking(move || store.load()).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Loading saved state failed, starting empty: {}", e);
                CrawlState::new()
            }
        }
    }

    async fn clear_state(&self) {
        let store = match &self.store {
            Some(store) => store.clone(),
            None => return,
        };
        let location = store.location();
        match tokio::task::spawn_blocking(move || store.clear()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Failed to clear state at {}: {}", location, e),
            Err(e) => tracing::warn!("Failed to clear state at {}: {}", location, e),
        }
    }

    /// Runs the crawl to completion, cancellation, or abort
    ///
    /// A complete run clears the saved state, so the next run starts over and
    /// relies on freshness checks. A cancelled or aborted run flushes it, so
    /// the next run resumes.
    pub async fn run(self) -> Result<CrawlReport, MirrorError> {
        let started = Instant::now();
        let output_dir = self.config.output.directory.clone();
        tracing::info!("Mirroring {} into {}", self.target, output_dir.display());
        tokio::fs::create_dir_all(&output_dir).await?;

        let initial = self.initial_state().await;
        let checkpointer = Checkpointer::new(
            self.store.clone(),
            initial.clone(),
            Duration::from_secs(self.config.resume.save_interval_secs),
        );

        let ctx = Arc::new(CrawlContext::new(
            self.config.clone(),
            self.scope.clone(),
            self.exclusions.clone(),
            self.transport.clone(),
            self.renderer.clone(),
            checkpointer,
            self.plugins.clone(),
            self.cancel.clone(),
        ));
        ctx.frontier.seed_seen(initial.visited_urls.iter().cloned());
        ctx.resources
            .seed_seen(initial.downloaded_files.keys().cloned());
        if !initial.is_empty() {
            tracing::info!(
                "Resuming: {} pages and {} resources already done",
                initial.visited_urls.len(),
                initial.downloaded_files.len()
            );
        }

        ctx.plugins.crawl_start(self.target.as_str(), &output_dir);

        match ctx.frontier.enqueue(self.target.clone(), 0) {
            Admission::Accepted => {}
            Admission::AlreadySeen => {
                tracing::info!("{} was completed by an earlier run", self.target);
            }
            other => tracing::warn!("Target {} not scheduled: {:?}", self.target, other),
        }

        let watcher = {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                ctx.cancel.cancelled().await;
                tracing::info!("Stop requested, finishing in-flight tasks");
                ctx.shutdown_queues();
            })
        };

        let mut crawl_pool = JoinSet::new();
        for id in 0..self.config.crawler.crawl_workers {
            crawl_pool.spawn(run_crawl_worker(id, ctx.clone()));
        }
        let mut resource_pool = JoinSet::new();
        for id in 0..self.config.crawler.resource_workers {
            resource_pool.spawn(run_resource_worker(id, ctx.clone()));
        }

        join_pool("crawl", &mut crawl_pool).await;
        // Crawl workers were the only producers of resources
        ctx.resources.seal();
        join_pool("resource", &mut resource_pool).await;
        watcher.abort();

        let cancelled = ctx.cancel.is_cancelled();
        let aborted = ctx.abort_reason();

        let pages = ctx.take_pages();
        let writer = SiteWriter::new(&output_dir, ctx.incremental());
        let links = writer.link_map(&pages, &ctx.checkpointer.snapshot()).await;
        let written = writer.write_all(&pages, &links).await;
        for (url, cause) in &written.failed {
            ctx.stats
                .record_failure(url, format!("write failed: {}", cause));
        }

        if cancelled || aborted.is_some() {
            match ctx.checkpointer.flush().await {
                Ok(()) => tracing::info!("Progress saved for resume"),
                Err(e) => tracing::error!("Failed to save crawl state: {}", e),
            }
        } else {
            self.clear_state().await;
        }

        ctx.plugins.crawl_end(&pages);

        let statistics = ctx.stats.snapshot();
        let elapsed = started.elapsed();
        tracing::info!(
            "Crawl finished: {} pages, {} resources, {} failures in {:?}",
            statistics.pages_total(),
            statistics.resources_total(),
            statistics.failures.len(),
            elapsed
        );

        if let Some((url, reason)) = aborted {
            return Err(MirrorError::Aborted { url, reason });
        }

        Ok(CrawlReport {
            target: self.target.clone(),
            output_dir,
            statistics,
            pages_written: written.written,
            elapsed,
            cancelled,
            aborted: None,
        })
    }
}

async fn join_pool(name: &str, pool: &mut JoinSet<()>) {
    while let Some(result) = pool.join_next().await {
        if let Err(e) = result {
            tracing::error!("A {} worker stopped unexpectedly: {}", name, e);
        }
    }
}

/// Runs a complete mirror operation with the default transport
///
/// # Example
///
/// ```no_run
/// use sumi_mirror::config::load_config;
/// use sumi_mirror::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("mirror.toml"))?;
/// let report = run_crawl(config).await?;
/// println!("{} pages", report.statistics.pages_total());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport, MirrorError> {
    Coordinator::new(config)?.run().await
}
