//! Crawl lifecycle hooks
//!
//! A [`Plugin`] implements whichever hooks it cares about; the rest default
//! to no-ops. The [`PluginDispatcher`] calls registered plugins in
//! registration order. A plugin that returns an error or panics is logged
//! and skipped; it never fails the crawl.

use crate::state::PageRecord;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Error reported by a plugin hook
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct PluginError(pub String);

impl From<String> for PluginError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for PluginError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<std::io::Error> for PluginError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

/// Lifecycle hooks a crawl emits
///
/// # Example
///
/// ```
/// use sumi_mirror::plugins::{Plugin, PluginError};
///
/// struct PrintPages;
///
/// impl Plugin for PrintPages {
///     fn name(&self) -> &str {
///         "print-pages"
///     }
///
///     fn on_page_crawled(&self, url: &str, _local_path: &str, _content: &str) -> Result<(), PluginError> {
///         println!("crawled {}", url);
///         Ok(())
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Called once before the first page is fetched
    fn on_crawl_start(&self, _url: &str, _output_dir: &Path) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called after each page is fetched or loaded from the local mirror
    fn on_page_crawled(
        &self,
        _url: &str,
        _local_path: &str,
        _content: &str,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called when a page or resource fails for good
    fn on_error(&self, _url: &str, _error: &str) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called once with every page record of the run
    fn on_crawl_end(&self, _pages: &[PageRecord]) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Ordered list of plugins with best-effort delivery
#[derive(Default, Clone)]
pub struct PluginDispatcher {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl std::fmt::Debug for PluginDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.name().to_string()))
            .finish()
    }
}

impl PluginDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin after the ones already registered
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        tracing::debug!("Registered plugin {}", plugin.name());
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn crawl_start(&self, url: &str, output_dir: &Path) {
        self.dispatch("on_crawl_start", |p| p.on_crawl_start(url, output_dir));
    }

    pub fn page_crawled(&self, url: &str, local_path: &str, content: &str) {
        self.dispatch("on_page_crawled", |p| {
            p.on_page_crawled(url, local_path, content)
        });
    }

    pub fn error(&self, url: &str, error: &str) {
        self.dispatch("on_error", |p| p.on_error(url, error));
    }

    pub fn crawl_end(&self, pages: &[PageRecord]) {
        self.dispatch("on_crawl_end", |p| p.on_crawl_end(pages));
    }

    fn dispatch<F>(&self, hook: &str, call: F)
    where
        F: Fn(&dyn Plugin) -> Result<(), PluginError>,
    {
        for plugin in &self.plugins {
            match catch_unwind(AssertUnwindSafe(|| call(plugin.as_ref()))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!("Plugin {} failed in {}: {}", plugin.name(), hook, e);
                }
                Err(_) => {
                    tracing::error!("Plugin {} panicked in {}", plugin.name(), hook);
                }
            }
        }
    }
}
