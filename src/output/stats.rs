//! Run statistics and the final summary
//!
//! Workers update [`CrawlStats`] as tasks finish; the coordinator takes a
//! [`CrawlStatistics`] snapshot at the end of the run.

use crate::crawler::CrawlReport;
use crate::state::TaskOutcome;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// A URL that could not be mirrored, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUrl {
    pub url: String,
    pub cause: String,
}

/// Live counters shared by every worker
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_fetched: AtomicU64,
    pages_unchanged: AtomicU64,
    pages_skipped: AtomicU64,
    pages_failed: AtomicU64,
    resources_downloaded: AtomicU64,
    resources_unchanged: AtomicU64,
    resources_skipped: AtomicU64,
    resources_failed: AtomicU64,
    failures: Mutex<Vec<FailedUrl>>,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a finished page task; cancelled tasks are not counted
    pub fn record_page(&self, outcome: TaskOutcome) {
        let counter = match outcome {
            TaskOutcome::Fetched => &self.pages_fetched,
            TaskOutcome::Unchanged => &self.pages_unchanged,
            TaskOutcome::Skipped => &self.pages_skipped,
            TaskOutcome::Failed => &self.pages_failed,
            TaskOutcome::Cancelled => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a finished resource task; cancelled tasks are not counted
    pub fn record_resource(&self, outcome: TaskOutcome) {
        let counter = match outcome {
            TaskOutcome::Fetched => &self.resources_downloaded,
            TaskOutcome::Unchanged => &self.resources_unchanged,
            TaskOutcome::Skipped => &self.resources_skipped,
            TaskOutcome::Failed => &self.resources_failed,
            TaskOutcome::Cancelled => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, url: &str, cause: impl ToString) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FailedUrl {
                url: url.to_string(),
                cause: cause.to_string(),
            });
    }

    pub fn snapshot(&self) -> CrawlStatistics {
        let mut failures = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        failures.sort_by(|a, b| a.url.cmp(&b.url));

        CrawlStatistics {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_unchanged: self.pages_unchanged.load(Ordering::Relaxed),
            pages_skipped: self.pages_skipped.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            resources_downloaded: self.resources_downloaded.load(Ordering::Relaxed),
            resources_unchanged: self.resources_unchanged.load(Ordering::Relaxed),
            resources_skipped: self.resources_skipped.load(Ordering::Relaxed),
            resources_failed: self.resources_failed.load(Ordering::Relaxed),
            failures,
        }
    }
}

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    pub pages_fetched: u64,
    pub pages_unchanged: u64,
    pub pages_skipped: u64,
    pub pages_failed: u64,
    pub resources_downloaded: u64,
    pub resources_unchanged: u64,
    pub resources_skipped: u64,
    pub resources_failed: u64,
    /// Failed URLs (pages and resources) sorted by URL
    pub failures: Vec<FailedUrl>,
}

impl CrawlStatistics {
    pub fn pages_total(&self) -> u64 {
        self.pages_fetched + self.pages_unchanged + self.pages_skipped + self.pages_failed
    }

    pub fn resources_total(&self) -> u64 {
        self.resources_downloaded
            + self.resources_unchanged
            + self.resources_skipped
            + self.resources_failed
    }

    /// Share of all finished tasks that did not fail, in percent
    pub fn success_rate(&self) -> f64 {
        let total = self.pages_total() + self.resources_total();
        if total == 0 {
            return 0.0;
        }
        let failed = self.pages_failed + self.resources_failed;
        ((total - failed) as f64 / total as f64) * 100.0
    }
}

/// Prints the end-of-run summary to stdout
pub fn print_summary(report: &CrawlReport) {
    let stats = &report.statistics;

    println!("=== Mirror Summary ===\n");

    println!("Overview:");
    println!("  Target: {}", report.target);
    println!("  Output: {}", report.output_dir.display());
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    if let Some(reason) = &report.aborted {
        println!("  Status: aborted ({})", reason);
    } else if report.cancelled {
        println!("  Status: cancelled");
    } else {
        println!("  Status: complete");
    }
    println!();

    println!("Pages ({}):", stats.pages_total());
    println!("  Fetched: {}", stats.pages_fetched);
    println!("  Unchanged: {}", stats.pages_unchanged);
    println!("  Skipped: {}", stats.pages_skipped);
    println!("  Failed: {}", stats.pages_failed);
    println!();

    println!("Resources ({}):", stats.resources_total());
    println!("  Downloaded: {}", stats.resources_downloaded);
    println!("  Unchanged: {}", stats.resources_unchanged);
    println!("  Skipped: {}", stats.resources_skipped);
    println!("  Failed: {}", stats.resources_failed);
    println!();

    if !stats.failures.is_empty() {
        println!("Failed URLs ({}):", stats.failures.len());
        for failure in &stats.failures {
            println!("  - {}: {}", failure.url, failure.cause);
        }
        println!();
    }

    println!("Success Rate: {:.1}%", stats.success_rate());
}
