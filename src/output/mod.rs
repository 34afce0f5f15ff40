//! Output module for the mirror on disk and the run summary
//!
//! This module handles:
//! - Rewriting page references for offline browsing
//! - Writing crawled pages (and their pristine copies) into the mirror
//! - Recording run statistics and printing the final summary

pub mod rewrite;
mod site_writer;
pub mod stats;

pub use rewrite::{relative_path, LinkMap, LinkRewriter};
pub use site_writer::{load_local_page, pristine_path, SiteWriter, WriteSummary, PRISTINE_SUFFIX};
pub use stats::{print_summary, CrawlStatistics, CrawlStats, FailedUrl};
