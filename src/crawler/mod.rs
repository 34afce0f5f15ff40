//! Crawler module for page and resource fetching
//!
//! This module contains the core crawling logic, including:
//! - The page frontier and resource queue with drain detection
//! - HTTP transport, retry/backoff and request throttling
//! - Freshness decisions for incremental runs
//! - HTML parsing and link extraction
//! - The crawl and resource worker pools and their coordination

mod context;
mod coordinator;
mod fetcher;
mod freshness;
mod parser;
mod queue;
mod renderer;
mod resources;
mod retry;
mod throttle;
mod worker;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use fetcher::{
    build_http_client, looks_like_html, parse_http_date, parse_retry_after, FetchError,
    HttpResponse, ReqwestTransport, Transport, MAX_REDIRECTS, PAGE_HEADERS, RESOURCE_HEADERS,
};
pub use freshness::{compare, local_mtime, FreshnessDecision, FreshnessOracle};
pub use parser::{is_special_reference, parse_html, resolve_link, ParsedPage};
pub use queue::{Admission, CrawlTask, DoneGuard, Frontier, ResourceQueue, ResourceTask, WorkQueue};
pub use renderer::{render_with_deadline, RenderError, Renderer};
pub use retry::{RetryError, RetryPolicy};
pub use throttle::Throttle;
