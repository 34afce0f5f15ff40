//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TaskOutcome`: How a page or resource task ended
//! - `PageRecord`: A page obtained during the crawl, handed to plugins and the page store
//! - `CrawlState`: The completed-work record persisted for resume

mod crawl_state;
mod page_record;
mod page_state;

// Re-export main types
pub use crawl_state::CrawlState;
pub use page_record::PageRecord;
pub use page_state::TaskOutcome;
