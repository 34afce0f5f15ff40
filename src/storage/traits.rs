//! Storage traits and error types
//!
//! This module defines the trait interface for resume-state backends and
//! associated error types.

use crate::state::CrawlState;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background write failed: {0}")]
    Task(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for resume-state backends
///
/// Implementations must serialize concurrent `save` calls themselves; the
/// crawl calls `save` from whichever worker reaches a checkpoint.
pub trait StateStore: Send + Sync {
    /// Loads the last saved state
    ///
    /// Missing, unreadable or corrupt data yields an empty state and a
    /// warning; loading never fails the crawl.
    fn load(&self) -> CrawlState;

    /// Durably replaces the saved state
    fn save(&self, state: &CrawlState) -> StorageResult<()>;

    /// Removes any saved state
    fn clear(&self) -> StorageResult<()>;

    /// Where the state lives, for log lines
    fn location(&self) -> String;
}
