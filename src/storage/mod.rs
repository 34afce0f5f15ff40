//! Storage module for persisting crawl data
//!
//! This module handles everything the crawl writes outside the mirror itself:
//! - The resume state file (`StateStore`, `JsonStateStore`)
//! - Checkpointing of completed work during the crawl (`Checkpointer`)
//! - Atomic write-then-rename used for every file the crawl produces

mod atomic;
mod checkpoint;
mod json;
mod traits;

pub use atomic::{write_atomic, write_atomic_async};
pub use checkpoint::Checkpointer;
pub use json::JsonStateStore;
pub use traits::{StateStore, StorageError, StorageResult};

use crate::config::ResumeConfig;
use std::sync::Arc;

/// Opens the state store configured for resume, if resume is enabled
pub fn open_state_store(config: &ResumeConfig) -> Option<Arc<dyn StateStore>> {
    if !config.enabled {
        return None;
    }
    Some(Arc::new(JsonStateStore::new(config.state_file.clone())))
}
