use crate::state::CrawlState;
use crate::storage::atomic::write_atomic;
use crate::storage::traits::{StateStore, StorageResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Resume state stored as a JSON document
#[derive(Debug)]
pub struct JsonStateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> CrawlState {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No saved state at {}", self.path.display());
                return CrawlState::default();
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read state file {}, starting empty: {}",
                    self.path.display(),
                    e
                );
                return CrawlState::default();
            }
        };

        match serde_json::from_str::<CrawlState>(&content) {
            Ok(state) => {
                tracing::info!(
                    "Loaded state from {}: {} visited URLs, {} downloaded files",
                    self.path.display(),
                    state.visited_urls.len(),
                    state.downloaded_files.len()
                );
                state
            }
            Err(e) => {
                tracing::warn!(
                    "State file {} is corrupt, starting empty: {}",
                    self.path.display(),
                    e
                );
                CrawlState::default()
            }
        }
    }

    fn save(&self, state: &CrawlState) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(state)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        write_atomic(&self.path, &json)?;
        tracing::debug!(
            "Saved state to {} ({} visited URLs)",
            self.path.display(),
            state.visited_urls.len()
        );
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("Removed state file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
