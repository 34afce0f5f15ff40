use crate::state::CrawlState;
use crate::storage::traits::{StateStore, StorageError, StorageResult};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Live crawl state shared by all workers, saved at checkpoints
///
/// Workers record only completed work. Saves happen when the configured
/// interval has elapsed and once more at the end of the crawl. Saves are
/// serialized and each one snapshots the state after the previous save
/// finished, so the file only ever moves forward.
pub struct Checkpointer {
    store: Option<Arc<dyn StateStore>>,
    state: Mutex<CrawlState>,
    interval: Duration,
    last_save: Mutex<Instant>,
    save_lock: tokio::sync::Mutex<()>,
}

impl Checkpointer {
    /// `store` is None when resume is disabled; state is then tracked but never saved
    pub fn new(store: Option<Arc<dyn StateStore>>, initial: CrawlState, interval: Duration) -> Self {
        Self {
            store,
            state: Mutex::new(initial),
            interval,
            last_save: Mutex::new(Instant::now()),
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn state(&self) -> MutexGuard<'_, CrawlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_visit(&self, url: &str) {
        self.state().record_visit(url);
    }

    pub fn record_download(&self, url: &str, local_path: PathBuf) {
        self.state().record_download(url, local_path);
    }

    /// Resource URL to local path for everything downloaded so far
    pub fn downloaded_files(&self) -> BTreeMap<String, PathBuf> {
        self.state().downloaded_files.clone()
    }

    pub fn snapshot(&self) -> CrawlState {
        self.state().clone()
    }

    /// Saves if the checkpoint interval has elapsed
    pub async fn maybe_save(&self) {
        if self.store.is_none() {
            return;
        }
        {
            let mut last = self.last_save.lock().unwrap_or_else(PoisonError::into_inner);
            if last.elapsed() < self.interval {
                return;
            }
            *last = Instant::now();
        }
        if let Err(e) = self.flush().await {
            tracing::warn!("Checkpoint failed: {}", e);
        }
    }

    /// Saves now
    pub async fn flush(&self) -> StorageResult<()> {
        let store = match &self.store {
            Some(store) => store.clone(),
            None => return Ok(()),
        };

        let _serialized = self.save_lock.lock().await;
        let snapshot = {
            let mut state = self.state();
            state.saved_at = Some(Utc::now());
            state.clone()
        };
        let location = store.location();
        tokio::task::spawn_blocking(move || store.save(&snapshot))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;
        tracing::debug!("Checkpoint written to {}", location);
        Ok(())
    }
}
