//! Process-wide request pacing

use crate::config::DelayConfig;
use rand::Rng;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces the configured delay between network requests across all workers
///
/// Requests are spaced so that at least one delay passes between the start
/// of two consecutive requests, whichever worker sends them.
#[derive(Debug)]
pub struct Throttle {
    delay: DelayConfig,
    last_request: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(delay: DelayConfig) -> Self {
        Self {
            delay,
            last_request: Mutex::new(None),
        }
    }

    /// The delay to use for the next gap
    pub fn next_delay(&self) -> Duration {
        match self.delay {
            DelayConfig::None => Duration::ZERO,
            DelayConfig::Fixed { ms } => Duration::from_millis(ms),
            DelayConfig::Random { min_ms, max_ms } => {
                let ms = rand::thread_rng().gen_range(min_ms..=max_ms.max(min_ms));
                Duration::from_millis(ms)
            }
        }
    }

    /// Waits until this caller may send a request
    pub async fn wait(&self) {
        if self.delay == DelayConfig::None {
            return;
        }

        // Held across the sleep so callers are released one at a time
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.next_delay();
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
