//! Bounded retries with exponential backoff
//!
//! A [`RetryPolicy`] wraps exactly one network operation. The caller decides
//! what to do with the returned [`RetryError`] using the policy's
//! `on_exhausted` disposition, so retries never repeat side effects on shared
//! crawl state.

use crate::config::{FailureDisposition, RetryConfig};
use crate::crawler::fetcher::FetchError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a retried operation did not produce a value
#[derive(Debug, Clone, Error)]
pub enum RetryError {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: FetchError },

    #[error("permanent failure: {0}")]
    Permanent(FetchError),

    #[error("cancelled")]
    Cancelled,
}

impl RetryError {
    /// The last underlying fetch error, if there was one
    pub fn cause(&self) -> Option<&FetchError> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::Permanent(e) => Some(e),
            Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
    pub max_delay: Duration,
    pub on_exhausted: FailureDisposition,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            jitter: config.jitter,
            max_delay: Duration::from_millis(config.max_delay_ms),
            on_exhausted: config.on_exhausted,
        }
    }

    /// Un-jittered wait before attempt `attempt` (1-based)
    ///
    /// The first attempt has no wait; attempt n waits
    /// `base_delay * backoff_multiplier^(n-2)`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Wait before `attempt`, honoring a server-requested delay
    fn wait_before(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(requested) = retry_after {
            return requested.min(self.max_delay);
        }
        let delay = self.delay_for_attempt(attempt);
        if self.jitter {
            let factor: f64 = rand::thread_rng().gen_range(0.5..=1.5);
            delay.mul_f64(factor).min(self.max_delay)
        } else {
            delay
        }
    }

    /// Runs `op` until it succeeds, fails permanently, runs out of attempts,
    /// or `cancel` fires
    ///
    /// # Arguments
    ///
    /// * `cancel` - Shared stop signal, checked before every attempt and during waits
    /// * `label` - What is being fetched, for log lines
    /// * `op` - The network operation; called once per attempt
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        label: &str,
        mut op: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !error.is_retryable() {
                tracing::debug!("{} failed permanently: {}", label, error);
                return Err(RetryError::Permanent(error));
            }

            if attempt >= self.max_attempts {
                tracing::warn!(
                    "{} failed after {} attempts: {}",
                    label,
                    attempt,
                    error
                );
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }

            attempt += 1;
            let wait = self.wait_before(attempt, error.retry_after());
            tracing::debug!(
                "{} failed ({}), attempt {}/{} in {:?}",
                label,
                error,
                attempt,
                self.max_attempts,
                wait
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}
