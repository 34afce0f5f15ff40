//! JavaScript renderer capability
//!
//! The crate does not ship a browser; an embedding application may provide
//! one through [`Renderer`]. The crawl worker calls it once per page with a
//! bounded wait and falls back to a plain fetch on any failure.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("render timed out after {0:?}")]
    Timeout(Duration),

    #[error("render failed: {0}")]
    Failed(String),
}

/// Produces the post-script HTML of a page
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Renders `url`, giving up after roughly `timeout`
    async fn render(&self, url: &Url, timeout: Duration) -> Result<String, RenderError>;
}

/// Single render attempt with a hard deadline
///
/// The deadline applies even if the renderer ignores its own timeout argument.
pub async fn render_with_deadline(
    renderer: &dyn Renderer,
    url: &Url,
    timeout: Duration,
) -> Result<String, RenderError> {
    match tokio::time::timeout(timeout, renderer.render(url, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(RenderError::Timeout(timeout)),
    }
}
