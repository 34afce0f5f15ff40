//! Crawl worker: one page task at a time from the frontier
//!
//! Per task: freshness check, then either a network fetch (renderer first when
//! configured) or a reload of the local copy, then link and resource
//! extraction, which feeds both queues.

use crate::crawler::context::CrawlContext;
use crate::crawler::fetcher::{looks_like_html, HttpResponse, PAGE_HEADERS};
use crate::crawler::parser::{parse_html, ParsedPage};
use crate::crawler::queue::CrawlTask;
use crate::crawler::renderer::render_with_deadline;
use crate::crawler::retry::RetryError;
use crate::output::load_local_page;
use crate::state::{PageRecord, TaskOutcome};
use crate::storage::write_atomic_async;
use crate::url::{classify, normalize_parsed, to_local_path, Classification};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// What a page fetch produced
enum PageBody {
    Html {
        final_url: Url,
        content: String,
        last_modified: Option<DateTime<Utc>>,
    },
    Binary(HttpResponse),
}

/// Runs until the frontier is drained or closed
pub(crate) async fn run_crawl_worker(id: usize, ctx: Arc<CrawlContext>) {
    tracing::debug!("Crawl worker {} started", id);

    while let Some(task) = ctx.frontier.dequeue().await {
        let _done = ctx.frontier.done_guard();
        if ctx.cancel.is_cancelled() {
            break;
        }

        let outcome = process_page(&ctx, &task).await;
        ctx.stats.record_page(outcome);
        if outcome.is_completed() {
            ctx.checkpointer.record_visit(task.url.as_str());
        }
        ctx.checkpointer.maybe_save().await;

        let done = ctx.pages_done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % 10 == 0 {
            tracing::info!(
                "Progress: {} pages done, {} outstanding, {} resources queued",
                done,
                ctx.frontier.outstanding(),
                ctx.resources.outstanding()
            );
        }
    }

    tracing::debug!("Crawl worker {} finished", id);
}

/// Handles one page task and returns how it ended
async fn process_page(ctx: &CrawlContext, task: &CrawlTask) -> TaskOutcome {
    let local_path = to_local_path(&task.url);
    let target = ctx.output_dir.join(&local_path);

    let decision = ctx
        .freshness
        .decide(
            &task.url,
            &target,
            ctx.incremental(),
            ctx.force_download(),
            &ctx.cancel,
        )
        .await;
    if ctx.cancel.is_cancelled() {
        return TaskOutcome::Cancelled;
    }

    let (final_url, content, last_modified, outcome) = if decision.needs_fetch() {
        match fetch_page(ctx, task).await {
            Ok(PageBody::Html {
                final_url,
                content,
                last_modified,
            }) => (final_url, content, last_modified, TaskOutcome::Fetched),
            Ok(PageBody::Binary(response)) => {
                return save_binary_page(ctx, &task.url, &local_path, response).await;
            }
            Err(e) => return ctx.dispose(&task.url, e),
        }
    } else {
        match load_local_page(&ctx.output_dir, &local_path).await {
            Some(content) if is_html_document(&local_path, &content) => {
                tracing::debug!("{} unchanged ({:?}), reusing local copy", task.url, decision);
                (task.url.clone(), content, None, TaskOutcome::Unchanged)
            }
            Some(_) => {
                tracing::debug!("{} unchanged, not HTML", task.url);
                ctx.checkpointer
                    .record_download(task.url.as_str(), local_path);
                return TaskOutcome::Unchanged;
            }
            None => {
                ctx.report_failure(&task.url, "local copy could not be read");
                return TaskOutcome::Failed;
            }
        }
    };

    let parsed = parse_html(&content, &final_url);
    schedule_discoveries(ctx, task, &parsed);

    let record = PageRecord {
        url: task.url.clone(),
        final_url,
        local_path,
        content,
        depth: task.depth,
        fetched_at: Utc::now(),
        remote_last_modified: last_modified,
        outcome,
    };
    ctx.plugins
        .page_crawled(record.url.as_str(), &record.local_path_str(), &record.content);
    ctx.push_page(record);

    tracing::debug!(
        "{} {} (depth {}, {} links, {} resources)",
        outcome,
        task.url,
        task.depth,
        parsed.links.len(),
        parsed.resources.len()
    );
    outcome
}

/// Renderer first when configured, then a plain fetch under the retry policy
async fn fetch_page(ctx: &CrawlContext, task: &CrawlTask) -> Result<PageBody, RetryError> {
    if let Some(renderer) = ctx.renderer.as_ref().filter(|_| ctx.config.renderer.enabled) {
        let timeout = Duration::from_millis(ctx.config.renderer.timeout_ms);
        match render_with_deadline(renderer.as_ref(), &task.url, timeout).await {
            Ok(content) => {
                return Ok(PageBody::Html {
                    final_url: task.url.clone(),
                    content,
                    last_modified: None,
                });
            }
            Err(e) => {
                tracing::warn!("Rendering {} failed, falling back to fetch: {}", task.url, e);
            }
        }
    }

    let url = &task.url;
    let transport = &ctx.transport;
    let throttle = &ctx.throttle;
    let label = format!("GET {}", url);
    let response = ctx
        .retry
        .execute(&ctx.cancel, &label, || async move {
            throttle.wait().await;
            transport.fetch(url, PAGE_HEADERS).await?.error_for_status()
        })
        .await?;

    if !response.is_html() {
        return Ok(PageBody::Binary(response));
    }

    Ok(PageBody::Html {
        last_modified: response.last_modified(),
        content: response.text(),
        final_url: response.final_url,
    })
}

/// Stores a non-HTML page target as-is; it is not parsed
async fn save_binary_page(
    ctx: &CrawlContext,
    url: &Url,
    local_path: &Path,
    response: HttpResponse,
) -> TaskOutcome {
    let target = ctx.output_dir.join(local_path);
    match write_atomic_async(target, response.body).await {
        Ok(()) => {
            tracing::debug!("Saved non-HTML page {} to {}", url, local_path.display());
            ctx.checkpointer
                .record_download(url.as_str(), local_path.to_path_buf());
            TaskOutcome::Fetched
        }
        Err(e) => {
            ctx.report_failure(url, &format!("write failed: {}", e));
            TaskOutcome::Failed
        }
    }
}

/// Classifies every discovered reference and queues the eligible ones
fn schedule_discoveries(ctx: &CrawlContext, task: &CrawlTask, parsed: &ParsedPage) {
    for link in &parsed.links {
        let url = match normalize_parsed(link.clone()) {
            Ok(url) => url,
            Err(e) => {
                tracing::trace!("Ignoring link {}: {}", link, e);
                continue;
            }
        };
        match classify(&url, &ctx.scope, &ctx.exclusions) {
            Classification::Eligible => {
                let admission = ctx.frontier.enqueue(url.clone(), task.depth + 1);
                tracing::trace!("Link {} -> {:?}", url, admission);
            }
            other => tracing::trace!("Link {} left external ({:?})", url, other),
        }
    }

    for resource in &parsed.resources {
        let url = match normalize_parsed(resource.clone()) {
            Ok(url) => url,
            Err(_) => continue,
        };
        if classify(&url, &ctx.scope, &ctx.exclusions).should_download() {
            let local_path = to_local_path(&url);
            ctx.resources.enqueue(url, local_path);
        }
    }
}

/// Whether a stored page should be parsed again
fn is_html_document(local_path: &Path, content: &str) -> bool {
    let by_extension = local_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
        .unwrap_or(false);
    by_extension || looks_like_html(content.as_bytes())
}
