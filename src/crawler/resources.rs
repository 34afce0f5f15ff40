use crate::crawler::context::CrawlContext;
use crate::crawler::fetcher::RESOURCE_HEADERS;
use crate::crawler::queue::ResourceTask;
use crate::state::TaskOutcome;
use crate::storage::write_atomic_async;
use std::sync::Arc;

/// Runs until the resource queue is drained or closed
pub(crate) async fn run_resource_worker(id: usize, ctx: Arc<CrawlContext>) {
    tracing::debug!("Resource worker {} started", id);

    while let Some(task) = ctx.resources.dequeue().await {
        let _done = ctx.resources.done_guard();
        if ctx.cancel.is_cancelled() {
            break;
        }

        let outcome = download_resource(&ctx, &task).await;
        ctx.stats.record_resource(outcome);
        if outcome.is_success() {
            ctx.checkpointer
                .record_download(task.url.as_str(), task.local_path.clone());
        }
        ctx.checkpointer.maybe_save().await;
    }

    tracing::debug!("Resource worker {} finished", id);
}

/// Downloads one static resource unless the local copy is fresh
async fn download_resource(ctx: &CrawlContext, task: &ResourceTask) -> TaskOutcome {
    let target = ctx.output_dir.join(&task.local_path);

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
    if !decision.needs_fetch() {
        tracing::debug!("Resource {} unchanged ({:?})", task.url, decision);
        return TaskOutcome::Unchanged;
    }

    let url = &task.url;
    let transport = &ctx.transport;
    let throttle = &ctx.throttle;
    let label = format!("GET {}", url);
    let response = match ctx
        .retry
        .execute(&ctx.cancel, &label, || async move {
            throttle.wait().await;
            transport.fetch(url, RESOURCE_HEADERS).await?.error_for_status()
        })
        .await
    {
        Ok(response) => response,
        Err(e) => return ctx.dispose(url, e),
    };

    // Written even if cancellation arrives now; the rename keeps it whole
    match write_atomic_async(target, response.body).await {
        Ok(()) => {
            tracing::debug!(
                "Downloaded {} to {}",
                task.url,
                task.local_path.display()
            );
            TaskOutcome::Fetched
        }
        Err(e) => {
            ctx.report_failure(url, &format!("write failed: {}", e));
            TaskOutcome::Failed
        }
    }
}
