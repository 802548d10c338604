//! Bounded-concurrency runner for independent units of work.
//!
//! Tasks are driven through a `buffer_unordered` stream so a finished task frees
//! its slot immediately, whatever its position in the list. Each output is tagged
//! with its submission index and placed back into a result vector, which keeps the
//! output in submission order regardless of completion order.

use std::future::Future;

use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::progress::ProgressTracker;

/// Run `tasks` with at most `limit` in flight; results come back in submission order.
///
/// A failed task yields `None` in its slot and is logged; it never cancels or delays
/// its siblings and never fails the run. Every termination, success or failure,
/// is reported to `progress` exactly once. `limit` of zero behaves as one.
///
/// The tracker is not reset here; callers call [`ProgressTracker::on_start`] once the
/// task count is known. An empty list returns immediately without any progress call.
pub async fn run_concurrently<T, Fut>(
    tasks: Vec<Fut>,
    limit: usize,
    progress: &ProgressTracker,
) -> Vec<Option<T>>
where
    Fut: Future<Output = Result<T>>,
{
    let total = tasks.len();
    if total == 0 {
        return Vec::new();
    }
    let limit = limit.max(1);
    tracing::debug!(total, limit, "running tasks");

    let mut results: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();

    let mut completions = stream::iter(tasks.into_iter().enumerate())
        .map(|(index, task)| async move { (index, task.await) })
        .buffer_unordered(limit);

    while let Some((index, outcome)) = completions.next().await {
        match outcome {
            Ok(value) => results[index] = Some(value),
            Err(e) => {
                tracing::warn!(index, error = %e, "task failed, continuing with the rest");
            }
        }
        progress.on_task_complete();
    }

    results
}
