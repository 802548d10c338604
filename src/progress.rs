//! Run progress tracking
//!
//! The [`ProgressTracker`] owns the only datum mutated by concurrently finishing
//! tasks: the completed counter. Increments are single atomic `fetch_add`s, so two
//! tasks finishing at the same instant can never lose a count.
//!
//! The UI collaborator plugs in through [`ProgressSubscriber`]; [`ProgressGuard`]
//! makes sure the indicator it shows is hidden again on every exit path.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::ProgressState;

/// Progress indicator owned by the UI collaborator
///
/// All methods default to no-ops so implementors override only what they render.
pub trait ProgressSubscriber: Send + Sync {
    /// Make the indicator visible
    fn show(&self) {}

    /// Hide the indicator
    fn hide(&self) {}

    /// Report `completed` of `total` tasks finished
    fn update(&self, _completed: u64, _total: u64) {}
}

/// Subscriber that renders nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSubscriber;

impl ProgressSubscriber for NoopSubscriber {}

/// Completed-vs-total counter for one export run
#[derive(Clone)]
pub struct ProgressTracker {
    completed: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
    subscriber: Arc<dyn ProgressSubscriber>,
}

impl ProgressTracker {
    /// Create a tracker forwarding updates to `subscriber`
    pub fn new(subscriber: Arc<dyn ProgressSubscriber>) -> Self {
        Self {
            completed: Arc::new(AtomicU64::new(0)),
            total: Arc::new(AtomicU64::new(0)),
            subscriber,
        }
    }

    /// Tracker with no subscriber attached
    pub fn detached() -> Self {
        Self::new(Arc::new(NoopSubscriber))
    }

    /// Reset for a new run of `total` tasks and announce `0 / total`
    pub fn on_start(&self, total: u64) {
        self.completed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
        self.subscriber.update(0, total);
    }

    /// Record one task termination; returns the new completed count
    ///
    /// The count saturates at `total`.
    pub fn on_task_complete(&self) -> u64 {
        let total = self.total.load(Ordering::SeqCst);
        let completed = match self
            .completed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
                (c < total).then_some(c + 1)
            }) {
            Ok(previous) => previous + 1,
            Err(current) => {
                tracing::warn!(
                    completed = current,
                    total,
                    "task completion reported past total"
                );
                current
            }
        };
        self.subscriber.update(completed, total);
        completed
    }

    /// Current `(completed, total)`
    pub fn snapshot(&self) -> ProgressState {
        ProgressState {
            completed: self.completed.load(Ordering::SeqCst),
            total: self.total.load(Ordering::SeqCst),
        }
    }

    /// Show the subscriber's indicator until the returned guard is dropped
    pub fn show(&self) -> ProgressGuard {
        self.subscriber.show();
        ProgressGuard {
            subscriber: Arc::clone(&self.subscriber),
        }
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

/// Hides the progress indicator when dropped
#[must_use = "the indicator is hidden as soon as the guard is dropped"]
pub struct ProgressGuard {
    subscriber: Arc<dyn ProgressSubscriber>,
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.subscriber.hide();
    }
}
