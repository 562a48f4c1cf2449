//! Deferred execution for debounced reconciliation.
//!
//! A [`Scheduler`] holds at most one pending task. [`TokioScheduler`] backs it
//! with a single-shot timer task; [`ManualScheduler`] holds the task until a
//! test fires it, so debounce behavior is testable without wall-clock waits.
//!
//! Cancelling only ever aborts the wait. Once the delay has elapsed the task
//! runs detached and is no longer reachable by `cancel_pending`, so a pass
//! that has started writing always runs to completion.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::trace;

/// Work handed to a scheduler.
pub type Task = BoxFuture<'static, ()>;

pub trait Scheduler: Send + Sync + 'static {
    /// Run `task` once `after` has elapsed, replacing any pending task.
    fn schedule(&self, after: Duration, task: Task);

    /// Drop the pending task, if any, before it starts.
    fn cancel_pending(&self);
}

fn recover<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// =============================================================================
// Tokio Scheduler
// =============================================================================

/// Single-shot timer on the tokio runtime. Must be used from within a runtime.
#[derive(Debug, Default)]
pub struct TokioScheduler {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, after: Duration, task: Task) {
        let timer = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            tokio::spawn(task);
        });
        if let Some(previous) = recover(&self.pending).replace(timer) {
            previous.abort();
        }
    }

    fn cancel_pending(&self) {
        if let Some(timer) = recover(&self.pending).take() {
            trace!("cancelling pending timer");
            timer.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

// =============================================================================
// Manual Scheduler
// =============================================================================

/// Scheduler that never fires on its own. Call [`ManualScheduler::fire`].
#[derive(Default)]
pub struct ManualScheduler {
    pending: Mutex<Option<(Duration, Task)>>,
    scheduled: Mutex<usize>,
    cancelled: Mutex<usize>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        recover(&self.pending).is_some()
    }

    /// Delay the pending task was scheduled with.
    pub fn pending_delay(&self) -> Option<Duration> {
        recover(&self.pending).as_ref().map(|(after, _)| *after)
    }

    /// How many times `schedule` was called.
    pub fn scheduled_count(&self) -> usize {
        *recover(&self.scheduled)
    }

    /// How many pending tasks were dropped by `cancel_pending`.
    pub fn cancelled_count(&self) -> usize {
        *recover(&self.cancelled)
    }

    /// Run the pending task to completion, as if its delay elapsed.
    ///
    /// Returns false when nothing was pending.
    pub async fn fire(&self) -> bool {
        let task = recover(&self.pending).take();
        match task {
            Some((_, task)) => {
                task.await;
                true
            }
            None => false,
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, after: Duration, task: Task) {
        *recover(&self.scheduled) += 1;
        *recover(&self.pending) = Some((after, task));
    }

    fn cancel_pending(&self) {
        if recover(&self.pending).take().is_some() {
            *recover(&self.cancelled) += 1;
        }
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("has_pending", &self.has_pending())
            .field("scheduled", &self.scheduled_count())
            .finish()
    }
}

// =============================================================================
// Debouncer
// =============================================================================

/// Coalesces bursts of triggers into one run after a quiet window.
#[derive(Clone)]
pub struct Debouncer {
    scheduler: Arc<dyn Scheduler>,
    window: Duration,
}

impl Debouncer {
    pub fn new(scheduler: Arc<dyn Scheduler>, window: Duration) -> Self {
        Self { scheduler, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Restart the quiet window with `task` as the work to run at its end.
    pub fn trigger(&self, task: Task) {
        self.scheduler.cancel_pending();
        self.scheduler.schedule(self.window, task);
    }

    pub fn cancel(&self) {
        self.scheduler.cancel_pending();
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("window", &self.window)
            .finish()
    }
}
