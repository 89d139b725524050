//! # Worker pool: the task-submission boundary.
//!
//! Every publish becomes exactly one task on the [`WorkerPool`]. The pool is
//! an explicit, injectable abstraction over `tokio::spawn`:
//!
//! - **Elastic by default**: no ceiling means tasks run as soon as the
//!   runtime schedules them.
//! - **Optional ceiling**: a semaphore bounds how many dispatch tasks run
//!   concurrently. The permit is acquired *inside* the spawned task, so
//!   `publish` never blocks the caller; excess publishes queue on the
//!   semaphore, not on the publishing thread.
//! - **Tracked lifecycle**: tasks register with a `TaskTracker`;
//!   [`WorkerPool::shutdown`] waits for everything in flight.
//!
//! ```text
//! publish ──► submit(task) ──► tokio::spawn ──► [permit?] ──► dispatch run
//!                 │
//!                 └──► DispatchHandle (join, no cancel-on-drop)
//! ```
//!
//! Tests wanting determinism can build a one-permit pool (strictly serialized
//! dispatches) or await each [`DispatchHandle`] on a current-thread runtime.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Handle to one submitted dispatch run.
///
/// Completion of the handle covers that single run only, never the
/// republishes it may have triggered. Dropping the handle detaches the task;
/// it keeps running to completion in the background.
#[derive(Debug)]
pub struct DispatchHandle {
    join: JoinHandle<()>,
}

impl DispatchHandle {
    /// Waits for the run to finish without a bound.
    ///
    /// Returns `false` if the task panicked or was aborted by the runtime.
    pub async fn completed(self) -> bool {
        self.join.await.is_ok()
    }

    /// Waits up to `timeout` for the run to finish.
    ///
    /// Returns `true` only on in-time, successful completion. Timing out
    /// does **not** cancel the run; the task continues in the background
    /// and any events it republishes are dispatched normally.
    pub async fn wait(self, timeout: Duration) -> bool {
        matches!(tokio::time::timeout(timeout, self.join).await, Ok(Ok(())))
    }

    /// True once the run has finished (successfully or not).
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Explicitly detaches the handle; the run continues unobserved.
    pub fn forget(self) {}
}

/// Shared pool executing dispatch tasks.
///
/// Cheap to share behind the bus instance; all state is the tracker plus an
/// optional semaphore.
pub struct WorkerPool {
    tracker: TaskTracker,
    semaphore: Option<Arc<Semaphore>>,
}

impl WorkerPool {
    /// Creates a pool.
    ///
    /// - `limit = None`: elastic; every submitted task runs immediately.
    /// - `limit = Some(n)`: at most `n` dispatch runs concurrently
    ///   (clamped to a minimum of 1); excess runs queue FIFO-ish on the
    ///   semaphore inside their own task.
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            tracker: TaskTracker::new(),
            semaphore: limit.map(|n| Arc::new(Semaphore::new(n.max(1)))),
        }
    }

    /// Submits one unit of work; returns immediately.
    ///
    /// Must be called within a tokio runtime context.
    pub fn submit<F>(&self, work: F) -> DispatchHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let semaphore = self.semaphore.clone();
        let join = self.tracker.spawn(async move {
            let _permit = match semaphore {
                Some(s) => match s.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    // Semaphore closed: the pool is shutting down.
                    Err(_) => return,
                },
                None => None,
            };
            work.await;
        });
        DispatchHandle { join }
    }

    /// Stops accepting completion tracking and waits for in-flight tasks.
    pub async fn shutdown(&self) {
        if let Some(s) = &self.semaphore {
            s.close();
        }
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Number of tasks currently tracked (running or queued on the permit).
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }
}
