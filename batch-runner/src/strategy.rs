//! The two interchangeable dispatch policies and the batch-scoped plumbing
//! behind them.
//!
//! Both strategies take the same input (an ordered list of units of work) and
//! hand back one handle per unit in submission order. Execution contexts are
//! opened for a single batch and torn down once the ordered join has resolved
//! every handle, on success and failure alike.

use crate::error::TaskError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

/// Worker count of the bounded pool. Deliberately small: the pooled strategy
/// exists to show the throughput ceiling a fixed pool puts on blocking I/O.
pub const POOL_WORKERS: usize = 4;

/// Boxed future a unit of work resolves to.
pub type UnitFuture = Pin<Box<dyn Future<Output = Result<String, TaskError>> + Send>>;

/// A unit of work. Invoked with the identity of the worker executing it so
/// the produced result can name who ran it.
pub type UnitOfWork = Box<dyn FnOnce(String) -> UnitFuture + Send>;

/// Which scheduling policy a batch runs under. Chosen per invocation,
/// stateless across invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStrategy {
    /// One spawned tokio task per unit of work, no queuing. Every unit starts
    /// executing immediately.
    Spawned,
    /// A fixed pool of [`POOL_WORKERS`] workers draining a shared queue.
    /// Units beyond the worker count wait for a worker to free up.
    Pooled,
}

impl ExecStrategy {
    /// Short name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ExecStrategy::Spawned => "spawned",
            ExecStrategy::Pooled => "pooled",
        }
    }

    /// Name of the duration histogram recorded for batches run under this
    /// strategy. The two strategies report independently.
    #[must_use]
    pub fn metric_name(self) -> &'static str {
        match self {
            ExecStrategy::Spawned => "spawned_batch_duration_seconds",
            ExecStrategy::Pooled => "pooled_batch_duration_seconds",
        }
    }

    /// Hand every unit to this strategy's execution contexts, returning one
    /// handle per unit in submission order.
    pub(crate) fn dispatch(self, units: Vec<UnitOfWork>) -> DispatchedBatch {
        match self {
            ExecStrategy::Spawned => {
                let handles = units
                    .into_iter()
                    .enumerate()
                    .map(|(index, unit)| {
                        TaskHandle::Spawned(tokio::spawn(unit(format!("spawned-{index}"))))
                    })
                    .collect();
                DispatchedBatch {
                    handles,
                    pool: None,
                }
            }
            ExecStrategy::Pooled => {
                let pool = WorkerPool::open(POOL_WORKERS);
                let handles = units.into_iter().map(|unit| pool.submit(unit)).collect();
                DispatchedBatch {
                    handles,
                    pool: Some(pool),
                }
            }
        }
    }
}

/// Handle to one dispatched unit of work.
enum TaskHandle {
    Spawned(JoinHandle<Result<String, TaskError>>),
    Pooled(oneshot::Receiver<Result<String, TaskError>>),
}

impl TaskHandle {
    /// `None` means the execution context disappeared without answering:
    /// the spawned task panicked, or the pool worker died.
    async fn resolve(self) -> Option<Result<String, TaskError>> {
        match self {
            TaskHandle::Spawned(handle) => handle.await.ok(),
            TaskHandle::Pooled(done) => done.await.ok(),
        }
    }
}

/// A dispatched batch: ordered handles, plus the pool when one was opened so
/// it can be closed after the join.
pub(crate) struct DispatchedBatch {
    handles: Vec<TaskHandle>,
    pool: Option<WorkerPool>,
}

impl DispatchedBatch {
    /// Await every handle strictly in submission order, then release the
    /// execution contexts.
    ///
    /// All handles are resolved even once a failure has shown up, so every
    /// context has finished and the pool can always be drained and closed
    /// before the caller sees the outcome.
    pub(crate) async fn join_ordered(self) -> Vec<Option<Result<String, TaskError>>> {
        let mut outcomes = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            outcomes.push(handle.resolve().await);
        }
        if let Some(pool) = self.pool {
            pool.close().await;
        }
        outcomes
    }
}

type QueuedUnit = (UnitOfWork, oneshot::Sender<Result<String, TaskError>>);

/// Fixed-size worker pool scoped to a single batch.
///
/// Workers contend on a shared queue receiver; whichever worker is idle picks
/// up the next queued unit and answers through the unit's oneshot channel.
struct WorkerPool {
    queue: mpsc::UnboundedSender<QueuedUnit>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    fn open(worker_count: usize) -> Self {
        let (queue, rx) = mpsc::unbounded_channel::<QueuedUnit>();
        let rx = Arc::new(Mutex::new(rx));
        let workers = (0..worker_count)
            .map(|slot| {
                let rx = Arc::clone(&rx);
                tokio::spawn(async move {
                    let label = format!("pool-worker-{slot}");
                    loop {
                        // The queue lock is only held while waiting for the
                        // next unit, never across its execution.
                        let next = rx.lock().await.recv().await;
                        let Some((unit, done)) = next else {
                            break;
                        };
                        // A dropped receiver just means nobody is waiting for
                        // this result anymore.
                        let _ = done.send(unit(label.clone()).await);
                    }
                    debug!(worker = %label, "pool worker exiting");
                })
            })
            .collect();
        Self { queue, workers }
    }

    fn submit(&self, unit: UnitOfWork) -> TaskHandle {
        let (done, handle) = oneshot::channel();
        // A send failure means every worker is already gone; the dropped
        // sender then surfaces as a lost context at join time.
        let _ = self.queue.send((unit, done));
        TaskHandle::Pooled(handle)
    }

    /// Close the queue and wait for every worker to exit.
    async fn close(self) {
        drop(self.queue);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategies_report_under_distinct_metric_names() {
        assert_ne!(
            ExecStrategy::Spawned.metric_name(),
            ExecStrategy::Pooled.metric_name()
        );
    }

    #[tokio::test]
    async fn pool_close_waits_for_idle_workers() {
        let pool = WorkerPool::open(POOL_WORKERS);
        // No units submitted; close must still return promptly.
        pool.close().await;
    }

    #[tokio::test]
    async fn pool_answers_through_the_submission_handle() {
        let pool = WorkerPool::open(1);
        let handle = pool.submit(Box::new(|worker: String| -> UnitFuture {
            Box::pin(async move { Ok(format!("ran on {worker}")) })
        }));
        let result = handle.resolve().await.unwrap().unwrap();
        assert_eq!("ran on pool-worker-0", result);
        pool.close().await;
    }
}
