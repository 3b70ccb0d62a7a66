//! Task batch runner: builds the units of work, dispatches them through the
//! chosen strategy, joins the handles in submission order and reports the
//! batch duration.

use crate::client::DelayCall;
use crate::error::{BatchError, TaskError};
use crate::observe::BatchObserver;
use crate::strategy::{ExecStrategy, UnitFuture, UnitOfWork};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Sequential delayed calls every unit of work performs. Three back-to-back
/// blocking calls make each task I/O-bound enough for the two strategies to
/// diverge visibly.
pub const CALLS_PER_TASK: usize = 3;

/// Runs batches of independent simulated-I/O tasks under a chosen
/// [`ExecStrategy`].
///
/// Collaborators are injected at construction; the runner holds no global
/// state and is cheap to share behind an `Arc`.
pub struct BatchRunner<C> {
    client: C,
    observer: Arc<dyn BatchObserver>,
}

impl<C: DelayCall> BatchRunner<C> {
    pub fn new(client: C, observer: Arc<dyn BatchObserver>) -> Self {
        Self { client, observer }
    }

    /// Run one batch of `task_count` tasks.
    ///
    /// Returns one result string per task, position `i` holding task `i`'s
    /// result regardless of completion order. The first failed task found in
    /// submission order aborts the whole batch. A zero-sized batch resolves
    /// to an empty list without dispatching anything.
    ///
    /// One duration observation covering dispatch, execution and join is
    /// emitted per invocation, on success and failure alike.
    pub async fn run_batch(
        &self,
        task_count: usize,
        strategy: ExecStrategy,
    ) -> Result<Vec<String>, BatchError> {
        info!(
            strategy = strategy.name(),
            tasks = task_count,
            "starting batch"
        );
        let started = Instant::now();
        let outcome = if task_count == 0 {
            Ok(Vec::new())
        } else {
            let units = (0..task_count)
                .map(|index| self.unit_of_work(index))
                .collect();
            let outcomes = strategy.dispatch(units).join_ordered().await;
            collect_ordered(outcomes)
        };
        let elapsed = started.elapsed();
        self.observer.record_batch(strategy, elapsed);
        match &outcome {
            Ok(results) => info!(
                strategy = strategy.name(),
                tasks = results.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "batch completed"
            ),
            Err(err) => error!(
                strategy = strategy.name(),
                elapsed_ms = elapsed.as_millis() as u64,
                error = %err,
                "batch failed"
            ),
        }
        outcome
    }

    /// Build the closure for task `index`: [`CALLS_PER_TASK`] sequential
    /// delayed calls, then a result string naming the task and the worker
    /// that ran it.
    fn unit_of_work(&self, index: usize) -> UnitOfWork {
        let client = self.client.clone();
        Box::new(move |worker: String| -> UnitFuture {
            Box::pin(async move {
                debug!(task = index, worker = %worker, "task starting");
                for call in 0..CALLS_PER_TASK {
                    let call_started = Instant::now();
                    if let Err(err) = client.fetch_delayed().await {
                        error!(task = index, call, error = %err, "task failed");
                        return Err(err);
                    }
                    debug!(
                        task = index,
                        call,
                        latency_ms = call_started.elapsed().as_millis() as u64,
                        "delayed call finished"
                    );
                }
                debug!(task = index, "task completed");
                Ok(format!("task {index} completed on {worker}"))
            })
        })
    }
}

/// Populate position `i` from handle `i`'s outcome. The first failure in that
/// order wins and already-resolved results are discarded.
fn collect_ordered(
    outcomes: Vec<Option<Result<String, TaskError>>>,
) -> Result<Vec<String>, BatchError> {
    let mut results = Vec::with_capacity(outcomes.len());
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Some(Ok(result)) => results.push(result),
            Some(Err(source)) => return Err(BatchError::Task { index, source }),
            None => return Err(BatchError::ContextLost { index }),
        }
    }
    Ok(results)
}
