//! Batch runner properties, exercised with deterministic in-process doubles
//! standing in for the delayed endpoint.

use async_trait::async_trait;
use batch_runner::runner::CALLS_PER_TASK;
use batch_runner::strategy::POOL_WORKERS;
use batch_runner::{
    BatchError, BatchObserver, BatchRunner, DelayCall, ExecStrategy, TaskError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;
use tokio::time::timeout;

/// Immediate deterministic stand-in for the delayed endpoint. Counts calls
/// and optionally fails every one of them.
#[derive(Clone, Default)]
struct StubDelay {
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl StubDelay {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DelayCall for StubDelay {
    async fn fetch_delayed(&self) -> Result<String, TaskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TaskError::Status(503));
        }
        Ok("delayed".to_string())
    }
}

/// Tracks how many calls are in flight at once.
#[derive(Clone, Default)]
struct ConcurrencyProbe {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl DelayCall for ConcurrencyProbe {
    async fn fetch_delayed(&self) -> Result<String, TaskError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok("delayed".to_string())
    }
}

/// Every call rendezvouses on a shared barrier, so a batch only completes if
/// all its units run concurrently.
#[derive(Clone)]
struct RendezvousDelay {
    barrier: Arc<Barrier>,
}

#[async_trait]
impl DelayCall for RendezvousDelay {
    async fn fetch_delayed(&self) -> Result<String, TaskError> {
        self.barrier.wait().await;
        Ok("delayed".to_string())
    }
}

#[derive(Default)]
struct RecordingObserver {
    batches: Mutex<Vec<(ExecStrategy, Duration)>>,
}

impl BatchObserver for RecordingObserver {
    fn record_batch(&self, strategy: ExecStrategy, elapsed: Duration) {
        self.batches.lock().unwrap().push((strategy, elapsed));
    }
}

fn runner_with<C: DelayCall>(client: C) -> (BatchRunner<C>, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    (BatchRunner::new(client, observer.clone()), observer)
}

#[tokio::test]
async fn returns_one_result_per_task_for_both_strategies() {
    for strategy in [ExecStrategy::Spawned, ExecStrategy::Pooled] {
        let (runner, _) = runner_with(StubDelay::default());
        let results = runner.run_batch(10, strategy).await.unwrap();
        assert_eq!(10, results.len());
    }
}

#[tokio::test]
async fn result_positions_match_submission_indexes() {
    for strategy in [ExecStrategy::Spawned, ExecStrategy::Pooled] {
        let (runner, _) = runner_with(StubDelay::default());
        let results = runner.run_batch(10, strategy).await.unwrap();
        for (index, result) in results.iter().enumerate() {
            assert!(
                result.starts_with(&format!("task {index} completed on ")),
                "position {index} held: {result}"
            );
        }
    }
}

#[tokio::test]
async fn results_name_the_executing_worker() {
    let (runner, _) = runner_with(StubDelay::default());
    let results = runner.run_batch(3, ExecStrategy::Spawned).await.unwrap();
    for (index, result) in results.iter().enumerate() {
        assert!(result.ends_with(&format!("spawned-{index}")));
    }

    let (runner, _) = runner_with(StubDelay::default());
    let results = runner.run_batch(10, ExecStrategy::Pooled).await.unwrap();
    for result in &results {
        assert!(result.contains("pool-worker-"), "unexpected worker: {result}");
    }
}

#[tokio::test]
async fn empty_batch_resolves_without_dispatching() {
    for strategy in [ExecStrategy::Spawned, ExecStrategy::Pooled] {
        let client = StubDelay::default();
        let (runner, observer) = runner_with(client.clone());
        let results = runner.run_batch(0, strategy).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(0, client.calls(), "an empty batch must not perform I/O");
        // The duration observation still covers the (empty) invocation.
        assert_eq!(1, observer.batches.lock().unwrap().len());
    }
}

#[tokio::test]
async fn each_task_performs_exactly_three_sequential_calls() {
    let client = StubDelay::default();
    let (runner, _) = runner_with(client.clone());
    runner.run_batch(7, ExecStrategy::Spawned).await.unwrap();
    assert_eq!(7 * CALLS_PER_TASK, client.calls());
}

#[tokio::test]
async fn first_failure_in_join_order_aborts_the_batch() {
    for strategy in [ExecStrategy::Spawned, ExecStrategy::Pooled] {
        let (runner, _) = runner_with(StubDelay::failing());
        match runner.run_batch(10, strategy).await {
            Err(BatchError::Task { index, source }) => {
                // Every task fails here, so the join must pick task 0.
                assert_eq!(0, index);
                assert!(matches!(source, TaskError::Status(503)));
            }
            other => panic!("expected an aborted batch, got {other:?}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn pooled_strategy_never_exceeds_the_worker_count() {
    let probe = ConcurrencyProbe::default();
    let (runner, _) = runner_with(probe.clone());
    let results = runner.run_batch(10, ExecStrategy::Pooled).await.unwrap();
    assert_eq!(10, results.len());
    assert!(
        probe.peak.load(Ordering::SeqCst) <= POOL_WORKERS,
        "peak concurrency {} exceeded the pool size",
        probe.peak.load(Ordering::SeqCst)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn spawned_strategy_starts_every_task_before_any_completes() {
    // Each of the 10 units must reach the barrier before any call returns;
    // a strategy that serialized units would deadlock and trip the timeout.
    let client = RendezvousDelay {
        barrier: Arc::new(Barrier::new(10)),
    };
    let (runner, _) = runner_with(client);
    let results = timeout(
        Duration::from_secs(5),
        runner.run_batch(10, ExecStrategy::Spawned),
    )
    .await
    .expect("all spawned units should run concurrently")
    .unwrap();
    assert_eq!(10, results.len());
}

#[tokio::test]
async fn repeated_batches_are_identical_up_to_worker_identity() {
    let (runner, _) = runner_with(StubDelay::default());
    let first = runner.run_batch(6, ExecStrategy::Pooled).await.unwrap();
    let second = runner.run_batch(6, ExecStrategy::Pooled).await.unwrap();
    let prefix = |result: &str| result.split(" on ").next().unwrap().to_string();
    assert_eq!(
        first.iter().map(|r| prefix(r)).collect::<Vec<_>>(),
        second.iter().map(|r| prefix(r)).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn each_batch_emits_one_named_duration_observation() {
    let (runner, observer) = runner_with(StubDelay::default());
    runner.run_batch(2, ExecStrategy::Spawned).await.unwrap();
    runner.run_batch(2, ExecStrategy::Pooled).await.unwrap();

    let batches = observer.batches.lock().unwrap();
    assert_eq!(2, batches.len());
    assert_eq!(ExecStrategy::Spawned, batches[0].0);
    assert_eq!(ExecStrategy::Pooled, batches[1].0);
}

#[tokio::test]
async fn failed_batches_still_report_their_duration() {
    let (runner, observer) = runner_with(StubDelay::failing());
    let _ = runner.run_batch(4, ExecStrategy::Spawned).await;
    assert_eq!(1, observer.batches.lock().unwrap().len());
}
