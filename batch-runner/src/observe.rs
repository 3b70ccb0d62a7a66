//! Batch duration reporting.
//!
//! The runner records through the [`BatchObserver`] seam so the composing
//! application owns the metrics backend. Production wiring goes through the
//! `metrics` facade; tests plug in a recording double.

use crate::strategy::ExecStrategy;
use metrics::{describe_histogram, histogram, Unit};
use std::time::Duration;

/// Receives exactly one duration observation per batch, named after the
/// strategy the batch ran under.
pub trait BatchObserver: Send + Sync {
    fn record_batch(&self, strategy: ExecStrategy, elapsed: Duration);
}

/// Records batch durations through the global `metrics` recorder, one
/// histogram per strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsObserver;

impl BatchObserver for MetricsObserver {
    fn record_batch(&self, strategy: ExecStrategy, elapsed: Duration) {
        histogram!(strategy.metric_name()).record(elapsed.as_secs_f64());
    }
}

/// Register descriptions for the batch histograms. Call once at startup,
/// after the exporter is installed.
pub fn describe_batch_metrics() {
    describe_histogram!(
        ExecStrategy::Spawned.metric_name(),
        Unit::Seconds,
        "Wall-clock duration of batches run with one spawned task per unit of work"
    );
    describe_histogram!(
        ExecStrategy::Pooled.metric_name(),
        Unit::Seconds,
        "Wall-clock duration of batches run on the bounded worker pool"
    );
}
