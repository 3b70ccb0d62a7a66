//! Core of the exec-cmp benchmark: dispatches batches of simulated I/O-bound
//! tasks through one of two execution strategies and measures how long the
//! whole batch takes.
//!
//! The interesting part lives in [`runner::BatchRunner`] and [`strategy`]:
//! every task performs a handful of sequential calls against a slow HTTP
//! endpoint, and the two strategies only differ in how those tasks get
//! scheduled - one spawned tokio task per unit of work, or a fixed pool of
//! four workers draining a shared queue.

pub mod client;
pub mod drain;
pub mod error;
pub mod observe;
pub mod runner;
pub mod strategy;

pub use client::{DelayCall, HttpDelayClient};
pub use error::{BatchError, TaskError};
pub use observe::{BatchObserver, MetricsObserver};
pub use runner::BatchRunner;
pub use strategy::ExecStrategy;

use bytes::Bytes;
use http_body_util::Full;

#[inline]
pub fn empty_body() -> Full<Bytes> {
    Full::new(Bytes::new())
}
