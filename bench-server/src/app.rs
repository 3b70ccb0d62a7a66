//! Trigger surface: one endpoint per execution strategy, both running the
//! same batch through the shared runner.

use crate::config;
use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use batch_runner::{BatchError, BatchRunner, ExecStrategy, HttpDelayClient, MetricsObserver};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::error::Error as _;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type Runner = Arc<BatchRunner<HttpDelayClient>>;

pub async fn run() -> anyhow::Result<()> {
    init_tracing();
    init_metrics();
    let client = HttpDelayClient::new(config::delay_url());
    let runner = Arc::new(BatchRunner::new(client, Arc::new(MetricsObserver)));
    let listener = tokio::net::TcpListener::bind(config::BIND_ADDR)
        .await
        .with_context(|| format!("failed to bind {}", config::BIND_ADDR))?;
    info!(
        addr = config::BIND_ADDR,
        delay_url = %config::delay_url(),
        "bench server listening"
    );
    axum::serve(listener, router(runner))
        .await
        .context("server terminated")?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Install the Prometheus scrape endpoint. The benchmark stays usable when
/// the exporter cannot bind; batch timings just won't be scrapeable.
fn init_metrics() {
    let addr: SocketAddr = config::METRICS_ADDR.parse().unwrap();
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => batch_runner::observe::describe_batch_metrics(),
        Err(err) => warn!(error = %err, "prometheus exporter unavailable"),
    }
}

fn router(runner: Runner) -> Router {
    Router::new()
        .route("/bench/spawned", post(bench_spawned))
        .route("/bench/pooled", post(bench_pooled))
        .with_state(runner)
}

#[derive(Debug, serde::Deserialize)]
struct BenchParams {
    #[serde(rename = "numberOfTasks", default = "default_tasks")]
    number_of_tasks: usize,
}

fn default_tasks() -> usize {
    config::DEFAULT_TASKS
}

async fn bench_spawned(
    State(runner): State<Runner>,
    Query(params): Query<BenchParams>,
) -> Result<Json<Vec<String>>, BatchFailure> {
    let results = runner
        .run_batch(params.number_of_tasks, ExecStrategy::Spawned)
        .await?;
    Ok(Json(results))
}

async fn bench_pooled(
    State(runner): State<Runner>,
    Query(params): Query<BenchParams>,
) -> Result<Json<Vec<String>>, BatchFailure> {
    let results = runner
        .run_batch(params.number_of_tasks, ExecStrategy::Pooled)
        .await?;
    Ok(Json(results))
}

/// Maps an aborted batch to a plain 500 carrying the wrapped cause chain.
struct BatchFailure(BatchError);

impl From<BatchError> for BatchFailure {
    fn from(err: BatchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BatchFailure {
    fn into_response(self) -> Response {
        let BatchFailure(err) = self;
        let message = match err.source() {
            Some(cause) => format!("{err}: {cause}"),
            None => err.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}
