//! Local stand-in for the slow endpoint the benchmark hits.
//!
//! `GET /delay/{seconds}` answers after the requested delay, clamped the way
//! httpbin's `/delay` endpoint clamps it, so batches can be driven entirely
//! on localhost.

use anyhow::Context;
use axum::extract::Path;
use axum::routing::get;
use axum::{Json, Router};
use mimalloc::MiMalloc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const BIND_ADDR: &str = "127.0.0.1:8081";

/// Longest honored delay; larger values are clamped, matching httpbin.
const MAX_DELAY_SECS: u64 = 10;

fn main() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let _guard = rt.enter();
    rt.block_on(run_server()).unwrap();
}

async fn run_server() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let listener = tokio::net::TcpListener::bind(BIND_ADDR)
        .await
        .with_context(|| format!("failed to bind {BIND_ADDR}"))?;
    info!(addr = BIND_ADDR, "delay server listening");
    axum::serve(listener, router())
        .await
        .context("server terminated")?;
    Ok(())
}

fn router() -> Router {
    Router::new().route("/delay/:seconds", get(delayed))
}

#[derive(Debug, serde::Serialize)]
struct DelayedResponse {
    delayed_for_secs: u64,
}

async fn delayed(Path(seconds): Path<u64>) -> Json<DelayedResponse> {
    let seconds = clamp_delay(seconds);
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    Json(DelayedResponse {
        delayed_for_secs: seconds,
    })
}

fn clamp_delay(seconds: u64) -> u64 {
    seconds.min(MAX_DELAY_SECS)
}
