//! Benchmark server configuration.

/// Address the trigger endpoints bind to.
pub const BIND_ADDR: &str = "127.0.0.1:8080";

/// Address the Prometheus scrape endpoint binds to.
pub const METRICS_ADDR: &str = "127.0.0.1:9090";

/// Delayed-response endpoint every unit of work calls three times.
/// Defaults to the workspace's delay-server; see [`delay_url`].
pub const DEFAULT_DELAY_URL: &str = "http://127.0.0.1:8081/delay/1";

/// Batch size used when the caller does not pass `numberOfTasks`.
pub const DEFAULT_TASKS: usize = 100;

/// Delay endpoint to benchmark against; the `DELAY_URL` environment variable
/// overrides the default.
pub fn delay_url() -> String {
    std::env::var("DELAY_URL").unwrap_or_else(|_| DEFAULT_DELAY_URL.to_string())
}
