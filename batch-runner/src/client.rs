use crate::drain::DrainBodyFuture;
use crate::empty_body;
use crate::error::TaskError;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::CONTENT_LENGTH;
use hyper::Request;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

/// The external I/O collaborator every unit of work leans on: one blocking
/// GET against a slow endpoint, yielding the body text or a failure.
///
/// The runner only depends on this seam, so tests swap in deterministic
/// doubles and the composing binary owns the real client's lifecycle.
#[async_trait]
pub trait DelayCall: Clone + Send + Sync + 'static {
    async fn fetch_delayed(&self) -> Result<String, TaskError>;
}

/// Production [`DelayCall`] implementation over a pooled hyper client.
///
/// Cloning is cheap; all concurrently executing units share the same
/// connection pool underneath.
#[derive(Clone)]
pub struct HttpDelayClient {
    client: Client<HttpConnector, Full<Bytes>>,
    url: String,
}

impl HttpDelayClient {
    /// `url` is the full delayed-response endpoint, e.g.
    /// `http://127.0.0.1:8081/delay/1`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl DelayCall for HttpDelayClient {
    async fn fetch_delayed(&self) -> Result<String, TaskError> {
        let request = Request::get(self.url.as_str())
            .body(empty_body())
            .map_err(|e| TaskError::Request(e.to_string()))?;
        let resp = self
            .client
            .request(request)
            .await
            .map_err(|e| TaskError::Request(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TaskError::Status(status.as_u16()));
        }
        let content_length: usize = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|hv| hv.to_str().ok())
            .and_then(|hv| hv.parse().ok())
            .unwrap_or(1024);
        let bytes = DrainBodyFuture::new_trusted_length(resp.into_body(), content_length).await?;
        Ok(String::from_utf8(bytes)?)
    }
}
