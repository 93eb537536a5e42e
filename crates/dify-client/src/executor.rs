//! Asynchronous request execution.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::compose::{WireRequest, compose};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::option::RequestOption;
use crate::pool::{ConnectionLimiter, ConnectionPermit};
use crate::request::Request;
use crate::response::Response;

/// Non-blocking executor.
///
/// Cheap to clone; clones share the connection pool and limiter.
#[derive(Debug, Clone)]
pub struct AsyncExecutor {
    inner: Arc<ExecutorInner>,
}

#[derive(Debug)]
struct ExecutorInner {
    config: Arc<Config>,
    http: reqwest::Client,
    limiter: ConnectionLimiter,
}

impl AsyncExecutor {
    /// Create an executor with its own connection pool.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(config.max_keepalive_connections())
            .build()?;
        let limiter = ConnectionLimiter::new(config.max_connections());

        Ok(Self {
            inner: Arc::new(ExecutorInner {
                config,
                http,
                limiter,
            }),
        })
    }

    /// The shared configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The connection limiter.
    pub fn limiter(&self) -> &ConnectionLimiter {
        &self.inner.limiter
    }

    /// Send `request` and buffer the whole response into an envelope.
    ///
    /// API failures come back as an unsuccessful [`Response`]; only
    /// configuration and transport problems are `Err`.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &Request,
        option: &RequestOption,
    ) -> Result<Response<T>> {
        let wire = compose(&self.inner.config, request, option)?;
        let _permit = self.inner.limiter.acquire().await?;

        let started = Instant::now();
        let response = self.send(wire, self.inner.config.timeout()).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        tracing::debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = body.len(),
            "Response received"
        );

        Ok(Response::from_parts(status, headers, body))
    }

    /// Send `request` and expose the body as a chunk stream.
    ///
    /// The connection slot is held until the stream ends or is dropped.
    pub async fn execute_stream(
        &self,
        request: &Request,
        option: &RequestOption,
    ) -> Result<AsyncByteStream> {
        let wire = compose(&self.inner.config, request, option)?;
        let permit = self.inner.limiter.acquire().await?;

        let response = self.send(wire, self.inner.config.stream_timeout()).await?;
        tracing::debug!(status = response.status().as_u16(), "Stream opened");

        Ok(AsyncByteStream {
            status: response.status(),
            headers: response.headers().clone(),
            chunks: Box::pin(response.bytes_stream()),
            permit: Some(permit),
        })
    }

    /// Send with connection-level retries.
    async fn send(&self, wire: WireRequest, timeout: Duration) -> Result<reqwest::Response> {
        let max_retries = self.inner.config.max_retry_count();
        tracing::debug!(method = %wire.method(), url = %wire.url(), "Sending request");

        let mut attempt = 0;
        loop {
            let result = wire
                .clone()
                .into_async(&self.inner.http)
                .timeout(timeout)
                .send()
                .await
                .map_err(Error::from);

            match result {
                Err(e) if e.is_connect() && attempt < max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        url = %wire.url(),
                        attempt,
                        max_retries,
                        error = %e,
                        "Connection failed, retrying"
                    );
                }
                other => return other,
            }
        }
    }
}

type ChunkStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Forward-only stream of response body chunks.
///
/// Chunks arrive in wire order and are passed through uninterpreted. Once
/// the stream has ended it keeps yielding `None`.
pub struct AsyncByteStream {
    status: StatusCode,
    headers: HeaderMap,
    chunks: ChunkStream,
    permit: Option<ConnectionPermit>,
}

impl AsyncByteStream {
    /// HTTP status of the streamed response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Whether the server answered with a 2xx status.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Drain the remaining chunks into one buffer.
    pub async fn collect_bytes(mut self) -> Result<Bytes> {
        use futures::StreamExt;

        let mut buf = bytes::BytesMut::new();
        while let Some(chunk) = self.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl Stream for AsyncByteStream {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.permit.is_none() {
            return Poll::Ready(None);
        }

        match this.chunks.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(Some(Err(e))) => {
                this.permit = None;
                Poll::Ready(Some(Err(Error::Http(e))))
            }
            Poll::Ready(None) => {
                this.permit = None;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for AsyncByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncByteStream")
            .field("status", &self.status)
            .field("finished", &self.permit.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_shares_config() {
        let config = Arc::new(
            Config::builder()
                .domain("http://localhost:5001/v1")
                .max_connections(3)
                .build()
                .unwrap(),
        );
        let executor = AsyncExecutor::new(config.clone()).unwrap();
        let clone = executor.clone();

        assert_eq!(clone.config().domain(), config.domain());
        assert_eq!(executor.limiter().max(), 3);
        assert_eq!(clone.limiter().available(), 3);
    }

    #[tokio::test]
    async fn test_config_error_before_io() {
        let config = Arc::new(Config::builder().domain("http://127.0.0.1:9").build().unwrap());
        let executor = AsyncExecutor::new(config).unwrap();

        let request = Request::get("/datasets/:dataset_id").build();
        let err = executor
            .execute::<serde_json::Value>(&request, &RequestOption::default())
            .await
            .unwrap_err();
        assert!(err.is_config());
        assert_eq!(executor.limiter().available(), executor.limiter().max());
    }
}
