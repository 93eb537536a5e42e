//! Blocking request execution.
//!
//! Mirrors [`AsyncExecutor`](crate::AsyncExecutor) on top of
//! `reqwest::blocking`. As with any `reqwest::blocking` client, executors must
//! not be created or dropped inside an async runtime; use
//! `tokio::task::spawn_blocking` when mixing the two.

use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
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

/// Largest chunk a [`ByteStream`] yields at once.
const CHUNK_SIZE: usize = 8 * 1024;

/// Blocking executor.
///
/// Cheap to clone; clones share the connection pool and limiter.
#[derive(Debug, Clone)]
pub struct SyncExecutor {
    inner: Arc<ExecutorInner>,
}

#[derive(Debug)]
struct ExecutorInner {
    config: Arc<Config>,
    http: reqwest::blocking::Client,
    limiter: ConnectionLimiter,
}

impl SyncExecutor {
    /// Create an executor with its own connection pool.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
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

    /// Send `request`, block until the whole response is read, and build the
    /// envelope.
    pub fn execute<T: DeserializeOwned>(
        &self,
        request: &Request,
        option: &RequestOption,
    ) -> Result<Response<T>> {
        let wire = compose(&self.inner.config, request, option)?;
        let _permit = self.inner.limiter.acquire_blocking()?;

        let started = Instant::now();
        let response = self.send(wire, self.inner.config.timeout())?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?;

        tracing::debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = body.len(),
            "Response received"
        );

        Ok(Response::from_parts(status, headers, body))
    }

    /// Send `request` and expose the body as a chunk iterator.
    pub fn execute_stream(&self, request: &Request, option: &RequestOption) -> Result<ByteStream> {
        let wire = compose(&self.inner.config, request, option)?;
        let permit = self.inner.limiter.acquire_blocking()?;

        let response = self.send(wire, self.inner.config.stream_timeout())?;
        tracing::debug!(status = response.status().as_u16(), "Stream opened");

        Ok(ByteStream {
            status: response.status(),
            headers: response.headers().clone(),
            body: Some((response, permit)),
        })
    }

    /// Send with connection-level retries.
    fn send(&self, wire: WireRequest, timeout: Duration) -> Result<reqwest::blocking::Response> {
        let max_retries = self.inner.config.max_retry_count();
        tracing::debug!(method = %wire.method(), url = %wire.url(), "Sending request");

        let mut attempt = 0;
        loop {
            let result = wire
                .clone()
                .into_blocking(&self.inner.http)
                .timeout(timeout)
                .send()
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

/// Forward-only iterator over response body chunks.
///
/// Reading may block per chunk. Dropping the iterator before the end closes
/// the connection and frees its slot; after the end it keeps yielding `None`.
pub struct ByteStream {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<(reqwest::blocking::Response, ConnectionPermit)>,
}

impl ByteStream {
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
    pub fn collect_bytes(self) -> Result<Bytes> {
        let mut buf = Vec::new();
        for chunk in self {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    }
}

impl Iterator for ByteStream {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        let (response, _) = self.body.as_mut()?;
        let mut buf = vec![0u8; CHUNK_SIZE];

        let read = loop {
            match response.read(&mut buf) {
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                other => break other,
            }
        };

        match read {
            Ok(0) => {
                self.body = None;
                None
            }
            Ok(n) => {
                buf.truncate(n);
                Some(Ok(Bytes::from(buf)))
            }
            Err(e) => {
                self.body = None;
                Some(Err(Error::Io(e)))
            }
        }
    }
}

impl std::iter::FusedIterator for ByteStream {}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream")
            .field("status", &self.status)
            .field("finished", &self.body.is_none())
            .finish()
    }
}
