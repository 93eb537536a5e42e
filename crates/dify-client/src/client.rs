//! Client facades.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::blocking::{ByteStream, SyncExecutor};
use crate::config::{Config, ConfigBuilder};
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::executor::{AsyncByteStream, AsyncExecutor};
use crate::option::RequestOption;
use crate::request::Request;
use crate::response::Response;

/// Dify API client.
///
/// # Example
///
/// ```no_run
/// use dify_client::DifyClient;
/// use dify_client::models::knowledge_base::ListDatasets;
///
/// # async fn example() -> dify_client::Result<()> {
/// let client = DifyClient::builder()
///     .domain("http://localhost:5001/v1")
///     .api_key("dataset-secret")
///     .build()?;
///
/// let datasets = client.send(&ListDatasets::new().page(1)).await?;
/// if let Some(list) = datasets.data() {
///     println!("{} datasets", list.total);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DifyClient {
    executor: AsyncExecutor,
    option: RequestOption,
}

impl DifyClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client for the default domain with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder().api_key(api_key).build()
    }

    /// The underlying executor.
    pub fn executor(&self) -> &AsyncExecutor {
        &self.executor
    }

    /// The shared configuration.
    pub fn config(&self) -> &Config {
        self.executor.config()
    }

    /// Call an endpoint and buffer the response.
    pub async fn send<E: Endpoint>(&self, endpoint: &E) -> Result<Response<E::Output>> {
        self.executor
            .execute(&endpoint.to_request()?, &self.option)
            .await
    }

    /// Call an endpoint with per-call overrides layered over the client's.
    pub async fn send_with<E: Endpoint>(
        &self,
        endpoint: &E,
        option: &RequestOption,
    ) -> Result<Response<E::Output>> {
        self.executor
            .execute(&endpoint.to_request()?, &option.layered_over(&self.option))
            .await
    }

    /// Call an endpoint and stream the raw body.
    pub async fn send_stream<E: Endpoint>(&self, endpoint: &E) -> Result<AsyncByteStream> {
        self.executor
            .execute_stream(&endpoint.to_request()?, &self.option)
            .await
    }

    /// Execute a hand-built request descriptor.
    pub async fn execute<T: DeserializeOwned>(&self, request: &Request) -> Result<Response<T>> {
        self.executor.execute(request, &self.option).await
    }
}

/// Blocking Dify API client.
///
/// Same surface as [`DifyClient`] without `async`. Must not be built or
/// dropped from inside an async runtime.
#[derive(Debug, Clone)]
pub struct BlockingDifyClient {
    executor: SyncExecutor,
    option: RequestOption,
}

impl BlockingDifyClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The underlying executor.
    pub fn executor(&self) -> &SyncExecutor {
        &self.executor
    }

    /// The shared configuration.
    pub fn config(&self) -> &Config {
        self.executor.config()
    }

    /// Call an endpoint and buffer the response.
    pub fn send<E: Endpoint>(&self, endpoint: &E) -> Result<Response<E::Output>> {
        self.executor.execute(&endpoint.to_request()?, &self.option)
    }

    /// Call an endpoint with per-call overrides layered over the client's.
    pub fn send_with<E: Endpoint>(
        &self,
        endpoint: &E,
        option: &RequestOption,
    ) -> Result<Response<E::Output>> {
        self.executor
            .execute(&endpoint.to_request()?, &option.layered_over(&self.option))
    }

    /// Call an endpoint and stream the raw body.
    pub fn send_stream<E: Endpoint>(&self, endpoint: &E) -> Result<ByteStream> {
        self.executor
            .execute_stream(&endpoint.to_request()?, &self.option)
    }

    /// Execute a hand-built request descriptor.
    pub fn execute<T: DeserializeOwned>(&self, request: &Request) -> Result<Response<T>> {
        self.executor.execute(request, &self.option)
    }
}

/// Builder for [`DifyClient`] and [`BlockingDifyClient`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ConfigBuilder,
    prebuilt: Option<Arc<Config>>,
    option: crate::option::RequestOptionBuilder,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an already built config; config setters are then ignored.
    pub fn config(mut self, config: Arc<Config>) -> Self {
        self.prebuilt = Some(config);
        self
    }

    /// Set the API base URL.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.config = self.config.domain(domain);
        self
    }

    /// Set the API key sent with every call.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.option = self.option.api_key(api_key);
        self
    }

    /// Add a header sent with every call.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.option = self.option.header(name, value);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the streaming request timeout.
    pub fn stream_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.stream_timeout(timeout);
        self
    }

    /// Set the connection-level retry budget.
    pub fn max_retry_count(mut self, count: u32) -> Self {
        self.config = self.config.max_retry_count(count);
        self
    }

    /// Set the maximum number of concurrent connections.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.config = self.config.max_connections(max);
        self
    }

    fn finish(self) -> Result<(Arc<Config>, RequestOption)> {
        let config = match self.prebuilt {
            Some(config) => config,
            None => Arc::new(self.config.build()?),
        };
        Ok((config, self.option.build()))
    }

    /// Build an async client.
    pub fn build(self) -> Result<DifyClient> {
        let (config, option) = self.finish()?;
        Ok(DifyClient {
            executor: AsyncExecutor::new(config)?,
            option,
        })
    }

    /// Build a blocking client.
    pub fn build_blocking(self) -> Result<BlockingDifyClient> {
        let (config, option) = self.finish()?;
        Ok(BlockingDifyClient {
            executor: SyncExecutor::new(config)?,
            option,
        })
    }
}
