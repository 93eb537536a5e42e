//! Client-wide configuration.
//!
//! A [`Config`] is built once per client and shared read-only (behind an
//! `Arc`) by every call the client makes.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// Default API base URL.
pub const DEFAULT_DOMAIN: &str = "https://api.dify.ai/v1";

/// Default timeout for buffered requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for establishing a connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for streaming requests.
const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(300);

const DEFAULT_MAX_RETRY_COUNT: u32 = 2;
const DEFAULT_MAX_CONNECTIONS: usize = 100;
const DEFAULT_MAX_KEEPALIVE_CONNECTIONS: usize = 20;

/// Immutable client settings.
#[derive(Debug, Clone)]
pub struct Config {
    domain: Url,
    max_retry_count: u32,
    max_connections: usize,
    max_keepalive_connections: usize,
    timeout: Duration,
    connect_timeout: Duration,
    stream_timeout: Duration,
    user_agent: String,
}

impl Config {
    /// Create a new config builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Build a config from `DIFY_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = ConfigBuilder::new();

        if let Some(domain) = lookup("DIFY_API_BASE") {
            builder = builder.domain(domain);
        }
        if let Some(count) = parse_var(&lookup, "DIFY_MAX_RETRY_COUNT")? {
            builder = builder.max_retry_count(count);
        }
        if let Some(max) = parse_var(&lookup, "DIFY_MAX_CONNECTIONS")? {
            builder = builder.max_connections(max);
        }
        if let Some(max) = parse_var(&lookup, "DIFY_MAX_KEEPALIVE_CONNECTIONS")? {
            builder = builder.max_keepalive_connections(max);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "DIFY_TIMEOUT_SECS")? {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Base URL every request URI is resolved against. Always ends with `/`.
    pub fn domain(&self) -> &Url {
        &self.domain
    }

    /// Connection-level retry budget.
    pub fn max_retry_count(&self) -> u32 {
        self.max_retry_count
    }

    /// Upper bound on concurrent in-flight connections per executor.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Upper bound on idle keepalive connections per host.
    pub fn max_keepalive_connections(&self) -> usize {
        self.max_keepalive_connections
    }

    /// Timeout for buffered requests.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Timeout for establishing a connection.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Timeout for streaming requests.
    ///
    /// This is a deadline for the whole exchange, body included: a stream
    /// still open when it expires fails with a timeout error on its next
    /// chunk.
    pub fn stream_timeout(&self) -> Duration {
        self.stream_timeout
    }

    /// User agent sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

fn default_user_agent() -> String {
    format!("dify-client/{}", env!("CARGO_PKG_VERSION"))
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            Error::Config(format!(
                "{} must be a non-negative integer, got `{}`",
                key, raw
            ))
        }),
        None => Ok(None),
    }
}

/// Builder for [`Config`].
///
/// Also deserializable, so hosts can embed a `[dify]` table in their own
/// configuration files and call [`ConfigBuilder::build`] on it. Durations are
/// given in whole seconds there.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigBuilder {
    domain: String,
    max_retry_count: u32,
    max_connections: usize,
    max_keepalive_connections: usize,
    #[serde(rename = "timeout_secs", with = "duration_secs")]
    timeout: Duration,
    #[serde(rename = "connect_timeout_secs", with = "duration_secs")]
    connect_timeout: Duration,
    #[serde(rename = "stream_timeout_secs", with = "duration_secs")]
    stream_timeout: Duration,
    user_agent: Option<String>,
}

impl ConfigBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            max_retry_count: DEFAULT_MAX_RETRY_COUNT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_keepalive_connections: DEFAULT_MAX_KEEPALIVE_CONNECTIONS,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the API base URL.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Set the connection-level retry budget.
    pub fn max_retry_count(mut self, count: u32) -> Self {
        self.max_retry_count = count;
        self
    }

    /// Set the maximum number of concurrent connections.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the maximum number of idle keepalive connections.
    pub fn max_keepalive_connections(mut self, max: usize) -> Self {
        self.max_keepalive_connections = max;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the streaming request timeout.
    ///
    /// It bounds the total lifetime of a stream, not the gap between chunks,
    /// so it must exceed the longest stream the caller expects to read.
    pub fn stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Validate and build the config.
    pub fn build(self) -> Result<Config> {
        let mut domain = Url::parse(self.domain.trim())?;
        if domain.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "domain `{}` cannot be used as a base URL",
                self.domain
            )));
        }
        if domain.query().is_some() || domain.fragment().is_some() {
            return Err(Error::Config(format!(
                "domain `{}` must not carry a query or fragment",
                self.domain
            )));
        }
        if !domain.path().ends_with('/') {
            domain.set_path(&format!("{}/", domain.path()));
        }

        if self.max_connections == 0 {
            return Err(Error::Config("max_connections must be at least 1".to_string()));
        }

        Ok(Config {
            domain,
            max_retry_count: self.max_retry_count,
            max_connections: self.max_connections,
            max_keepalive_connections: self.max_keepalive_connections,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            stream_timeout: self.stream_timeout,
            user_agent: self.user_agent.unwrap_or_else(default_user_agent),
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
