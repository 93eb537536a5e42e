//! Client error types.
//!
//! API failures (non-2xx responses, undecodable bodies) are not errors here:
//! they are reported through the [`Response`](crate::Response) envelope.
//! This type only covers configuration mistakes and transport failures.

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A `:name` placeholder in the URI template has no value.
    #[error("Missing path parameter `{name}` for `{uri}`")]
    MissingPathParam {
        /// Placeholder name without the leading colon.
        name: String,
        /// The URI template being composed.
        uri: String,
    },

    /// The URI template is malformed.
    #[error("Invalid URI template `{uri}`: {reason}")]
    InvalidUri {
        /// The offending template.
        uri: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A header name or value cannot be sent on the wire.
    #[error("Invalid header `{name}`")]
    InvalidHeader {
        /// Header name as given by the caller.
        name: String,
    },

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization of a request body failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport failed (DNS, connect, timeout, reset).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading a file part or a blocking stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection limiter was shut down while a call was waiting.
    #[error("Connection pool closed")]
    PoolClosed,
}

impl Error {
    /// Check if this error was raised before any network I/O happened.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::MissingPathParam { .. }
                | Error::InvalidUri { .. }
                | Error::InvalidHeader { .. }
                | Error::InvalidUrl(_)
                | Error::Config(_)
                | Error::Json(_)
        )
    }

    /// Check if this is a network-level failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Io(_) | Error::PoolClosed)
    }

    /// Check if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout(),
            Error::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    /// Check if the connection could not be established at all.
    pub(crate) fn is_connect(&self) -> bool {
        matches!(self, Error::Http(e) if e.is_connect())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
