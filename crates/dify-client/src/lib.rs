//! HTTP client SDK for Dify-style LLM application APIs.
//!
//! The heart of the crate is the request execution engine: a [`Request`]
//! descriptor is composed into a wire request by [`compose()`], then sent by
//! either the [`AsyncExecutor`] or the blocking [`SyncExecutor`], buffered
//! into a [`Response`] envelope or exposed as a stream of raw chunks.
//!
//! API failures never surface as `Err`: every buffered call yields a
//! [`Response`] whose `success()`, `code()` and `msg()` tell what happened.
//! `Err` is reserved for configuration mistakes and transport failures.
//!
//! # Example
//!
//! ```no_run
//! use dify_client::{DifyClient, Result};
//! use dify_client::models::chat::SendChatMessage;
//!
//! # async fn example() -> Result<()> {
//! let client = DifyClient::builder()
//!     .domain("http://localhost:5001/v1")
//!     .api_key("app-secret")
//!     .build()?;
//!
//! let response = client.send(&SendChatMessage::new("Hello!", "user-1")).await?;
//! match response.data() {
//!     Some(message) => println!("{}", message.answer),
//!     None => eprintln!("{:?}: {:?}", response.code(), response.msg()),
//! }
//!
//! // Stream the same call as raw server-sent event chunks
//! use futures::StreamExt;
//! let mut stream = client
//!     .send_stream(&SendChatMessage::new("Tell me a story", "user-1").streaming())
//!     .await?;
//! while let Some(chunk) = stream.next().await {
//!     print!("{}", String::from_utf8_lossy(&chunk?));
//! }
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod client;
pub mod compose;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod executor;
pub mod models;
pub mod option;
pub mod pool;
pub mod request;
pub mod response;

pub use blocking::{ByteStream, SyncExecutor};
pub use client::{BlockingDifyClient, ClientBuilder, DifyClient};
pub use compose::{WireRequest, compose};
pub use config::{Config, ConfigBuilder};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use executor::{AsyncByteStream, AsyncExecutor};
pub use option::{RequestOption, RequestOptionBuilder};
pub use pool::{ConnectionLimiter, ConnectionPermit};
pub use request::{FilePart, HttpMethod, Request, RequestBuilder};
pub use response::{RawResponse, Response};
