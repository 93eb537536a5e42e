//! Shared fixtures for the executor integration tests.

#![allow(dead_code)]

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dify_client::{Config, FilePart, Request, RequestOption};
use serde_json::json;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use wiremock::MockServer;

/// Message the executors log before each connection retry.
const RETRY_MESSAGE: &str = "Connection failed, retrying";

/// Route client logs to the test output; `RUST_LOG=dify_client=debug` shows
/// every request.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Counts connection retries logged on the current thread while the
/// returned guard is alive.
pub fn count_retries() -> (DefaultGuard, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let guard = tracing_subscriber::registry()
        .with(RetryCounter(count.clone()))
        .set_default();
    (guard, count)
}

/// Read a counter returned by [`count_retries`].
pub fn retries(count: &AtomicUsize) -> usize {
    count.load(Ordering::SeqCst)
}

struct RetryCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for RetryCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = MessageField(None);
        event.record(&mut message);
        if message.0.as_deref() == Some(RETRY_MESSAGE) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct MessageField(Option<String>);

impl Visit for MessageField {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{:?}", value));
        }
    }
}

/// Config pointing at the mock server's `/v1` prefix.
pub fn config_for(server: &MockServer) -> Arc<Config> {
    config_with(server, |b| b)
}

/// Same as [`config_for`] with extra builder tweaks.
pub fn config_with(
    server: &MockServer,
    tweak: impl FnOnce(dify_client::ConfigBuilder) -> dify_client::ConfigBuilder,
) -> Arc<Config> {
    let builder = Config::builder().domain(format!("{}/v1", server.uri()));
    Arc::new(tweak(builder).build().expect("valid test config"))
}

/// Run blocking client code off the async runtime.
pub async fn blocking<F, T>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .expect("blocking task panicked")
}

/// Option used by the shared fixtures.
pub fn option() -> RequestOption {
    RequestOption::builder()
        .api_key("app-test-key")
        .header("X-Request-Source", "tests")
        .build()
}

/// Descriptors exercising every body encoding and templating feature.
pub fn fixtures() -> Vec<Request> {
    vec![
        Request::get("/datasets/:dataset_id")
            .path("dataset_id", "ds-1")
            .query("page", "1")
            .build(),
        Request::get("/datasets")
            .query("tag_ids", "a")
            .query("tag_ids", "b")
            .query("keyword", "rust & tokio")
            .build(),
        Request::post("/chat-messages")
            .field("query", "hello")
            .field("user", "u1")
            .field("inputs", json!({"lang": "en"}))
            .header("X-Trace", "1")
            .build(),
        Request::post("/datasets/:dataset_id/document/create-by-file")
            .path("dataset_id", "ds 2")
            .field("data", json!({"indexing_technique": "economy"}).to_string())
            .file("file", FilePart::new("a.txt", "file body"))
            .build(),
        Request::patch("/datasets/:dataset_id")
            .path("dataset_id", "ds-1")
            .raw_body(r#"{"name":"renamed"}"#)
            .header("Content-Type", "application/json")
            .build(),
        Request::delete("/conversations/:conversation_id")
            .path("conversation_id", "c-1")
            .field("user", "u1")
            .build(),
    ]
}
