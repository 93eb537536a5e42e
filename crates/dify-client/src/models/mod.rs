//! Endpoint models, grouped by product area.
//!
//! Each request type implements [`Endpoint`](crate::Endpoint) and pairs with
//! a typed response.

pub mod chat;
pub mod completion;
pub mod knowledge_base;
pub mod workflow;

use serde::{Deserialize, Serialize};

/// How the server should deliver generated output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Wait for the full answer.
    #[default]
    Blocking,
    /// Server-sent events, one chunk per event.
    Streaming,
}

/// Generic `{"result": "success"}` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultResponse {
    /// Outcome reported by the server.
    #[serde(default)]
    pub result: String,
}

/// Reference to a file attached to a chat, completion or workflow input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    /// File kind (`image`, `document`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// `remote_url` or `local_file`.
    pub transfer_method: String,
    /// Remote URL, for `remote_url` transfers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Upload id, for `local_file` transfers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_file_id: Option<String>,
}

impl InputFile {
    /// An image referenced by URL.
    pub fn remote_image(url: impl Into<String>) -> Self {
        Self {
            kind: "image".to_string(),
            transfer_method: "remote_url".to_string(),
            url: Some(url.into()),
            upload_file_id: None,
        }
    }

    /// A previously uploaded file.
    pub fn uploaded(kind: impl Into<String>, upload_file_id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            transfer_method: "local_file".to_string(),
            url: None,
            upload_file_id: Some(upload_file_id.into()),
        }
    }
}
