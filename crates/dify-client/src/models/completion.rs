//! Completion application endpoints, plus the file and audio helpers shared
//! by every app type.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{InputFile, ResponseMode};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::request::{FilePart, Request};

/// `POST /completion-messages`
#[derive(Debug, Clone, Serialize)]
pub struct CreateCompletion {
    inputs: Map<String, Value>,
    user: String,
    response_mode: ResponseMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    files: Vec<InputFile>,
}

impl CreateCompletion {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            inputs: Map::new(),
            user: user.into(),
            response_mode: ResponseMode::Blocking,
            files: Vec::new(),
        }
    }

    /// Set an app input variable.
    pub fn input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    pub fn file(mut self, file: InputFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn streaming(mut self) -> Self {
        self.response_mode = ResponseMode::Streaming;
        self
    }
}

impl Endpoint for CreateCompletion {
    type Output = CompletionResponse;

    fn to_request(&self) -> Result<Request> {
        Ok(Request::post("/completion-messages").json(self)?.build())
    }
}

/// Answer of a blocking completion call.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    pub message_id: String,
    #[serde(default)]
    pub mode: Option<String>,
    pub answer: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub created_at: i64,
}

/// `POST /text-to-audio`
///
/// The server answers with audio bytes, read them from
/// [`Response::bytes`](crate::Response::bytes).
#[derive(Debug, Clone)]
pub struct TextToAudio {
    user: String,
    text: Option<String>,
    message_id: Option<String>,
}

impl TextToAudio {
    /// Synthesize free text.
    pub fn text(text: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            text: Some(text.into()),
            message_id: None,
        }
    }

    /// Synthesize a previously generated message.
    pub fn message(message_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            text: None,
            message_id: Some(message_id.into()),
        }
    }
}

impl Endpoint for TextToAudio {
    type Output = IgnoredAny;

    fn to_request(&self) -> Result<Request> {
        Ok(Request::post("/text-to-audio")
            .field("user", self.user.clone())
            .field_opt("text", self.text.clone())
            .field_opt("message_id", self.message_id.clone())
            .build())
    }
}

/// `POST /files/upload` (multipart)
#[derive(Debug, Clone)]
pub struct UploadFile {
    user: String,
    file: FilePart,
}

impl UploadFile {
    pub fn new(file: FilePart, user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            file,
        }
    }
}

impl Endpoint for UploadFile {
    type Output = UploadedFile;

    fn to_request(&self) -> Result<Request> {
        if self.file.data().is_empty() {
            return Err(Error::Config("cannot upload an empty file".to_string()));
        }
        Ok(Request::post("/files/upload")
            .file("file", self.file.clone())
            .field("user", self.user.clone())
            .build())
    }
}

/// Metadata of an uploaded file.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_body() {
        let request = CreateCompletion::new("u1")
            .input("query", "summarize")
            .to_request()
            .unwrap();
        let body = request.body().unwrap();
        assert_eq!(body["response_mode"], "blocking");
        assert_eq!(body["inputs"]["query"], "summarize");
        assert!(!body.contains_key("files"));
    }

    #[test]
    fn test_text_to_audio_fields() {
        let request = TextToAudio::message("m-1", "u1").to_request().unwrap();
        let body = request.body().unwrap();
        assert_eq!(body["message_id"], "m-1");
        assert!(!body.contains_key("text"));
    }

    #[test]
    fn test_upload_is_multipart() {
        let request = UploadFile::new(FilePart::new("a.png", vec![1u8, 2, 3]), "u1")
            .to_request()
            .unwrap();
        assert_eq!(request.files().len(), 1);
        assert_eq!(request.body().unwrap()["user"], "u1");
    }

    #[test]
    fn test_upload_rejects_empty_file() {
        let err = UploadFile::new(FilePart::new("a.png", Vec::<u8>::new()), "u1")
            .to_request()
            .unwrap_err();
        assert!(err.is_config());
    }
}
