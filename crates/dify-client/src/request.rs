//! Request descriptors.
//!
//! A [`Request`] describes one HTTP call before anything is sent: method,
//! URI template, path and query parameters, and a JSON or multipart body.
//! Endpoint models build one through [`RequestBuilder`]; the executors treat
//! it as read-only.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// HTTP method of a request descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Upper-case method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One file of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl FilePart {
    /// Create a part from in-memory bytes.
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            content_type: None,
            data: data.into(),
        }
    }

    /// Create a part without a file name; the composer falls back to a
    /// placeholder name.
    pub fn unnamed(data: impl Into<Bytes>) -> Self {
        Self {
            file_name: None,
            content_type: None,
            data: data.into(),
        }
    }

    /// Drain a reader into a part.
    pub fn from_reader(file_name: impl Into<String>, mut reader: impl Read) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(Self::new(file_name, buf))
    }

    /// Set the part's content type (defaults to `application/octet-stream`).
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// File name, if one was given.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Content type, if one was given.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// File content.
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// Description of one HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub(crate) method: HttpMethod,
    pub(crate) uri: String,
    pub(crate) paths: BTreeMap<String, String>,
    pub(crate) queries: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<Map<String, Value>>,
    pub(crate) files: BTreeMap<String, FilePart>,
    pub(crate) raw_body: Option<Bytes>,
}

impl Request {
    /// Start building a request.
    pub fn builder(method: HttpMethod, uri: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, uri)
    }

    /// Shorthand for a `GET` builder.
    pub fn get(uri: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(HttpMethod::Get, uri)
    }

    /// Shorthand for a `POST` builder.
    pub fn post(uri: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(HttpMethod::Post, uri)
    }

    /// Shorthand for a `PUT` builder.
    pub fn put(uri: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(HttpMethod::Put, uri)
    }

    /// Shorthand for a `PATCH` builder.
    pub fn patch(uri: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(HttpMethod::Patch, uri)
    }

    /// Shorthand for a `DELETE` builder.
    pub fn delete(uri: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(HttpMethod::Delete, uri)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn paths(&self) -> &BTreeMap<String, String> {
        &self.paths
    }

    pub fn queries(&self) -> &[(String, String)] {
        &self.queries
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&Map<String, Value>> {
        self.body.as_ref()
    }

    pub fn files(&self) -> &BTreeMap<String, FilePart> {
        &self.files
    }

    pub fn raw_body(&self) -> Option<&Bytes> {
        self.raw_body.as_ref()
    }
}

/// Builder for [`Request`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    fn new(method: HttpMethod, uri: impl Into<String>) -> Self {
        Self {
            request: Request {
                method,
                uri: uri.into(),
                paths: BTreeMap::new(),
                queries: Vec::new(),
                headers: Vec::new(),
                body: None,
                files: BTreeMap::new(),
                raw_body: None,
            },
        }
    }

    /// Bind a value to the `:name` placeholder.
    pub fn path(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.paths.insert(name.into(), value.into());
        self
    }

    /// Append a query pair. Repeating a key keeps every value.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.request.queries.push((key.into(), value.to_string()));
        self
    }

    /// Append a query pair when the value is present.
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Add a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.push((name.into(), value.into()));
        self
    }

    /// Set one body field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request
            .body
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set a body field when the value is present.
    pub fn field_opt(self, key: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.field(key, value),
            None => self,
        }
    }

    /// Merge a serializable struct into the body. It must serialize to a JSON
    /// object.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        match serde_json::to_value(body)? {
            Value::Object(map) => {
                self.request
                    .body
                    .get_or_insert_with(Map::new)
                    .extend(map);
                Ok(self)
            }
            other => Err(Error::Config(format!(
                "request body must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Attach a file under the given multipart field name.
    pub fn file(mut self, field: impl Into<String>, part: FilePart) -> Self {
        self.request.files.insert(field.into(), part);
        self
    }

    /// Send these bytes verbatim, ignoring `body` and `files`.
    pub fn raw_body(mut self, body: impl Into<Bytes>) -> Self {
        self.request.raw_body = Some(body.into());
        self
    }

    /// Finish the descriptor.
    pub fn build(self) -> Request {
        self.request
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
