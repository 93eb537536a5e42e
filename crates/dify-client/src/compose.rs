//! Turns a request descriptor into a wire-ready request.
//!
//! [`compose`] is the single place where URLs, headers and bodies are
//! produced. Both executors call it, so a descriptor always goes out as the
//! same bytes whichever path sends it.

use bytes::{BufMut, Bytes, BytesMut};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::option::RequestOption;
use crate::request::{FilePart, Request};

/// File name used for parts that were given none.
pub const DEFAULT_FILE_NAME: &str = "upload";

const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

const BOUNDARY_PREFIX: &str = "dify-boundary-";

/// Characters escaped inside a substituted path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// A fully composed HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl WireRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Value of the `Content-Type` header, if set.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub(crate) fn into_async(self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let builder = client.request(self.method, self.url).headers(self.headers);
        if self.body.is_empty() {
            builder
        } else {
            builder.body(self.body)
        }
    }

    pub(crate) fn into_blocking(
        self,
        client: &reqwest::blocking::Client,
    ) -> reqwest::blocking::RequestBuilder {
        let builder = client.request(self.method, self.url).headers(self.headers);
        if self.body.is_empty() {
            builder
        } else {
            builder.body(self.body)
        }
    }
}

/// Compose the wire request for `request` against `config`, applying the
/// per-call `option`.
pub fn compose(config: &Config, request: &Request, option: &RequestOption) -> Result<WireRequest> {
    let path = substitute_path(&request.uri, &request.paths)?;
    let mut url = Url::parse(&format!(
        "{}{}",
        config.domain().as_str(),
        path.trim_start_matches('/')
    ))?;

    if !request.queries.is_empty() {
        url.query_pairs_mut().extend_pairs(
            request
                .queries
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
    }

    let mut headers = HeaderMap::new();

    let body = if let Some(raw) = &request.raw_body {
        raw.clone()
    } else if !request.files.is_empty() {
        let (boundary, body) = encode_multipart(request.body.as_ref(), &request.files)?;
        headers.insert(
            CONTENT_TYPE,
            header_value("Content-Type", &format!("multipart/form-data; boundary={}", boundary))?,
        );
        body
    } else if let Some(body) = &request.body {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Bytes::from(serde_json::to_vec(body)?)
    } else {
        Bytes::new()
    };

    if let Some(api_key) = option.api_key() {
        headers.insert(
            AUTHORIZATION,
            header_value("Authorization", &format!("Bearer {}", api_key))?,
        );
    }

    for (name, value) in request.headers.iter().chain(option.headers()) {
        headers.insert(header_name(name)?, header_value(name, value)?);
    }

    Ok(WireRequest {
        method: request.method.into(),
        url,
        headers,
        body,
    })
}

/// Replace every `:name` segment of `uri` with its percent-encoded value.
fn substitute_path(
    uri: &str,
    paths: &std::collections::BTreeMap<String, String>,
) -> Result<String> {
    if uri.contains("://") || uri.contains('?') || uri.contains('#') {
        return Err(Error::InvalidUri {
            uri: uri.to_string(),
            reason: "expected a relative path without query or fragment".to_string(),
        });
    }

    let mut out = String::with_capacity(uri.len());
    for (i, segment) in uri.split('/').enumerate() {
        if i > 0 {
            out.push('/');
        }
        let Some(name) = segment.strip_prefix(':') else {
            out.push_str(segment);
            continue;
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::InvalidUri {
                uri: uri.to_string(),
                reason: format!("bad placeholder `{}`", segment),
            });
        }
        let value = paths.get(name).ok_or_else(|| Error::MissingPathParam {
            name: name.to_string(),
            uri: uri.to_string(),
        })?;
        // URL parsing folds these into dot segments or an empty one, which
        // would silently address a parent resource.
        if matches!(value.as_str(), "" | "." | "..") {
            return Err(Error::InvalidUri {
                uri: uri.to_string(),
                reason: format!("value `{}` for `{}` is not a path segment", value, name),
            });
        }
        out.extend(utf8_percent_encode(value, PATH_SEGMENT));
    }
    Ok(out)
}

/// Encode form fields and files as `multipart/form-data`.
///
/// Text fields come first in key order, then files in key order. The boundary
/// is the first candidate that does not occur in any part.
fn encode_multipart(
    fields: Option<&Map<String, Value>>,
    files: &std::collections::BTreeMap<String, FilePart>,
) -> Result<(String, Bytes)> {
    let fields: Vec<(&str, String)> = fields
        .into_iter()
        .flatten()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key.as_str(), s.clone())),
            other => Some((key.as_str(), other.to_string())),
        })
        .collect();

    let boundary = (0u32..)
        .map(|n| format!("{}{}", BOUNDARY_PREFIX, n))
        .find(|candidate| {
            let needle = candidate.as_bytes();
            !fields
                .iter()
                .any(|(k, v)| contains(k.as_bytes(), needle) || contains(v.as_bytes(), needle))
                && !files.iter().any(|(k, part)| {
                    contains(k.as_bytes(), needle)
                        || contains(part.data(), needle)
                        || part
                            .file_name()
                            .is_some_and(|f| contains(f.as_bytes(), needle))
                })
        })
        .ok_or_else(|| Error::Config("no usable multipart boundary".to_string()))?;

    let mut buf = BytesMut::new();
    for (name, value) in &fields {
        buf.put_slice(format!("--{}\r\n", boundary).as_bytes());
        buf.put_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                escape_quoted(name)
            )
            .as_bytes(),
        );
        buf.put_slice(value.as_bytes());
        buf.put_slice(b"\r\n");
    }
    for (name, part) in files {
        let file_name = part
            .file_name()
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_FILE_NAME);
        let content_type = part.content_type().unwrap_or(DEFAULT_FILE_CONTENT_TYPE);

        buf.put_slice(format!("--{}\r\n", boundary).as_bytes());
        buf.put_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                escape_quoted(name),
                escape_quoted(file_name)
            )
            .as_bytes(),
        );
        buf.put_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        buf.put_slice(part.data());
        buf.put_slice(b"\r\n");
    }
    buf.put_slice(format!("--{}--\r\n", boundary).as_bytes());

    Ok((boundary, buf.freeze()))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn escape_quoted(s: &str) -> String {
    s.replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| Error::InvalidHeader {
        name: name.to_string(),
    })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::HttpMethod;
    use serde_json::json;

    fn config() -> Config {
        Config::builder()
            .domain("http://localhost:5001/v1")
            .build()
            .unwrap()
    }

    fn body_text(wire: &WireRequest) -> String {
        String::from_utf8(wire.body().to_vec()).unwrap()
    }

    #[test]
    fn test_dataset_get_example() {
        let request = Request::get("/v1/datasets/:dataset_id")
            .path("dataset_id", "ds-1")
            .query("page", "1")
            .build();

        let config = Config::builder().domain("http://localhost:5001").build().unwrap();
        let wire = compose(&config, &request, &RequestOption::default()).unwrap();

        assert_eq!(wire.method(), &Method::GET);
        assert_eq!(
            wire.url().as_str(),
            "http://localhost:5001/v1/datasets/ds-1?page=1"
        );
        assert!(wire.body().is_empty());
        assert!(wire.content_type().is_none());
    }

    #[test]
    fn test_path_values_are_percent_encoded() {
        let request = Request::get("/datasets/:dataset_id/documents/:document_id")
            .path("dataset_id", "a b/c?d")
            .path("document_id", "100%")
            .build();

        let wire = compose(&config(), &request, &RequestOption::default()).unwrap();
        assert_eq!(
            wire.url().path(),
            "/v1/datasets/a%20b%2Fc%3Fd/documents/100%25"
        );
        assert!(!wire.url().path().contains(':'));
    }

    #[test]
    fn test_missing_path_param() {
        let request = Request::delete("/conversations/:conversation_id").build();
        let err = compose(&config(), &request, &RequestOption::default()).unwrap_err();
        match err {
            Error::MissingPathParam { name, .. } => assert_eq!(name, "conversation_id"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_templates() {
        for uri in ["http://evil/x", "/a?b=c", "/a/:", "/a/:bad-name"] {
            let request = Request::get(uri).build();
            let err = compose(&config(), &request, &RequestOption::default()).unwrap_err();
            assert!(matches!(err, Error::InvalidUri { .. }), "{uri}");
        }
    }

    #[test]
    fn test_dot_and_empty_path_values_rejected() {
        for value in ["", ".", ".."] {
            let request = Request::delete("/datasets/:dataset_id/documents/:document_id")
                .path("dataset_id", "ds-1")
                .path("document_id", value)
                .build();
            let err = compose(&config(), &request, &RequestOption::default()).unwrap_err();
            assert!(matches!(err, Error::InvalidUri { .. }), "{value:?}");
            assert!(err.is_config());
        }

        // Dots inside a longer value are ordinary characters.
        let request = Request::get("/files/:file_id")
            .path("file_id", "...")
            .build();
        let wire = compose(&config(), &request, &RequestOption::default()).unwrap();
        assert_eq!(wire.url().path(), "/v1/files/...");
    }

    #[test]
    fn test_repeated_query_keys_are_kept() {
        let request = Request::get("/datasets")
            .query("tag_ids", "a")
            .query("tag_ids", "b")
            .query("keyword", "x y")
            .build();

        let wire = compose(&config(), &request, &RequestOption::default()).unwrap();
        assert_eq!(wire.url().query(), Some("tag_ids=a&tag_ids=b&keyword=x+y"));
    }

    #[test]
    fn test_json_body() {
        let request = Request::post("/chat-messages")
            .field("query", "hello")
            .field("inputs", json!({}))
            .build();

        let wire = compose(&config(), &request, &RequestOption::default()).unwrap();
        assert_eq!(wire.content_type(), Some("application/json"));
        let decoded: Value = serde_json::from_slice(wire.body()).unwrap();
        assert_eq!(decoded, json!({"query": "hello", "inputs": {}}));
    }

    #[test]
    fn test_multipart_example() {
        let request = Request::post("/files/upload")
            .file("file", FilePart::new("a.txt", "hello world"))
            .field("user", "u1")
            .build();

        let wire = compose(&config(), &request, &RequestOption::default()).unwrap();
        let content_type = wire.content_type().unwrap();
        assert_eq!(content_type, "multipart/form-data; boundary=dify-boundary-0");

        let body = body_text(&wire);
        assert_eq!(
            body,
            "--dify-boundary-0\r\n\
             Content-Disposition: form-data; name=\"user\"\r\n\r\n\
             u1\r\n\
             --dify-boundary-0\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             hello world\r\n\
             --dify-boundary-0--\r\n"
        );
    }

    #[test]
    fn test_multipart_defaults_and_boundary_collision() {
        let request = Request::post("/files/upload")
            .file("file", FilePart::unnamed("contains dify-boundary-0 inside"))
            .file(
                "image",
                FilePart::new("", vec![0u8, 1, 2]).with_content_type("image/png"),
            )
            .field("process_rule", json!({"mode": "automatic"}))
            .field("skipped", Value::Null)
            .build();

        let wire = compose(&config(), &request, &RequestOption::default()).unwrap();
        assert_eq!(
            wire.content_type(),
            Some("multipart/form-data; boundary=dify-boundary-1")
        );

        let body = String::from_utf8_lossy(wire.body()).into_owned();
        assert!(body.contains("name=\"file\"; filename=\"upload\""));
        assert!(body.contains("name=\"image\"; filename=\"upload\"\r\nContent-Type: image/png"));
        assert!(body.contains("name=\"process_rule\"\r\n\r\n{\"mode\":\"automatic\"}\r\n"));
        assert!(!body.contains("skipped"));
    }

    #[test]
    fn test_body_encoding_is_exclusive() {
        let cases = [
            (Request::post("/x").field("a", 1).build(), Some("application/json")),
            (
                Request::post("/x")
                    .field("a", 1)
                    .file("f", FilePart::new("f.bin", "x"))
                    .build(),
                Some("multipart/form-data"),
            ),
            (Request::post("/x").build(), None),
        ];

        for (request, expected) in cases {
            let wire = compose(&config(), &request, &RequestOption::default()).unwrap();
            match expected {
                Some(prefix) => assert!(wire.content_type().unwrap().starts_with(prefix)),
                None => assert!(wire.content_type().is_none()),
            }
        }
    }

    #[test]
    fn test_raw_body_bypasses_encoding() {
        let request = Request::post("/x")
            .field("ignored", true)
            .raw_body("already encoded")
            .header("Content-Type", "text/plain")
            .build();

        let wire = compose(&config(), &request, &RequestOption::default()).unwrap();
        assert_eq!(wire.body().as_ref(), b"already encoded");
        assert_eq!(wire.content_type(), Some("text/plain"));
    }

    #[test]
    fn test_header_precedence() {
        let request = Request::post("/x")
            .field("a", 1)
            .header("x-trace", "from-request")
            .header("content-type", "application/vnd.custom+json")
            .build();
        let option = RequestOption::builder()
            .api_key("app-key")
            .header("X-Trace", "from-option")
            .build();

        let wire = compose(&config(), &request, &option).unwrap();
        assert_eq!(wire.headers()["x-trace"], "from-option");
        assert_eq!(wire.content_type(), Some("application/vnd.custom+json"));
        assert_eq!(wire.headers()[AUTHORIZATION], "Bearer app-key");

        let option = RequestOption::builder()
            .api_key("app-key")
            .header("authorization", "Bearer other")
            .build();
        let wire = compose(&config(), &request, &option).unwrap();
        assert_eq!(wire.headers()[AUTHORIZATION], "Bearer other");
    }

    #[test]
    fn test_no_api_key_no_auth_header() {
        let request = Request::get("/x").build();
        let wire = compose(&config(), &request, &RequestOption::default()).unwrap();
        assert!(wire.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let request = Request::get("/x").header("bad header", "v").build();
        let err = compose(&config(), &request, &RequestOption::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader { .. }));

        let option = RequestOption::with_api_key("line\nbreak");
        let err = compose(&config(), &request_get(), &option).unwrap_err();
        assert!(err.is_config());
    }

    fn request_get() -> Request {
        Request::builder(HttpMethod::Get, "/x").build()
    }

    #[test]
    fn test_compose_is_deterministic() {
        let request = Request::post("/datasets/:id/document/create-by-file")
            .path("id", "ds")
            .field("data", json!({"indexing_technique": "economy"}))
            .file("file", FilePart::new("doc.md", "# title"))
            .build();
        let option = RequestOption::with_api_key("k");

        let a = compose(&config(), &request, &option).unwrap();
        let b = compose(&config(), &request, &option).unwrap();
        assert_eq!(a, b);
    }
}
