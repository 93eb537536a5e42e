//! The response envelope shared by every endpoint.

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Code reported when a 2xx body cannot be decoded into the expected type.
pub const DECODE_ERROR_CODE: &str = "decode_error";

/// The unprocessed HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl RawResponse {
    pub fn status(&self) -> StatusCode {
        self.status
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
}

/// Outcome of a buffered call.
///
/// `code` is `None` exactly when the call succeeded. Failed calls carry the
/// server's error code and message; `data` is then `None`. Successful calls
/// whose body is not JSON (audio, empty bodies) also have no `data`; their
/// payload is in [`Response::bytes`].
#[derive(Debug, Clone)]
pub struct Response<T = Value> {
    code: Option<String>,
    msg: Option<String>,
    data: Option<T>,
    raw: RawResponse,
}

/// Error object returned by the API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

impl ErrorBody {
    fn parse(body: &[u8]) -> Option<Self> {
        let parsed: Self = serde_json::from_slice(body).ok()?;
        if parsed.code.is_none() && parsed.message.is_none() && parsed.msg.is_none() {
            return None;
        }
        Some(parsed)
    }

    fn code(&self) -> Option<String> {
        match self.code.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn message(&self) -> Option<String> {
        self.message.clone().or_else(|| self.msg.clone())
    }
}

impl<T: DeserializeOwned> Response<T> {
    /// Build the envelope from a fully received response.
    pub fn from_parts(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        let raw = RawResponse {
            status,
            headers,
            body,
        };

        if !status.is_success() {
            let (code, msg) = error_fields(&raw);
            return Self::failed(code, msg, raw);
        }

        if raw.body.is_empty() || !raw.content_type().is_some_and(is_json) {
            return Self {
                code: None,
                msg: None,
                data: None,
                raw,
            };
        }

        match serde_json::from_slice::<T>(&raw.body) {
            Ok(data) => Self {
                code: None,
                msg: None,
                data: Some(data),
                raw,
            },
            Err(e) => {
                if let Some(err) = ErrorBody::parse(&raw.body).filter(|b| b.code.is_some()) {
                    let code = err.code().unwrap_or_else(|| status_code(status));
                    return Self::failed(code, err.message(), raw);
                }
                tracing::warn!(status = status.as_u16(), error = %e, "Failed to decode response body");
                Self::failed(DECODE_ERROR_CODE.to_string(), Some(e.to_string()), raw)
            }
        }
    }
}

impl<T> Response<T> {
    fn failed(code: String, msg: Option<String>, raw: RawResponse) -> Self {
        Self {
            code: Some(code),
            msg,
            data: None,
            raw,
        }
    }

    /// True iff the call succeeded (no error code).
    pub fn success(&self) -> bool {
        self.code.is_none()
    }

    /// Error code, `None` on success.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Human-readable error message.
    pub fn msg(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    /// Decoded payload.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Take the decoded payload.
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// HTTP status.
    pub fn status(&self) -> StatusCode {
        self.raw.status
    }

    /// Raw body bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.raw.body
    }

    /// The unprocessed response.
    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }
}

fn error_fields(raw: &RawResponse) -> (String, Option<String>) {
    match ErrorBody::parse(&raw.body) {
        Some(err) => (
            err.code().unwrap_or_else(|| status_code(raw.status)),
            err.message().or_else(|| reason(raw.status)),
        ),
        None => {
            let text = String::from_utf8_lossy(&raw.body).trim().to_string();
            let msg = if text.is_empty() { reason(raw.status) } else { Some(text) };
            (status_code(raw.status), msg)
        }
    }
}

fn status_code(status: StatusCode) -> String {
    format!("http_{}", status.as_u16())
}

fn reason(status: StatusCode) -> Option<String> {
    status.canonical_reason().map(str::to_string)
}

/// Whether a content type denotes JSON (`application/json` or `*+json`).
pub(crate) fn is_json(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Dataset {
        id: String,
        name: String,
    }

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    fn json_body(value: Value) -> Bytes {
        Bytes::from(serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn test_success_decodes_data() {
        let response: Response<Dataset> = Response::from_parts(
            StatusCode::OK,
            headers("application/json; charset=utf-8"),
            json_body(json!({"id": "ds-1", "name": "docs", "extra": 1})),
        );

        assert!(response.success());
        assert!(response.code().is_none());
        assert_eq!(
            response.data(),
            Some(&Dataset {
                id: "ds-1".to_string(),
                name: "docs".to_string()
            })
        );
    }

    #[test]
    fn test_not_found_example() {
        let response: Response<Dataset> = Response::from_parts(
            StatusCode::NOT_FOUND,
            headers("application/json"),
            json_body(json!({"code": "404", "message": "not found"})),
        );

        assert!(!response.success());
        assert_eq!(response.code(), Some("404"));
        assert_eq!(response.msg(), Some("not found"));
        assert!(response.data().is_none());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_numeric_code_and_msg_alias() {
        let response: Response = Response::from_parts(
            StatusCode::BAD_REQUEST,
            headers("application/json"),
            json_body(json!({"code": 400, "msg": "bad input"})),
        );
        assert_eq!(response.code(), Some("400"));
        assert_eq!(response.msg(), Some("bad input"));
    }

    #[test]
    fn test_unparseable_error_body() {
        let response: Response = Response::from_parts(
            StatusCode::BAD_GATEWAY,
            headers("text/html"),
            Bytes::from_static(b"<html>upstream down</html>"),
        );
        assert!(!response.success());
        assert_eq!(response.code(), Some("http_502"));
        assert_eq!(response.msg(), Some("<html>upstream down</html>"));

        let response: Response = Response::from_parts(
            StatusCode::UNAUTHORIZED,
            HeaderMap::new(),
            Bytes::new(),
        );
        assert_eq!(response.code(), Some("http_401"));
        assert_eq!(response.msg(), Some("Unauthorized"));
    }

    #[test]
    fn test_binary_success_keeps_bytes() {
        let response: Response = Response::from_parts(
            StatusCode::OK,
            headers("audio/mpeg"),
            Bytes::from_static(&[0xff, 0xfb, 0x90]),
        );
        assert!(response.success());
        assert!(response.data().is_none());
        assert_eq!(response.bytes().as_ref(), &[0xff, 0xfb, 0x90]);
    }

    #[test]
    fn test_decode_failure_is_data() {
        let response: Response<Dataset> = Response::from_parts(
            StatusCode::OK,
            headers("application/json"),
            json_body(json!({"unexpected": true})),
        );
        assert!(!response.success());
        assert_eq!(response.code(), Some(DECODE_ERROR_CODE));
        assert!(response.msg().unwrap().contains("missing field"));
    }

    #[test]
    fn test_decode_failure_with_error_object() {
        let response: Response<Dataset> = Response::from_parts(
            StatusCode::OK,
            headers("application/json"),
            json_body(json!({"code": "invalid_param", "message": "bad"})),
        );
        assert_eq!(response.code(), Some("invalid_param"));
        assert_eq!(response.msg(), Some("bad"));
    }

    #[test]
    fn test_success_matches_code_absence() {
        let cases = [
            (StatusCode::OK, json!({"id": "1", "name": "n"})),
            (StatusCode::OK, json!([])),
            (StatusCode::FORBIDDEN, json!({"code": "forbidden", "message": "no"})),
            (StatusCode::INTERNAL_SERVER_ERROR, json!("boom")),
        ];
        for (status, body) in cases {
            let response: Response<Dataset> =
                Response::from_parts(status, headers("application/json"), json_body(body));
            assert_eq!(response.success(), response.code().is_none());
        }
    }

    #[test]
    fn test_is_json() {
        assert!(is_json("application/json"));
        assert!(is_json("Application/JSON; charset=utf-8"));
        assert!(is_json("application/problem+json"));
        assert!(!is_json("text/event-stream"));
        assert!(!is_json("audio/wav"));
    }
}
