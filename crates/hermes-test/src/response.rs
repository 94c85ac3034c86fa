//! Test response wrapper with assertion helpers.

use bytes::Bytes;
use http::{HeaderMap, Response, StatusCode};
use serde::de::DeserializeOwned;

/// A captured HTTP response.
#[derive(Debug, Clone)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Captures a framework response.
    #[must_use]
    pub fn from_response(response: Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as text (lossy).
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_capture() {
        let mut response = Response::new(Bytes::from(r#"{"ok":true}"#));
        *response.status_mut() = StatusCode::CREATED;
        response.headers_mut().insert(
            "x-test",
            http::HeaderValue::from_static("1"),
        );

        let captured = TestResponse::from_response(response);
        assert_eq!(captured.status(), StatusCode::CREATED);
        assert_eq!(captured.header("x-test"), Some("1"));
        assert_eq!(captured.header("x-missing"), None);
        assert_eq!(captured.text(), r#"{"ok":true}"#);
        let value: Value = captured.json().unwrap();
        assert_eq!(value["ok"], true);
    }
}
