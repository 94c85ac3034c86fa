//! Test request builder.

use bytes::Bytes;
use http::Method;
use serde::Serialize;

/// An in-memory HTTP request under construction.
///
/// # Example
///
/// ```
/// use hermes_test::TestRequest;
///
/// let request = TestRequest::post("/_rpc/echo")
///     .json(&serde_json::json!({"message": "abc"}));
/// ```
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl TestRequest {
    /// Creates a request with the given method and URI.
    #[must_use]
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Creates a POST request.
    #[must_use]
    pub fn post(uri: impl Into<String>) -> Self {
        Self::new(Method::POST, uri)
    }

    /// Creates a GET request to an RPC function with query-encoded input.
    #[must_use]
    pub fn rpc_get(prefix: &str, name: &str, input: &impl Serialize) -> Self {
        let raw = serde_json::to_string(input).unwrap_or_else(|_| "null".to_string());
        let query = serde_urlencoded::to_string([("input", raw.as_str())])
            .unwrap_or_default();
        Self::get(format!("{prefix}/{name}?{query}"))
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets a JSON body (and content type).
    #[must_use]
    pub fn json(self, value: &impl Serialize) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        self.header("content-type", "application/json")
            .body(Bytes::from(body))
    }

    /// Sets a URL-encoded form body (and content type).
    #[must_use]
    pub fn form(self, fields: &[(&str, &str)]) -> Self {
        let body = serde_urlencoded::to_string(fields).unwrap_or_default();
        self.header("content-type", "application/x-www-form-urlencoded")
            .body(Bytes::from(body))
    }

    /// Sets a raw body.
    #[must_use]
    pub fn body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// Splits the request into HTTP parts and body bytes.
    ///
    /// # Panics
    ///
    /// Panics if the URI or a header is invalid — a malformed test request
    /// is a bug in the test.
    #[must_use]
    pub fn into_parts(self) -> (http::request::Parts, Bytes) {
        let mut builder = http::Request::builder().method(self.method).uri(self.uri);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let request = builder.body(()).expect("valid test request");
        let (parts, ()) = request.into_parts();
        (parts, self.body)
    }
}
