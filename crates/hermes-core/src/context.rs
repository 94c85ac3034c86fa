//! Per-invocation identity and context.
//!
//! An [`InvocationContext`] carries the originating request's identity plus
//! the mutable response overrides (status, headers) that middleware and
//! handlers accumulate during one server-function execution.

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for each invocation, using UUID v7.
///
/// UUID v7 is time-ordered, which makes invocation ids suitable for log
/// correlation and for keying concurrent entries in the context store.
///
/// # Example
///
/// ```
/// use hermes_core::InvocationId;
///
/// let id = InvocationId::new();
/// println!("invocation: {id}");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Creates a new unique invocation id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates an `InvocationId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to the originating request.
///
/// Captures what the pipeline is allowed to see about the inbound HTTP
/// request: method, URI, and headers. Trusted in-process calls synthesize
/// one via [`RequestIdentity::synthetic`].
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl RequestIdentity {
    /// Creates an identity from request parts.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
        }
    }

    /// Synthesizes an identity for a trusted in-process call to the named
    /// server function. No network request exists, so the URI is the RPC
    /// path the call would have used and the header map is empty.
    #[must_use]
    pub fn synthetic(function_name: &str) -> Self {
        let uri: Uri = format!("/_rpc/{function_name}")
            .parse()
            .unwrap_or_else(|_| Uri::from_static("/_rpc"));
        Self {
            method: Method::POST,
            uri,
            headers: HeaderMap::new(),
        }
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the raw query string, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Mutable response overrides accumulated during one invocation.
#[derive(Debug, Clone)]
struct ResponseOverrides {
    status: StatusCode,
    headers: HeaderMap,
}

impl Default for ResponseOverrides {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }
}

/// Per-call context exclusively owned by one invocation.
///
/// Created when an invocation starts and removed from the
/// [`ContextStore`](crate::ContextStore) when it ends. Middleware and
/// handlers write response headers and status through it; the transport
/// reads them back when building the final response.
///
/// # Example
///
/// ```
/// use hermes_core::{InvocationContext, RequestIdentity};
/// use http::StatusCode;
///
/// let ctx = InvocationContext::new(RequestIdentity::synthetic("createUser"));
/// ctx.set_status(StatusCode::CREATED);
/// assert_eq!(ctx.status(), StatusCode::CREATED);
/// ```
#[derive(Debug)]
pub struct InvocationContext {
    id: InvocationId,
    identity: RequestIdentity,
    response: Mutex<ResponseOverrides>,
}

impl InvocationContext {
    /// Creates a fresh context for the given request identity.
    #[must_use]
    pub fn new(identity: RequestIdentity) -> Self {
        Self {
            id: InvocationId::new(),
            identity,
            response: Mutex::new(ResponseOverrides::default()),
        }
    }

    /// Returns the invocation id.
    #[must_use]
    pub fn id(&self) -> InvocationId {
        self.id
    }

    /// Returns the originating request identity.
    #[must_use]
    pub fn identity(&self) -> &RequestIdentity {
        &self.identity
    }

    /// Returns the current response status (200 unless overridden).
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.response.lock().status
    }

    /// Overrides the response status.
    pub fn set_status(&self, status: StatusCode) {
        self.response.lock().status = status;
    }

    /// Sets a response header, replacing any previous value.
    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.response.lock().headers.insert(name, value);
    }

    /// Appends a response header, keeping previous values (Set-Cookie).
    pub fn append_header(&self, name: HeaderName, value: HeaderValue) {
        self.response.lock().headers.append(name, value);
    }

    /// Returns a header value accumulated so far, if present.
    #[must_use]
    pub fn response_header(&self, name: &str) -> Option<HeaderValue> {
        self.response.lock().headers.get(name).cloned()
    }

    /// Snapshots the accumulated response status and headers.
    ///
    /// The executor calls this once, right before the context is removed
    /// from the store.
    #[must_use]
    pub fn response_parts(&self) -> (StatusCode, HeaderMap) {
        let response = self.response.lock();
        (response.status, response.headers.clone())
    }
}
