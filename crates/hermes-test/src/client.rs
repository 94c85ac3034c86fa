//! In-memory test client.
//!
//! Drives the executor and the SSR dispatcher exactly the way the transport
//! does — RPC-prefixed paths to the executor, everything else to the
//! dispatcher — without binding a socket.

use crate::request::TestRequest;
use crate::response::TestResponse;
use bytes::Bytes;
use hermes_core::{RequestIdentity, RpcError};
use hermes_rpc::Executor;
use hermes_ssr::SsrDispatcher;
use http::{Response, StatusCode};
use std::sync::Arc;

/// A test client for making in-memory requests against a Hermes app.
///
/// # Example
///
/// ```ignore
/// let client = TestClient::new(executor).with_dispatcher(dispatcher);
///
/// let response = client
///     .send(TestRequest::post("/_rpc/echo").json(&json!({"message": "abc"})))
///     .await;
/// assert_eq!(response.status(), StatusCode::OK);
/// ```
pub struct TestClient {
    executor: Executor,
    dispatcher: Option<Arc<SsrDispatcher>>,
}

impl TestClient {
    /// Creates a client over an executor.
    #[must_use]
    pub fn new(executor: Executor) -> Self {
        Self {
            executor,
            dispatcher: None,
        }
    }

    /// Mounts an SSR dispatcher for non-RPC paths.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: SsrDispatcher) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    /// Returns the executor under test.
    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Sends a request and captures the response.
    pub async fn send(&self, request: TestRequest) -> TestResponse {
        let (parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();
        let prefix = self.executor.options().rpc_prefix.clone();

        let response = if path == prefix || path.starts_with(&format!("{prefix}/")) {
            self.executor.handle(parts, body).await
        } else if let Some(dispatcher) = &self.dispatcher {
            let identity = RequestIdentity::new(
                parts.method.clone(),
                parts.uri.clone(),
                parts.headers.clone(),
            );
            dispatcher.dispatch(&identity).await
        } else {
            not_found(&path)
        };

        TestResponse::from_response(response)
    }
}

fn not_found(path: &str) -> Response<Bytes> {
    let envelope = RpcError::not_found(format!("no route for '{path}'")).to_envelope(false);
    let body = serde_json::to_vec(&envelope).unwrap_or_default();
    let mut response = Response::new(Bytes::from(body));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::ContextStore;
    use hermes_rpc::ServerFnRegistry;

    #[tokio::test]
    async fn test_unrouted_path_is_404() {
        let executor = Executor::new(
            Arc::new(ServerFnRegistry::new()),
            Arc::new(ContextStore::new()),
        );
        let client = TestClient::new(executor);

        let response = client.send(TestRequest::get("/nowhere")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
