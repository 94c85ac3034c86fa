//! Remote caller for server functions.
//!
//! [`RpcClient`] is the untrusted-context counterpart of the in-process
//! [`ServerFn`](crate::ServerFn) proxy: it serializes input, issues an HTTP
//! call to the fixed RPC endpoint derived from the function name, and
//! translates the response back. Redirect responses are never treated as
//! data — they update the caller's navigation state through a [`Navigator`]
//! collaborator and surface as the redirect signal. Non-success statuses
//! become [`RpcError`] values carrying the server-provided message.

use crate::codec::{DEFAULT_RPC_PREFIX, INPUT_QUERY_PARAM};
use hermes_core::{ErrorEnvelope, RpcError, RpcResult};
use http::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Caller-side navigation state, updated when a remote call redirects.
pub trait Navigator: Send + Sync + 'static {
    /// Moves the caller's navigation state to `location`.
    fn navigate(&self, location: &str);
}

/// Builder for [`RpcClient`].
pub struct RpcClientBuilder {
    base_url: String,
    rpc_prefix: String,
    navigator: Option<Arc<dyn Navigator>>,
}

impl RpcClientBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            rpc_prefix: DEFAULT_RPC_PREFIX.to_string(),
            navigator: None,
        }
    }

    /// Overrides the RPC path prefix (must match the server).
    #[must_use]
    pub fn rpc_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.rpc_prefix = prefix.into();
        self
    }

    /// Attaches a navigation collaborator for redirect responses.
    #[must_use]
    pub fn navigator<N: Navigator>(mut self, navigator: N) -> Self {
        self.navigator = Some(Arc::new(navigator));
        self
    }

    /// Builds the client.
    ///
    /// Redirects are not followed by the HTTP layer; they are surfaced to
    /// the navigator instead.
    pub fn build(self) -> RpcResult<RpcClient> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| RpcError::internal_with_source("failed to build HTTP client", e))?;
        Ok(RpcClient {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            rpc_prefix: self.rpc_prefix,
            http,
            navigator: self.navigator,
        })
    }
}

/// HTTP caller for remote server functions.
///
/// # Example
///
/// ```ignore
/// let client = RpcClient::new("https://app.example.com")?;
/// let out: EchoOutput = client.call("echo", &EchoInput { message: "abc".into() }).await?;
/// ```
#[derive(Clone)]
pub struct RpcClient {
    base_url: String,
    rpc_prefix: String,
    http: reqwest::Client,
    navigator: Option<Arc<dyn Navigator>>,
}

impl RpcClient {
    /// Starts a client builder.
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> RpcClientBuilder {
        RpcClientBuilder::new(base_url)
    }

    /// Creates a client with default settings.
    pub fn new(base_url: impl Into<String>) -> RpcResult<Self> {
        Self::builder(base_url).build()
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}{}/{name}", self.base_url, self.rpc_prefix)
    }

    /// Calls a POST function with a JSON body.
    pub async fn call<I, O>(&self, name: &str, input: &I) -> RpcResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.endpoint(name))
            .json(input)
            .send()
            .await
            .map_err(|e| RpcError::internal_with_source("server-function call failed", e))?;
        self.translate(response).await
    }

    /// Calls a GET function with query-encoded input.
    pub async fn call_get<I, O>(&self, name: &str, input: &I) -> RpcResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let raw = serde_json::to_string(input).map_err(|e| {
            RpcError::internal_with_source("failed to serialize server-function input", e)
        })?;
        let response = self
            .http
            .get(self.endpoint(name))
            .query(&[(INPUT_QUERY_PARAM, raw.as_str())])
            .send()
            .await
            .map_err(|e| RpcError::internal_with_source("server-function call failed", e))?;
        self.translate(response).await
    }

    async fn translate<O: DeserializeOwned>(&self, response: reqwest::Response) -> RpcResult<O> {
        let status =
            StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);

        if status.is_redirection() {
            let location = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("/")
                .to_string();
            if let Some(navigator) = &self.navigator {
                navigator.navigate(&location);
            }
            return Err(RpcError::redirect_with_status(location, status));
        }

        if status.is_success() {
            return response.json::<O>().await.map_err(|e| {
                RpcError::internal_with_source("failed to decode server-function response", e)
            });
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => Err(envelope_to_error(status, envelope)),
            Err(_) if body.is_empty() => Err(RpcError::http(status, status.to_string())),
            Err(_) => Err(RpcError::http(status, body)),
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("base_url", &self.base_url)
            .field("rpc_prefix", &self.rpc_prefix)
            .finish_non_exhaustive()
    }
}

fn envelope_to_error(status: StatusCode, envelope: ErrorEnvelope) -> RpcError {
    let message = envelope.error.message;
    match envelope.error.code.as_str() {
        "VALIDATION_ERROR" => RpcError::Validation {
            message,
            field_errors: envelope
                .error
                .details
                .and_then(|d| serde_json::from_value(d).ok()),
        },
        "NOT_FOUND" => RpcError::NotFound { message },
        _ => RpcError::Http { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::FieldErrors;

    #[test]
    fn test_endpoint_shape() {
        let client = RpcClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.endpoint("echo"), "http://localhost:8080/_rpc/echo");

        let custom = RpcClient::builder("http://localhost:8080")
            .rpc_prefix("/api/fns")
            .build()
            .unwrap();
        assert_eq!(custom.endpoint("echo"), "http://localhost:8080/api/fns/echo");
    }

    #[test]
    fn test_envelope_translation() {
        let mut fields = FieldErrors::new();
        fields.add("message", "required");
        let envelope = RpcError::validation_with_fields("invalid input", fields).to_envelope(false);

        let error = envelope_to_error(StatusCode::BAD_REQUEST, envelope);
        match error {
            RpcError::Validation {
                field_errors: Some(fields),
                ..
            } => assert!(fields.contains_path("message")),
            other => panic!("expected validation error, got {other:?}"),
        }

        let envelope = RpcError::not_found("unknown server function 'x'").to_envelope(false);
        let error = envelope_to_error(StatusCode::NOT_FOUND, envelope);
        assert!(matches!(error, RpcError::NotFound { .. }));

        let envelope =
            RpcError::http(StatusCode::UNAUTHORIZED, "token expired").to_envelope(false);
        let error = envelope_to_error(StatusCode::UNAUTHORIZED, envelope);
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }
}
