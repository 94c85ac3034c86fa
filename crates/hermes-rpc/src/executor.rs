//! Server-function executor.
//!
//! The executor resolves a registered function by name, establishes a fresh
//! per-call [`InvocationContext`] in the context store, runs validation, the
//! middleware chain, and the handler, and translates the outcome — success
//! or control-flow signal — into a concrete HTTP response. The context slot
//! is freed on every exit path: the RAII guard is held across the whole
//! pipeline, so success, validation failure, signals, timeouts, and panics
//! all clean up alike.

use crate::codec;
use crate::function::ServerFnDescriptor;
use crate::middleware::run_chain;
use crate::registry::ServerFnRegistry;
use bytes::Bytes;
use futures_util::FutureExt;
use hermes_core::{ContextStore, InvocationContext, RequestIdentity, RpcError};
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderValue, Method, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Executor tuning knobs.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Surface internal error detail to callers. Off in production.
    pub diagnostics: bool,
    /// Upper bound on one invocation. A function that exceeds it produces a
    /// 504 signal; the context slot is freed either way.
    pub invocation_timeout: Option<Duration>,
    /// RPC path prefix for the HTTP-facing entry point.
    pub rpc_prefix: String,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            diagnostics: false,
            invocation_timeout: None,
            rpc_prefix: codec::DEFAULT_RPC_PREFIX.to_string(),
        }
    }
}

/// The outcome of one invocation, together with the response metadata the
/// context accumulated before the slot was freed.
#[derive(Debug)]
pub struct Execution {
    outcome: Result<Value, RpcError>,
    status: StatusCode,
    headers: HeaderMap,
}

impl Execution {
    /// Returns the handler output or the propagated error/signal.
    #[must_use]
    pub fn outcome(&self) -> &Result<Value, RpcError> {
        &self.outcome
    }

    /// Consumes the execution, yielding the handler output.
    pub fn into_result(self) -> Result<Value, RpcError> {
        self.outcome
    }

    /// Returns the response status the invocation accumulated.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers the invocation accumulated.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Resolves, runs, and translates server-function invocations.
///
/// The registry and context store are explicit injectable state — tests
/// build isolated instances instead of sharing module-level globals.
///
/// # Example
///
/// ```ignore
/// let executor = Executor::new(
///     Arc::new(ServerFnRegistry::new()),
///     Arc::new(ContextStore::new()),
/// );
///
/// let greet = ServerFnBuilder::new("greet")
///     .handler(&executor, |_ctx, name: String| async move {
///         Ok(format!("hello, {name}"))
///     })?;
/// ```
#[derive(Clone)]
pub struct Executor {
    registry: Arc<ServerFnRegistry>,
    store: Arc<ContextStore>,
    options: ExecutorOptions,
}

impl Executor {
    /// Creates an executor with default options.
    #[must_use]
    pub fn new(registry: Arc<ServerFnRegistry>, store: Arc<ContextStore>) -> Self {
        Self::with_options(registry, store, ExecutorOptions::default())
    }

    /// Creates an executor with explicit options.
    #[must_use]
    pub fn with_options(
        registry: Arc<ServerFnRegistry>,
        store: Arc<ContextStore>,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            registry,
            store,
            options,
        }
    }

    /// Returns the function registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ServerFnRegistry> {
        &self.registry
    }

    /// Returns the context store.
    #[must_use]
    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// Returns the executor options.
    #[must_use]
    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Executes a registered function against raw input.
    ///
    /// Pipeline: lookup → context begin → validate → middleware → handler →
    /// response snapshot → guaranteed context cleanup.
    pub async fn execute(
        &self,
        name: &str,
        raw_input: Value,
        identity: RequestIdentity,
    ) -> Execution {
        let Some(descriptor) = self.registry.lookup(name) else {
            return Execution {
                outcome: Err(RpcError::not_found(format!(
                    "unknown server function '{name}'"
                ))),
                status: StatusCode::OK,
                headers: HeaderMap::new(),
            };
        };

        let guard = self.store.begin(identity);
        let ctx = Arc::clone(guard.context());
        tracing::debug!(function = name, invocation = %ctx.id(), "executing server function");

        // A panicking handler must still produce a response and free its
        // context slot.
        let pipeline = std::panic::AssertUnwindSafe(Self::run_pipeline(&descriptor, &ctx, raw_input))
            .catch_unwind();
        let outcome = match self.options.invocation_timeout {
            Some(limit) => match tokio::time::timeout(limit, pipeline).await {
                Ok(joined) => flatten_panic(name, joined),
                Err(_) => Err(RpcError::http(
                    StatusCode::GATEWAY_TIMEOUT,
                    format!("server function '{name}' timed out"),
                )),
            },
            None => flatten_panic(name, pipeline.await),
        };

        let (status, headers) = ctx.response_parts();
        drop(guard);

        Execution {
            outcome,
            status,
            headers,
        }
    }

    async fn run_pipeline(
        descriptor: &ServerFnDescriptor,
        ctx: &Arc<InvocationContext>,
        raw_input: Value,
    ) -> Result<Value, RpcError> {
        let validated = match descriptor.validator() {
            Some(validator) => validator.validate(raw_input)?,
            None => raw_input,
        };
        let data = run_chain(descriptor.middlewares(), ctx, validated).await?;
        descriptor.invoke(Arc::clone(ctx), data).await
    }

    /// Translates an execution into an HTTP response.
    ///
    /// The mapping is exhaustive over the error taxonomy; every outcome
    /// yields a well-formed response.
    #[must_use]
    pub fn into_response(&self, execution: Execution) -> Response<Bytes> {
        let Execution {
            outcome,
            status,
            headers,
        } = execution;

        match outcome {
            Ok(value) => match serde_json::to_vec(&value) {
                Ok(body) => json_response(status, headers, Bytes::from(body)),
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize server-function output");
                    self.error_response(
                        RpcError::internal("output serialization failed"),
                        HeaderMap::new(),
                    )
                }
            },
            Err(signal) => self.signal_response(signal, headers),
        }
    }

    /// Translates a raised signal or error into an HTTP response, merging
    /// in headers the invocation accumulated before it aborted.
    pub(crate) fn signal_response(
        &self,
        signal: RpcError,
        accumulated: HeaderMap,
    ) -> Response<Bytes> {
        match signal {
            RpcError::Redirect { location, status } => {
                match HeaderValue::from_str(&location) {
                    Ok(value) => {
                        let mut response = Response::new(Bytes::new());
                        *response.status_mut() = status;
                        response.headers_mut().extend(accumulated);
                        response.headers_mut().insert(LOCATION, value);
                        response
                    }
                    Err(_) => self.error_response(
                        RpcError::internal(format!("invalid redirect location '{location}'")),
                        accumulated,
                    ),
                }
            }
            error => self.error_response(error, accumulated),
        }
    }

    fn error_response(&self, error: RpcError, accumulated: HeaderMap) -> Response<Bytes> {
        match &error {
            RpcError::Internal { message, source } => {
                tracing::error!(error = %message, source = ?source, "server function failed");
            }
            other => {
                tracing::debug!(error = %other, "server function signaled");
            }
        }

        let envelope = error.to_envelope(self.options.diagnostics);
        let body = serde_json::to_vec(&envelope)
            .unwrap_or_else(|_| br#"{"error":{"code":"INTERNAL_ERROR","message":"Internal server error"}}"#.to_vec());
        json_response(error.status_code(), accumulated, Bytes::from(body))
    }

    /// HTTP-facing entry point for RPC paths.
    ///
    /// Resolves the function name from `prefix/<name>` (or the legacy
    /// `{name, input}` body at the bare prefix), decodes the input per the
    /// request method and content type, executes, and shapes the response.
    pub async fn handle(
        &self,
        parts: http::request::Parts,
        body: Bytes,
    ) -> Response<Bytes> {
        let identity =
            RequestIdentity::new(parts.method.clone(), parts.uri.clone(), parts.headers.clone());

        match self.decode_call(&parts, body).await {
            Ok((name, input)) => {
                let execution = self.execute(&name, input, identity).await;
                self.into_response(execution)
            }
            Err(error) => self.signal_response(error, HeaderMap::new()),
        }
    }

    async fn decode_call(
        &self,
        parts: &http::request::Parts,
        body: Bytes,
    ) -> Result<(String, Value), RpcError> {
        let path = parts.uri.path();
        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        if let Some(name) = codec::function_name_from_path(&self.options.rpc_prefix, path) {
            let input = if parts.method == Method::GET {
                codec::decode_query_input(parts.uri.query())?
            } else {
                codec::decode_body_input(content_type.as_deref(), body).await?
            };
            return Ok((name, input));
        }

        if codec::is_rpc_root(&self.options.rpc_prefix, path) {
            let call = codec::decode_legacy_call(content_type.as_deref(), body).await?;
            return Ok((call.name, call.input));
        }

        Err(RpcError::not_found(format!("no RPC endpoint at '{path}'")))
    }
}

fn flatten_panic(
    name: &str,
    joined: Result<Result<Value, RpcError>, Box<dyn std::any::Any + Send>>,
) -> Result<Value, RpcError> {
    joined.unwrap_or_else(|_| {
        tracing::error!(function = name, "server function panicked");
        Err(RpcError::internal(format!(
            "server function '{name}' panicked"
        )))
    })
}

fn json_response(status: StatusCode, headers: HeaderMap, body: Bytes) -> Response<Bytes> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().extend(headers);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::ServerFnBuilder;
    use hermes_core::{FieldErrors, FnValidator};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct EchoInput {
        message: String,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct EchoOutput {
        original: String,
        reversed: String,
    }

    fn new_executor() -> Executor {
        Executor::new(
            Arc::new(ServerFnRegistry::new()),
            Arc::new(ContextStore::new()),
        )
    }

    fn register_echo(executor: &Executor) {
        ServerFnBuilder::new("echo")
            .validator(FnValidator::new(|raw: Value| {
                let mut fields = FieldErrors::new();
                match raw.get("message").and_then(Value::as_str) {
                    Some(m) if !m.is_empty() && m.len() <= 1000 => return Ok(raw),
                    Some(_) => fields.add("message", "must be between 1 and 1000 characters"),
                    None => fields.add("message", "required"),
                }
                Err(RpcError::validation_with_fields("invalid input", fields))
            }))
            .handler(executor, |_ctx, input: EchoInput| async move {
                Ok(EchoOutput {
                    reversed: input.message.chars().rev().collect(),
                    original: input.message,
                })
            })
            .expect("echo registration");
    }

    #[tokio::test]
    async fn test_execute_success() {
        let executor = new_executor();
        register_echo(&executor);

        let execution = executor
            .execute(
                "echo",
                json!({"message": "abc"}),
                RequestIdentity::synthetic("echo"),
            )
            .await;

        assert_eq!(execution.status(), StatusCode::OK);
        let value = execution.into_result().unwrap();
        assert_eq!(value, json!({"original": "abc", "reversed": "cba"}));
    }

    #[tokio::test]
    async fn test_execute_validation_failure_lists_fields() {
        let executor = new_executor();
        register_echo(&executor);

        let execution = executor
            .execute(
                "echo",
                json!({"message": ""}),
                RequestIdentity::synthetic("echo"),
            )
            .await;

        let response = executor.into_response(execution);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let envelope: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(envelope["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(envelope["error"]["details"]["errors"][0]["path"], "message");
    }

    #[tokio::test]
    async fn test_execute_unknown_function() {
        let executor = new_executor();
        let execution = executor
            .execute("nope", Value::Null, RequestIdentity::synthetic("nope"))
            .await;
        let response = executor.into_response(execution);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_redirect_signal_becomes_location_response() {
        let executor = new_executor();
        ServerFnBuilder::new("go")
            .handler(&executor, |_ctx, (): ()| async move {
                Err::<Value, _>(RpcError::redirect_with_status("/next", StatusCode::SEE_OTHER))
            })
            .unwrap();

        let execution = executor
            .execute("go", Value::Null, RequestIdentity::synthetic("go"))
            .await;
        let response = executor.into_response(execution);

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/next");
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_not_found_signal() {
        let executor = new_executor();
        ServerFnBuilder::new("missing")
            .handler(&executor, |_ctx, (): ()| async move {
                Err::<Value, _>(RpcError::not_found("x"))
            })
            .unwrap();

        let execution = executor
            .execute("missing", Value::Null, RequestIdentity::synthetic("missing"))
            .await;
        let response = executor.into_response(execution);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let envelope: Value = serde_json::from_slice(response.body()).unwrap();
        assert!(envelope["error"]["message"].as_str().unwrap().contains('x'));
    }

    #[tokio::test]
    async fn test_internal_error_masked_unless_diagnostics() {
        let registry = Arc::new(ServerFnRegistry::new());
        let store = Arc::new(ContextStore::new());
        let executor = Executor::new(Arc::clone(&registry), Arc::clone(&store));
        ServerFnBuilder::new("boom")
            .handler(&executor, |_ctx, (): ()| async move {
                Err::<Value, _>(RpcError::internal("secret detail"))
            })
            .unwrap();

        let execution = executor
            .execute("boom", Value::Null, RequestIdentity::synthetic("boom"))
            .await;
        let response = executor.into_response(execution);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let envelope: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(envelope["error"]["message"], "Internal server error");

        let diagnostic = Executor::with_options(
            registry,
            store,
            ExecutorOptions {
                diagnostics: true,
                ..ExecutorOptions::default()
            },
        );
        let execution = diagnostic
            .execute("boom", Value::Null, RequestIdentity::synthetic("boom"))
            .await;
        let response = diagnostic.into_response(execution);
        let envelope: Value = serde_json::from_slice(response.body()).unwrap();
        assert!(envelope["error"]["message"]
            .as_str()
            .unwrap()
            .contains("secret detail"));
    }

    #[tokio::test]
    async fn test_handler_status_and_headers_flow_to_response() {
        let executor = new_executor();
        ServerFnBuilder::new("created")
            .handler(&executor, |ctx: Arc<InvocationContext>, (): ()| async move {
                ctx.set_status(StatusCode::CREATED);
                ctx.insert_header(
                    http::header::HeaderName::from_static("x-entity"),
                    HeaderValue::from_static("user"),
                );
                Ok(json!({"ok": true}))
            })
            .unwrap();

        let execution = executor
            .execute("created", Value::Null, RequestIdentity::synthetic("created"))
            .await;
        let response = executor.into_response(execution);

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("x-entity").unwrap(), "user");
    }

    #[tokio::test]
    async fn test_context_slot_freed_on_every_exit_path() {
        let executor = new_executor();
        register_echo(&executor);

        // Success
        let _ = executor
            .execute(
                "echo",
                json!({"message": "ok"}),
                RequestIdentity::synthetic("echo"),
            )
            .await;
        assert!(executor.store().is_empty());

        // Validation failure
        let _ = executor
            .execute(
                "echo",
                json!({"message": ""}),
                RequestIdentity::synthetic("echo"),
            )
            .await;
        assert!(executor.store().is_empty());
    }

    #[tokio::test]
    async fn test_invocation_timeout_maps_to_504_and_frees_slot() {
        let executor = Executor::with_options(
            Arc::new(ServerFnRegistry::new()),
            Arc::new(ContextStore::new()),
            ExecutorOptions {
                invocation_timeout: Some(Duration::from_millis(20)),
                ..ExecutorOptions::default()
            },
        );
        ServerFnBuilder::new("slow")
            .handler(&executor, |_ctx, (): ()| async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(json!(null))
            })
            .unwrap();

        let execution = executor
            .execute("slow", Value::Null, RequestIdentity::synthetic("slow"))
            .await;
        let response = executor.into_response(execution);
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(executor.store().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_handler_yields_500_and_frees_slot() {
        let executor = new_executor();
        ServerFnBuilder::new("explode")
            .handler(&executor, |_ctx, trip: bool| async move {
                assert!(!trip, "handler bug");
                Ok(json!(null))
            })
            .unwrap();

        let execution = executor
            .execute("explode", json!(true), RequestIdentity::synthetic("explode"))
            .await;
        let response = executor.into_response(execution);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(executor.store().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_invocations_are_isolated() {
        let executor = new_executor();
        ServerFnBuilder::new("tagged")
            .handler(&executor, |ctx: Arc<InvocationContext>, tag: String| async move {
                ctx.insert_header(
                    http::header::HeaderName::from_static("x-tag"),
                    HeaderValue::from_str(&tag).expect("valid header"),
                );
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(json!({"tag": tag}))
            })
            .unwrap();

        let (a, b) = tokio::join!(
            executor.execute(
                "tagged",
                json!("alpha"),
                RequestIdentity::synthetic("tagged")
            ),
            executor.execute(
                "tagged",
                json!("beta"),
                RequestIdentity::synthetic("tagged")
            ),
        );

        assert_eq!(a.headers().get("x-tag").unwrap(), "alpha");
        assert_eq!(b.headers().get("x-tag").unwrap(), "beta");
        assert!(executor.store().is_empty());
    }

    #[tokio::test]
    async fn test_handle_http_get_with_query_input() {
        let executor = new_executor();
        register_echo(&executor);

        let request = http::Request::builder()
            .method(Method::GET)
            .uri("/_rpc/echo?input=%7B%22message%22%3A%22abc%22%7D")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();

        let response = executor.handle(parts, Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(value["reversed"], "cba");
    }

    #[tokio::test]
    async fn test_handle_http_legacy_call() {
        let executor = new_executor();
        register_echo(&executor);

        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/_rpc")
            .header(CONTENT_TYPE, "application/json")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();
        let body = Bytes::from(r#"{"name": "echo", "input": {"message": "hi"}}"#);

        let response = executor.handle(parts, body).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(value["original"], "hi");
    }

    #[tokio::test]
    async fn test_handle_http_unknown_path() {
        let executor = new_executor();
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/elsewhere")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();

        let response = executor.handle(parts, Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
