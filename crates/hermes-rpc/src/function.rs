//! Server-function descriptors, the fluent builder, and the trusted-context
//! callable proxy.
//!
//! A server function is defined once at startup through [`ServerFnBuilder`]
//! and registered under a stable declared name. The terminal builder step
//! erases the typed handler and returns a [`ServerFn`] proxy; invoking the
//! proxy runs the executor pipeline in-process against a synthesized request
//! identity, so a trusted caller and a network caller observe identical
//! semantics.

use crate::executor::Executor;
use crate::middleware::Middleware;
use crate::registry::RegistryError;
use hermes_core::{BoxFuture, InvocationContext, RequestIdentity, RpcError, RpcResult, Validator};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Transport method for a server function.
///
/// GET functions receive their input JSON-encoded in the query string;
/// POST functions receive it in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RpcMethod {
    /// Input via query encoding.
    Get,
    /// Input via body encoding.
    #[default]
    Post,
}

impl RpcMethod {
    /// Returns the corresponding HTTP method.
    #[must_use]
    pub fn http_method(self) -> http::Method {
        match self {
            Self::Get => http::Method::GET,
            Self::Post => http::Method::POST,
        }
    }
}

/// Type-erased server-function handler.
pub type ErasedServerFn = Arc<
    dyn Fn(Arc<InvocationContext>, Value) -> BoxFuture<'static, Result<Value, RpcError>>
        + Send
        + Sync,
>;

/// One registered server function.
///
/// Created once at startup when the builder's terminal step runs; immutable
/// thereafter; looked up by name at every invocation.
pub struct ServerFnDescriptor {
    name: String,
    method: RpcMethod,
    validator: Option<Arc<dyn Validator>>,
    middlewares: Vec<Arc<dyn Middleware>>,
    handler: ErasedServerFn,
}

impl ServerFnDescriptor {
    /// Assembles a descriptor from its parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        method: RpcMethod,
        validator: Option<Arc<dyn Validator>>,
        middlewares: Vec<Arc<dyn Middleware>>,
        handler: ErasedServerFn,
    ) -> Self {
        Self {
            name: name.into(),
            method,
            validator,
            middlewares,
            handler,
        }
    }

    /// Returns the stable function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the transport method.
    #[must_use]
    pub fn method(&self) -> RpcMethod {
        self.method
    }

    /// Returns the validator, if one was attached.
    #[must_use]
    pub fn validator(&self) -> Option<&Arc<dyn Validator>> {
        self.validator.as_ref()
    }

    /// Returns the middleware chain in declaration order.
    #[must_use]
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }

    /// Invokes the erased handler.
    pub fn invoke(
        &self,
        ctx: Arc<InvocationContext>,
        input: Value,
    ) -> BoxFuture<'static, Result<Value, RpcError>> {
        (self.handler)(ctx, input)
    }
}

impl std::fmt::Debug for ServerFnDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerFnDescriptor")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("has_validator", &self.validator.is_some())
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

/// Fluent builder for server functions.
///
/// Names are explicit and stable: callers on both sides of the network
/// boundary resolve functions by name, so the name is a declared part of
/// the definition rather than something derived from definition order.
///
/// # Example
///
/// ```ignore
/// let echo = ServerFnBuilder::new("echo")
///     .validator(FnValidator::new(check_message))
///     .middleware(AuthMiddleware)
///     .handler(&executor, |_ctx, input: EchoInput| async move {
///         Ok(EchoOutput {
///             reversed: input.message.chars().rev().collect(),
///             original: input.message,
///         })
///     })?;
///
/// let out: EchoOutput = echo.call(EchoInput { message: "abc".into() }).await?;
/// ```
pub struct ServerFnBuilder {
    name: String,
    method: RpcMethod,
    validator: Option<Arc<dyn Validator>>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl ServerFnBuilder {
    /// Starts a definition under the given stable name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: RpcMethod::default(),
            validator: None,
            middlewares: Vec::new(),
        }
    }

    /// Sets the transport method (POST by default).
    #[must_use]
    pub fn method(mut self, method: RpcMethod) -> Self {
        self.method = method;
        self
    }

    /// Attaches an input validator. A later call replaces the earlier one;
    /// validators do not compose.
    #[must_use]
    pub fn validator<V: Validator>(mut self, validator: V) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Appends a middleware step. Multiple calls compose in call order.
    #[must_use]
    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Terminal step: attaches the typed handler, registers the descriptor
    /// with the executor's registry, and returns the callable proxy.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if the name is taken.
    pub fn handler<I, O, F, Fut>(
        self,
        executor: &Executor,
        func: F,
    ) -> Result<ServerFn, RegistryError>
    where
        I: DeserializeOwned + Send + 'static,
        O: Serialize + Send + 'static,
        F: Fn(Arc<InvocationContext>, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, RpcError>> + Send + 'static,
    {
        let func = Arc::new(func);
        let handler: ErasedServerFn = Arc::new(move |ctx, input| {
            let func = Arc::clone(&func);
            Box::pin(async move {
                let request: I = serde_json::from_value(input).map_err(|e| {
                    RpcError::validation(format!("input does not match the expected shape: {e}"))
                })?;
                let output = func(ctx, request).await?;
                serde_json::to_value(output).map_err(|e| {
                    RpcError::internal_with_source("failed to serialize server-function output", e)
                })
            })
        });

        let descriptor = ServerFnDescriptor::new(
            self.name.clone(),
            self.method,
            self.validator,
            self.middlewares,
            handler,
        );
        executor.registry().register(descriptor)?;

        Ok(ServerFn {
            name: self.name,
            executor: executor.clone(),
        })
    }
}

/// Callable proxy to a registered server function.
///
/// Calls from a trusted execution context go straight through the executor
/// pipeline in-process; no network hop, identical semantics.
#[derive(Clone)]
pub struct ServerFn {
    name: String,
    executor: Executor,
}

impl ServerFn {
    /// Returns the stable function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the function in-process.
    ///
    /// Control-flow signals come back as the corresponding [`RpcError`]
    /// variants: a handler redirect surfaces as `RpcError::Redirect`.
    pub async fn call<I, O>(&self, input: I) -> RpcResult<O>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let raw = serde_json::to_value(input).map_err(|e| {
            RpcError::internal_with_source("failed to serialize server-function input", e)
        })?;
        let execution = self
            .executor
            .execute(&self.name, raw, RequestIdentity::synthetic(&self.name))
            .await;
        let value = execution.into_result()?;
        serde_json::from_value(value).map_err(|e| {
            RpcError::internal_with_source("failed to deserialize server-function output", e)
        })
    }
}

impl std::fmt::Debug for ServerFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerFn").field("name", &self.name).finish()
    }
}
