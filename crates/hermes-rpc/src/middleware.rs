//! Middleware chain for server-function execution.
//!
//! Middleware are named async steps that run between input validation and
//! the handler. Each step receives the data currently bound for the handler
//! and a [`Next`] continuation; calling `next` with transformed data is how
//! a step injects or replaces what later steps (and ultimately the handler)
//! see. Declared order is execution order.
//!
//! A step that returns `Err` aborts the chain immediately: later steps and
//! the handler never run, and the error propagates to the executor, which
//! translates it into a response. Steps may also mutate the response
//! headers/status through the [`InvocationContext`].

use hermes_core::{BoxFuture, InvocationContext, RpcError};
use serde_json::Value;
use std::sync::Arc;

/// A named middleware step.
///
/// # Invariants
///
/// - A step MUST call `next.run()` exactly once unless it is failing.
/// - A step MUST NOT suppress errors from later steps.
///
/// # Example
///
/// ```ignore
/// struct AuthMiddleware;
///
/// impl Middleware for AuthMiddleware {
///     fn name(&self) -> &'static str {
///         "auth"
///     }
///
///     fn process<'a>(
///         &'a self,
///         ctx: &'a Arc<InvocationContext>,
///         input: Value,
///         next: Next<'a>,
///     ) -> BoxFuture<'a, Result<Value, RpcError>> {
///         Box::pin(async move {
///             if ctx.identity().header("authorization").is_none() {
///                 return Err(RpcError::http(StatusCode::UNAUTHORIZED, "missing token"));
///             }
///             next.run(ctx, input).await
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this step, used for logging.
    fn name(&self) -> &'static str;

    /// Processes the data flowing toward the handler.
    fn process<'a>(
        &'a self,
        ctx: &'a Arc<InvocationContext>,
        input: Value,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Value, RpcError>>;
}

/// Continuation over the remaining middleware chain.
///
/// Consumed by `run` so a step can only advance the chain once. When the
/// chain is exhausted, `run` yields the accumulated data back unchanged;
/// the executor then hands it to the handler.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(remaining: &'a [Arc<dyn Middleware>]) -> Self {
        Self { remaining }
    }

    /// Invokes the next step in the chain with the given data.
    pub async fn run(
        self,
        ctx: &Arc<InvocationContext>,
        input: Value,
    ) -> Result<Value, RpcError> {
        match self.remaining.split_first() {
            Some((step, rest)) => {
                tracing::trace!(middleware = step.name(), "entering middleware");
                step.process(ctx, input, Next::new(rest)).await
            }
            None => Ok(input),
        }
    }
}

/// Runs a middleware chain to completion.
///
/// Steps execute strictly in declaration order; the final data (what the
/// handler should receive) is returned. The first step to fail aborts the
/// chain and its error is returned.
pub async fn run_chain(
    chain: &[Arc<dyn Middleware>],
    ctx: &Arc<InvocationContext>,
    input: Value,
) -> Result<Value, RpcError> {
    Next::new(chain).run(ctx, input).await
}

/// A middleware built from a function.
///
/// The function must return a boxed future so it can borrow the context and
/// the continuation. Plain `fn` items with explicit lifetimes work best:
///
/// ```ignore
/// fn stamp<'a>(
///     ctx: &'a Arc<InvocationContext>,
///     input: Value,
///     next: Next<'a>,
/// ) -> BoxFuture<'a, Result<Value, RpcError>> {
///     Box::pin(async move { next.run(ctx, input).await })
/// }
///
/// let middleware = FnMiddleware::new("stamp", stamp);
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    #[must_use]
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(
            &'a Arc<InvocationContext>,
            Value,
            Next<'a>,
        ) -> BoxFuture<'a, Result<Value, RpcError>>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a Arc<InvocationContext>,
        input: Value,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Value, RpcError>> {
        (self.func)(ctx, input, next)
    }
}
