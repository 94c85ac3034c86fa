//! Core types and traits for the Hermes server-function framework.
//!
//! This crate defines the shared vocabulary the rest of the workspace builds
//! on:
//!
//! - [`RpcError`] — the error taxonomy and control-flow signals (redirect,
//!   not-found, HTTP error) raised from validators, middleware, and handlers
//!   and consumed exactly once at the executor boundary.
//! - [`InvocationContext`] / [`ContextStore`] — per-call mutable state
//!   (response status and headers) registered under a unique per-invocation
//!   key with guaranteed RAII cleanup.
//! - [`Validator`] — the parse-or-fail input validation contract.

mod context;
mod error;
mod store;
mod validate;

pub use context::{InvocationContext, InvocationId, RequestIdentity};
pub use error::{ErrorDetail, ErrorEnvelope, FieldError, FieldErrors, RpcError, RpcResult};
pub use store::{ContextGuard, ContextStore};
pub use validate::{FnValidator, Validator};

use std::future::Future;
use std::pin::Pin;

/// A boxed future, used at trait-object seams throughout the workspace.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
