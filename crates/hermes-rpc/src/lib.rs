//! Server-function RPC layer for Hermes.
//!
//! This crate turns typed async handlers into *server functions*: named
//! procedures defined once at startup and invokable identically from a
//! trusted in-process context ([`ServerFn::call`]) or over the network
//! ([`RpcClient`], resolved by the HTTP-facing [`Executor::handle`]).
//!
//! The execution pipeline for every invocation:
//!
//! ```text
//! lookup → context begin → validate → middleware chain → handler
//!        → response snapshot → guaranteed context cleanup
//! ```
//!
//! Control flow (redirects, not-found, HTTP errors) travels as
//! [`RpcError`](hermes_core::RpcError) variants and is translated into a
//! concrete response exactly once, at the executor boundary.

pub mod codec;

mod client;
mod executor;
mod function;
mod middleware;
mod registry;

pub use client::{Navigator, RpcClient, RpcClientBuilder};
pub use executor::{Execution, Executor, ExecutorOptions};
pub use function::{ErasedServerFn, RpcMethod, ServerFn, ServerFnBuilder, ServerFnDescriptor};
pub use middleware::{run_chain, FnMiddleware, Middleware, Next};
pub use registry::{RegistryError, ServerFnRegistry};
