//! # Hermes
//!
//! **Server-function RPC framework with selective server-side rendering.**
//!
//! Hermes turns typed async handlers into *server functions* — procedures
//! defined once and callable identically from a trusted in-process context
//! or over a network boundary — and serves page requests through a
//! per-route rendering dispatcher (full, client-only, or data-only SSR).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hermes::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder().from_env().build();
//!     let executor = Executor::with_options(
//!         Arc::new(ServerFnRegistry::new()),
//!         Arc::new(ContextStore::new()),
//!         config.executor_options(),
//!     );
//!
//!     let echo = ServerFnBuilder::new("echo")
//!         .handler(&executor, |_ctx, message: String| async move {
//!             Ok(message.chars().rev().collect::<String>())
//!         })?;
//!
//!     let mut rules = SsrRules::new();
//!     rules.add_route("/admin", RouteSsrConfig::new(SsrMode::ClientOnly));
//!
//!     let server = Server::builder(executor)
//!         .config(config)
//!         .dispatcher(SsrDispatcher::new(Arc::new(rules), Arc::new(AppRenderer)))
//!         .build();
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Execution pipeline
//!
//! ```text
//! Request → lookup → context begin → validate → middleware → handler
//!                                                                ↓
//! Response ← signal mapping ← response snapshot ← context cleanup
//! ```

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use hermes_core as core;

// Re-export the RPC layer
pub use hermes_rpc as rpc;

// Re-export selective SSR
pub use hermes_ssr as ssr;

// Re-export the HTTP transport
pub use hermes_server as server;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use hermes::prelude::*;
/// ```
pub mod prelude {
    pub use hermes_core::{
        ContextStore, FieldErrors, FnValidator, InvocationContext, InvocationId,
        RequestIdentity, RpcError, RpcResult, Validator,
    };

    pub use hermes_rpc::{
        Executor, ExecutorOptions, FnMiddleware, Middleware, Navigator, Next, RpcClient,
        RpcMethod, ServerFn, ServerFnBuilder, ServerFnRegistry,
    };

    pub use hermes_ssr::{
        Deferred, DeferredPoll, PageRenderer, RenderError, RenderedPage, RouteSsrConfig,
        SsrDispatcher, SsrMode, SsrRules,
    };

    pub use hermes_server::{
        init_logging, LogConfig, Server, ServerConfig, ShutdownSignal,
    };
}
