//! HTTP transport for the Hermes server-function framework.
//!
//! Wires the RPC executor and the selective-SSR dispatcher to a Hyper
//! server: paths under the configured RPC prefix are server-function calls,
//! everything else is dispatched as a page request. Also provides server
//! configuration (with environment overrides), structured-logging setup,
//! and graceful shutdown.

mod config;
mod logging;
mod server;
mod shutdown;

pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_HTTP_ADDR, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use logging::{init_logging, LogConfig, LoggingError};
pub use server::{HttpResponse, ResponseBody, Server, ServerBuilder, ServerError};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
