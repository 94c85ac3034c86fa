//! Server configuration.
//!
//! Builder-pattern configuration for the HTTP transport, with `HERMES_*`
//! environment overrides applied via [`ServerConfigBuilder::from_env`].

use hermes_rpc::{codec, ExecutorOptions};
use std::net::SocketAddr;
use std::time::Duration;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default graceful-shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default per-request timeout in seconds (body collection and handling).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Server configuration.
///
/// # Example
///
/// ```
/// use hermes_server::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::builder()
///     .http_addr("127.0.0.1:3000")
///     .shutdown_timeout(Duration::from_secs(10))
///     .build();
///
/// assert_eq!(config.http_addr(), "127.0.0.1:3000");
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    http_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    rpc_prefix: String,
    diagnostics: bool,
    invocation_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Returns the HTTP bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the bind address as a `SocketAddr`.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Returns the graceful-shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the RPC path prefix.
    #[must_use]
    pub fn rpc_prefix(&self) -> &str {
        &self.rpc_prefix
    }

    /// Returns whether diagnostic error detail is surfaced to callers.
    #[must_use]
    pub fn diagnostics(&self) -> bool {
        self.diagnostics
    }

    /// Returns the per-invocation timeout, if configured.
    #[must_use]
    pub fn invocation_timeout(&self) -> Option<Duration> {
        self.invocation_timeout
    }

    /// Derives executor options from this configuration.
    #[must_use]
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            diagnostics: self.diagnostics,
            invocation_timeout: self.invocation_timeout,
            rpc_prefix: self.rpc_prefix.clone(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    rpc_prefix: String,
    diagnostics: bool,
    invocation_timeout: Option<Duration>,
}

impl ServerConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            rpc_prefix: codec::DEFAULT_RPC_PREFIX.to_string(),
            diagnostics: false,
            invocation_timeout: None,
        }
    }

    /// Sets the HTTP bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the graceful-shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the RPC path prefix.
    #[must_use]
    pub fn rpc_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.rpc_prefix = prefix.into();
        self
    }

    /// Surfaces internal error detail to callers. Off in production.
    #[must_use]
    pub fn diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Bounds each server-function invocation.
    #[must_use]
    pub fn invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout = Some(timeout);
        self
    }

    /// Applies `HERMES_*` environment overrides:
    /// `HERMES_HTTP_ADDR`, `HERMES_RPC_PREFIX`, `HERMES_DIAGNOSTICS`,
    /// `HERMES_INVOCATION_TIMEOUT_MS`.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if let Ok(addr) = std::env::var("HERMES_HTTP_ADDR") {
            self.http_addr = addr;
        }
        if let Ok(prefix) = std::env::var("HERMES_RPC_PREFIX") {
            self.rpc_prefix = prefix;
        }
        if let Ok(flag) = std::env::var("HERMES_DIAGNOSTICS") {
            self.diagnostics = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        if let Ok(ms) = std::env::var("HERMES_INVOCATION_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse::<u64>() {
                self.invocation_timeout = Some(Duration::from_millis(ms));
            }
        }
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            shutdown_timeout: self.shutdown_timeout,
            request_timeout: self.request_timeout,
            rpc_prefix: self.rpc_prefix,
            diagnostics: self.diagnostics,
            invocation_timeout: self.invocation_timeout,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
