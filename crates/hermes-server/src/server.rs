//! HTTP server.
//!
//! The transport delivers raw requests to the RPC executor and the SSR
//! dispatcher: paths under the RPC prefix are server-function calls,
//! everything else is a page request. Built on Hyper and Tokio with
//! graceful shutdown.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpListener;

use hermes_core::{RequestIdentity, RpcError};
use hermes_rpc::Executor;
use hermes_ssr::SsrDispatcher;

use crate::config::ServerConfig;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Type alias for the HTTP response body at the hyper boundary.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response at the hyper boundary.
pub type HttpResponse = Response<ResponseBody>;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("bind error: {0}")]
    Bind(String),
    /// I/O failure in the accept loop.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The Hermes HTTP server.
///
/// # Example
///
/// ```rust,ignore
/// let executor = Executor::with_options(registry, store, config.executor_options());
/// // ... register server functions against `executor` ...
///
/// let server = Server::builder(executor)
///     .config(config)
///     .dispatcher(dispatcher)
///     .build();
/// server.run().await?;
/// ```
pub struct Server {
    config: ServerConfig,
    executor: Executor,
    dispatcher: Option<Arc<SsrDispatcher>>,
}

impl Server {
    /// Creates a server builder around an executor.
    #[must_use]
    pub fn builder(executor: Executor) -> ServerBuilder {
        ServerBuilder {
            config: ServerConfig::default(),
            executor,
            dispatcher: None,
        }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the RPC executor.
    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Runs the server until an OS shutdown signal arrives.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Runs the server with a caller-controlled shutdown signal.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.config.socket_addr().map_err(|e| {
            ServerError::Bind(format!("invalid address '{}': {e}", self.config.http_addr()))
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("failed to bind {addr}: {e}")))?;

        tracing::info!(%addr, "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                    tracing::error!(%remote_addr, error = %e, "connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to accept connection");
                        }
                    }
                }
                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received, stopping accept loop");
                    break;
                }
            }
        }

        let drain_timeout = server.config.shutdown_timeout();
        tracing::info!(
            connections = tracker.active_connections(),
            timeout = ?drain_timeout,
            "draining connections"
        );
        tokio::select! {
            () = tracker.wait_for_idle() => {
                tracing::info!("all connections closed");
            }
            () = tokio::time::sleep(drain_timeout) => {
                tracing::warn!(
                    connections = tracker.active_connections(),
                    "shutdown timeout reached with connections still active"
                );
            }
        }

        tracing::info!("server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: tokio::net::TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(req).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);

        tokio::select! {
            result = conn => result,
            () = shutdown.recv() => {
                tracing::debug!(%remote_addr, "connection closed due to shutdown");
                Ok(())
            }
        }
    }

    /// Handles one HTTP request. Every path yields a well-formed response.
    async fn handle_request(
        self: &Arc<Self>,
        req: Request<Incoming>,
    ) -> Result<HttpResponse, Infallible> {
        let (parts, body) = req.into_parts();
        tracing::debug!(method = %parts.method, path = parts.uri.path(), "request");

        let collected =
            tokio::time::timeout(self.config.request_timeout(), body.collect()).await;
        let body = match collected {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "failed to read request body");
                return Ok(error_response(
                    StatusCode::BAD_REQUEST,
                    RpcError::validation("failed to read request body"),
                ));
            }
            Err(_) => {
                tracing::warn!("request body collection timed out");
                return Ok(error_response(
                    StatusCode::REQUEST_TIMEOUT,
                    RpcError::http(StatusCode::REQUEST_TIMEOUT, "request body timed out"),
                ));
            }
        };

        let response = if self.is_rpc_path(parts.uri.path()) {
            self.executor.handle(parts, body).await
        } else if let Some(dispatcher) = &self.dispatcher {
            let identity = RequestIdentity::new(
                parts.method.clone(),
                parts.uri.clone(),
                parts.headers.clone(),
            );
            dispatcher.dispatch(&identity).await
        } else {
            let path = parts.uri.path();
            return Ok(error_response(
                StatusCode::NOT_FOUND,
                RpcError::not_found(format!("no route for '{path}'")),
            ));
        };

        Ok(response.map(Full::new))
    }

    fn is_rpc_path(&self, path: &str) -> bool {
        let prefix = self.config.rpc_prefix();
        path == prefix || path.starts_with(&format!("{prefix}/"))
    }
}

fn error_response(status: StatusCode, error: RpcError) -> HttpResponse {
    let envelope = error.to_envelope(false);
    let body = serde_json::to_vec(&envelope).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}

/// Builder for [`Server`].
pub struct ServerBuilder {
    config: ServerConfig,
    executor: Executor,
    dispatcher: Option<Arc<SsrDispatcher>>,
}

impl ServerBuilder {
    /// Sets the server configuration.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Mounts the SSR dispatcher for non-RPC paths. Without one, page
    /// requests get a 404 envelope.
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: SsrDispatcher) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    /// Mounts a shared SSR dispatcher.
    #[must_use]
    pub fn shared_dispatcher(mut self, dispatcher: Arc<SsrDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        Server {
            config: self.config,
            executor: self.executor,
            dispatcher: self.dispatcher,
        }
    }
}
