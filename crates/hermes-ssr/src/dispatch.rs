//! Per-route SSR dispatch.
//!
//! The dispatcher looks up the route's configured rendering mode once per
//! request and produces the corresponding document:
//!
//! - `Full` — drive the renderer, inline deferred data that resolves within
//!   the route's bound, list the rest for the client collaborator.
//! - `ClientOnly` — never invoke the renderer; emit a shell whose bootstrap
//!   state holds only the requested URL.
//! - `DataOnly` — run only the data-acquisition phase and embed its result;
//!   no markup phase runs.
//!
//! Renderer failure is converted into a minimal 500 page; no request path
//! propagates an unhandled fault to the transport.

use crate::defer::DeferredPoll;
use crate::render::PageRenderer;
use crate::rules::{RouteSsrConfig, SsrMode, SsrRules};
use crate::shell::{
    error_page, DocumentBuilder, DEFERRED_DATA_KEY, PENDING_DATA_KEY, PREFETCHED_DATA_KEY,
    URL_KEY,
};
use bytes::Bytes;
use hermes_core::RequestIdentity;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Default bound on waiting for a deferred data dependency.
pub const DEFAULT_DEFERRED_TIMEOUT: Duration = Duration::from_millis(1000);

/// Selects and executes the rendering strategy for page requests.
///
/// # Example
///
/// ```ignore
/// let mut rules = SsrRules::new();
/// rules.add_route("/admin", RouteSsrConfig::new(SsrMode::ClientOnly));
///
/// let dispatcher = SsrDispatcher::new(Arc::new(rules), Arc::new(AppRenderer));
/// let response = dispatcher.dispatch(&identity).await;
/// ```
pub struct SsrDispatcher {
    rules: Arc<SsrRules>,
    renderer: Arc<dyn PageRenderer>,
    default_deferred_timeout: Duration,
}

impl SsrDispatcher {
    /// Creates a dispatcher over the given rules and renderer.
    #[must_use]
    pub fn new(rules: Arc<SsrRules>, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            rules,
            renderer,
            default_deferred_timeout: DEFAULT_DEFERRED_TIMEOUT,
        }
    }

    /// Overrides the default deferred-wait bound (routes may still override
    /// it per path).
    #[must_use]
    pub fn with_default_deferred_timeout(mut self, limit: Duration) -> Self {
        self.default_deferred_timeout = limit;
        self
    }

    /// Returns the rules registry.
    #[must_use]
    pub fn rules(&self) -> &Arc<SsrRules> {
        &self.rules
    }

    /// Produces the response for a page request.
    pub async fn dispatch(&self, request: &RequestIdentity) -> Response<Bytes> {
        let config = self.rules.lookup(request.path());
        tracing::debug!(path = request.path(), mode = ?config.mode, "dispatching page request");

        match config.mode {
            SsrMode::Full => self.render_full(request, config).await,
            SsrMode::ClientOnly => self.client_only(request),
            SsrMode::DataOnly => self.render_data_only(request).await,
        }
    }

    async fn render_full(
        &self,
        request: &RequestIdentity,
        config: RouteSsrConfig,
    ) -> Response<Bytes> {
        let page = match self.renderer.render(request).await {
            Ok(page) => page,
            Err(error) => {
                tracing::error!(path = request.path(), error = %error, "render routine failed");
                return html_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_page(StatusCode::INTERNAL_SERVER_ERROR, "failed to render page"),
                );
            }
        };

        let limit = config
            .deferred_timeout
            .unwrap_or(self.default_deferred_timeout);
        let mut resolved = Map::new();
        let mut pending = Vec::new();
        for mut entry in page.deferred {
            match entry.value.wait_with_timeout(limit).await {
                DeferredPoll::Ready(value) => {
                    resolved.insert(entry.key, value);
                }
                DeferredPoll::Pending => {
                    pending.push(Value::String(entry.key));
                }
                DeferredPoll::Failed(error) => {
                    tracing::warn!(key = %entry.key, error = %error, "deferred data rejected");
                    pending.push(Value::String(entry.key));
                }
            }
        }

        let mut payload = Map::new();
        payload.insert(URL_KEY.to_string(), Value::String(request.uri().to_string()));
        if !page.bootstrap.is_empty() {
            payload.insert(
                PREFETCHED_DATA_KEY.to_string(),
                Value::Object(page.bootstrap),
            );
        }
        if !resolved.is_empty() {
            payload.insert(DEFERRED_DATA_KEY.to_string(), Value::Object(resolved));
        }
        if !pending.is_empty() {
            payload.insert(PENDING_DATA_KEY.to_string(), Value::Array(pending));
        }

        let mut doc = DocumentBuilder::new("");
        doc.content(&page.html);
        doc.bootstrap(&Value::Object(payload));
        html_response(StatusCode::OK, doc.finish())
    }

    fn client_only(&self, request: &RequestIdentity) -> Response<Bytes> {
        let mut payload = Map::new();
        payload.insert(URL_KEY.to_string(), Value::String(request.uri().to_string()));

        let mut doc = DocumentBuilder::new("");
        doc.bootstrap(&Value::Object(payload));
        html_response(StatusCode::OK, doc.finish())
    }

    async fn render_data_only(&self, request: &RequestIdentity) -> Response<Bytes> {
        let data = match self.renderer.load_data(request).await {
            Ok(data) => data,
            Err(error) => {
                tracing::error!(path = request.path(), error = %error, "data-only load failed");
                return html_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_page(StatusCode::INTERNAL_SERVER_ERROR, "failed to load page data"),
                );
            }
        };

        let mut payload = Map::new();
        payload.insert(URL_KEY.to_string(), Value::String(request.uri().to_string()));
        payload.insert(PREFETCHED_DATA_KEY.to_string(), Value::Object(data));

        let mut doc = DocumentBuilder::new("");
        doc.bootstrap(&Value::Object(payload));
        html_response(StatusCode::OK, doc.finish())
    }
}

impl std::fmt::Debug for SsrDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsrDispatcher")
            .field("routes", &self.rules.len())
            .field("default_deferred_timeout", &self.default_deferred_timeout)
            .finish_non_exhaustive()
    }
}

fn html_response(status: StatusCode, body: String) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defer::Deferred;
    use crate::render::{RenderError, RenderedPage};
    use hermes_core::BoxFuture;
    use serde_json::json;

    /// Marker emitted only by the markup phase; its absence proves the
    /// renderer's markup phase never ran.
    const CONTENT_MARKER: &str = "data-rendered=\"true\"";

    struct StubRenderer {
        fail: bool,
        slow_deferred: bool,
    }

    impl StubRenderer {
        fn ok() -> Self {
            Self {
                fail: false,
                slow_deferred: false,
            }
        }
    }

    impl PageRenderer for StubRenderer {
        fn render<'a>(
            &'a self,
            request: &'a RequestIdentity,
        ) -> BoxFuture<'a, Result<RenderedPage, RenderError>> {
            Box::pin(async move {
                if self.fail {
                    return Err(RenderError::render("component tree exploded"));
                }
                let deferred = if self.slow_deferred {
                    Deferred::spawn(async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok(json!(null))
                    })
                } else {
                    Deferred::resolved(json!({"items": [1, 2]}))
                };
                Ok(RenderedPage::new(format!(
                    "<main {CONTENT_MARKER}>{}</main>",
                    request.path()
                ))
                .with_data("viewer", json!({"id": 7}))
                .with_deferred("feed", deferred))
            })
        }

        fn load_data<'a>(
            &'a self,
            _request: &'a RequestIdentity,
        ) -> BoxFuture<'a, Result<Map<String, Value>, RenderError>> {
            Box::pin(async move {
                if self.fail {
                    return Err(RenderError::data_load("loader exploded"));
                }
                let mut data = Map::new();
                data.insert("dashboard".to_string(), json!({"widgets": 3}));
                Ok(data)
            })
        }
    }

    fn page_request(path: &str) -> RequestIdentity {
        RequestIdentity::new(
            http::Method::GET,
            path.parse().expect("valid uri"),
            http::HeaderMap::new(),
        )
    }

    fn dispatcher(rules: SsrRules, renderer: StubRenderer) -> SsrDispatcher {
        SsrDispatcher::new(Arc::new(rules), Arc::new(renderer))
    }

    fn body_text(response: &Response<Bytes>) -> String {
        String::from_utf8(response.body().to_vec()).expect("utf-8 body")
    }

    #[tokio::test]
    async fn test_full_mode_renders_content_and_inlines_deferred() {
        let d = dispatcher(SsrRules::new(), StubRenderer::ok());
        let response = d.dispatch(&page_request("/home")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        let body = body_text(&response);
        assert!(body.contains(CONTENT_MARKER));
        assert!(body.contains("\"prefetchedData\""));
        assert!(body.contains("\"deferredData\""));
        assert!(!body.contains("\"pendingData\""));
    }

    #[tokio::test]
    async fn test_full_mode_lists_slow_deferred_as_pending() {
        let mut rules = SsrRules::new();
        rules.add_route(
            "/slow",
            RouteSsrConfig::new(SsrMode::Full).with_deferred_timeout(Duration::from_millis(5)),
        );
        let d = dispatcher(
            rules,
            StubRenderer {
                fail: false,
                slow_deferred: true,
            },
        );

        let response = d.dispatch(&page_request("/slow")).await;
        let body = body_text(&response);
        assert!(body.contains("\"pendingData\":[\"feed\"]"));
        assert!(!body.contains("\"deferredData\""));
    }

    #[tokio::test]
    async fn test_client_only_never_invokes_renderer() {
        let mut rules = SsrRules::new();
        rules.add_route("/admin", RouteSsrConfig::new(SsrMode::ClientOnly));
        // A failing renderer proves the mode never calls it.
        let d = dispatcher(
            rules,
            StubRenderer {
                fail: true,
                slow_deferred: false,
            },
        );

        let response = d.dispatch(&page_request("/admin")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(&response);
        assert!(body.contains("\"url\":\"/admin\""));
        assert!(!body.contains(CONTENT_MARKER));
        assert!(!body.contains("prefetchedData"));
    }

    #[tokio::test]
    async fn test_data_only_embeds_loader_data_without_markup() {
        let mut rules = SsrRules::new();
        rules.add_route("/dash", RouteSsrConfig::new(SsrMode::DataOnly));
        let d = dispatcher(rules, StubRenderer::ok());

        let response = d.dispatch(&page_request("/dash")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(&response);
        assert!(body.contains("\"dashboard\":{\"widgets\":3}"));
        assert!(!body.contains(CONTENT_MARKER));
    }

    #[tokio::test]
    async fn test_render_failure_becomes_error_page() {
        let d = dispatcher(
            SsrRules::new(),
            StubRenderer {
                fail: true,
                slow_deferred: false,
            },
        );

        let response = d.dispatch(&page_request("/broken")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(&response);
        assert!(body.contains("failed to render page"));
    }

    #[tokio::test]
    async fn test_data_only_failure_becomes_error_page() {
        let mut rules = SsrRules::new();
        rules.add_route("/dash", RouteSsrConfig::new(SsrMode::DataOnly));
        let d = dispatcher(
            rules,
            StubRenderer {
                fail: true,
                slow_deferred: false,
            },
        );

        let response = d.dispatch(&page_request("/dash")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
