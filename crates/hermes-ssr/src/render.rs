//! Renderer collaborator interface.
//!
//! The dispatcher never renders markup itself; it drives a [`PageRenderer`]
//! supplied by the application. `render` is the full routine (markup plus
//! bootstrap data plus any deferred dependencies); `load_data` is the
//! data-acquisition phase alone, used by data-only routes.

use crate::defer::Deferred;
use hermes_core::{BoxFuture, RequestIdentity};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from the render routine.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The markup-producing phase failed.
    #[error("render failed: {message}")]
    Render {
        /// What went wrong.
        message: String,
    },
    /// The data-acquisition phase failed.
    #[error("data load failed: {message}")]
    DataLoad {
        /// What went wrong.
        message: String,
    },
}

impl RenderError {
    /// Creates a markup-phase failure.
    #[must_use]
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Creates a data-phase failure.
    #[must_use]
    pub fn data_load(message: impl Into<String>) -> Self {
        Self::DataLoad {
            message: message.into(),
        }
    }
}

/// A deferred data dependency keyed for the client collaborator.
#[derive(Debug)]
pub struct DeferredEntry {
    /// Loader key the client resolves this value under.
    pub key: String,
    /// The in-flight computation.
    pub value: Deferred<Value>,
}

impl DeferredEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(key: impl Into<String>, value: Deferred<Value>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Output of a full render.
#[derive(Debug, Default)]
pub struct RenderedPage {
    /// Rendered markup for the document body.
    pub html: String,
    /// Loader key → result map, embedded as prefetched bootstrap state.
    pub bootstrap: Map<String, Value>,
    /// Data dependencies that may resolve after the markup is ready.
    pub deferred: Vec<DeferredEntry>,
}

impl RenderedPage {
    /// Creates a page with markup only.
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            bootstrap: Map::new(),
            deferred: Vec::new(),
        }
    }

    /// Adds a prefetched bootstrap entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.bootstrap.insert(key.into(), value);
        self
    }

    /// Adds a deferred data dependency.
    #[must_use]
    pub fn with_deferred(mut self, key: impl Into<String>, value: Deferred<Value>) -> Self {
        self.deferred.push(DeferredEntry::new(key, value));
        self
    }
}

/// The application's render routine.
///
/// Implementations must support being driven in two ways: the full render
/// (markup + data) and the data-only phase, which acquires loader results
/// without producing any markup.
pub trait PageRenderer: Send + Sync + 'static {
    /// Renders the page for the given request.
    fn render<'a>(
        &'a self,
        request: &'a RequestIdentity,
    ) -> BoxFuture<'a, Result<RenderedPage, RenderError>>;

    /// Runs only the data-acquisition phase, returning the loader key →
    /// result map to embed as bootstrap state.
    fn load_data<'a>(
        &'a self,
        request: &'a RequestIdentity,
    ) -> BoxFuture<'a, Result<Map<String, Value>, RenderError>>;
}
