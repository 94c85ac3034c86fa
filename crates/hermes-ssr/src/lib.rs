//! Selective server-side rendering for Hermes.
//!
//! Every page request is served under one of three strategies, chosen per
//! route path:
//!
//! - **Full** — drive the application's render routine and stream the
//!   resulting document, inlining deferred data that resolves within a
//!   bounded wait.
//! - **Client-only** — deliver a minimal shell embedding only the requested
//!   URL; rendering happens entirely in the client collaborator.
//! - **Data-only** — run only the render routine's data-acquisition phase
//!   and embed the loader results as bootstrap state.
//!
//! The embedded bootstrap contract (script element id and JSON keys) lives
//! in [`shell`]; the client-side hydration collaborator consumes it.

pub mod shell;

mod defer;
mod dispatch;
mod render;
mod rules;

pub use defer::{DeferError, Deferred, DeferredPoll, DeferredStatus};
pub use dispatch::{SsrDispatcher, DEFAULT_DEFERRED_TIMEOUT};
pub use render::{DeferredEntry, PageRenderer, RenderError, RenderedPage};
pub use rules::{RouteSsrConfig, SsrMode, SsrRules};
