//! Per-route SSR mode rules.
//!
//! The rules registry maps path patterns (literal, or templated with
//! `{name}` segments) to a rendering mode. Lookup order: exact match first,
//! then the first templated pattern whose segments match, then the default
//! (full SSR). Entries are inserted at startup and never removed, so
//! serving-time lookups read immutable state.

use std::collections::HashMap;
use std::time::Duration;

/// Rendering strategy for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SsrMode {
    /// Render the page on the server and stream the result.
    #[default]
    Full,
    /// Deliver a minimal shell; rendering is deferred to the client.
    ClientOnly,
    /// Run only the data-acquisition phase; embed the data in a shell and
    /// defer markup rendering to the client.
    DataOnly,
}

/// Per-route SSR configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSsrConfig {
    /// Rendering strategy.
    pub mode: SsrMode,
    /// Bound on how long the dispatcher waits for a deferred data
    /// dependency before streaming it later instead of inlining it.
    pub deferred_timeout: Option<Duration>,
}

impl RouteSsrConfig {
    /// Creates a config for the given mode with no deferred-wait override.
    #[must_use]
    pub const fn new(mode: SsrMode) -> Self {
        Self {
            mode,
            deferred_timeout: None,
        }
    }

    /// Sets the deferred-wait bound for this route.
    #[must_use]
    pub const fn with_deferred_timeout(mut self, limit: Duration) -> Self {
        self.deferred_timeout = Some(limit);
        self
    }
}

impl Default for RouteSsrConfig {
    fn default() -> Self {
        Self::new(SsrMode::Full)
    }
}

/// A segment of a templated path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Literal(String),
    Param(String),
}

/// A parsed path pattern with `{name}` parameter segments.
#[derive(Debug, Clone)]
struct PathPattern {
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.starts_with('{') && s.ends_with('}') {
                    PatternSegment::Param(s[1..s.len() - 1].to_string())
                } else {
                    PatternSegment::Literal(s.to_string())
                }
            })
            .collect();
        Self { segments }
    }

    fn matches(&self, path: &str) -> bool {
        let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if path_segments.len() != self.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(path_segments.iter())
            .all(|(pattern, actual)| match pattern {
                PatternSegment::Literal(expected) => expected == actual,
                PatternSegment::Param(_) => true,
            })
    }
}

/// Registry of per-route SSR configurations.
///
/// # Example
///
/// ```
/// use hermes_ssr::{RouteSsrConfig, SsrMode, SsrRules};
///
/// let mut rules = SsrRules::new();
/// rules.add_route("/admin", RouteSsrConfig::new(SsrMode::ClientOnly));
/// rules.add_route("/users/{userId}", RouteSsrConfig::new(SsrMode::DataOnly));
///
/// assert_eq!(rules.lookup("/admin").mode, SsrMode::ClientOnly);
/// assert_eq!(rules.lookup("/users/42").mode, SsrMode::DataOnly);
/// assert_eq!(rules.lookup("/elsewhere").mode, SsrMode::Full);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SsrRules {
    exact: HashMap<String, RouteSsrConfig>,
    patterns: Vec<(PathPattern, RouteSsrConfig)>,
}

impl SsrRules {
    /// Creates an empty rules registry (every path defaults to full SSR).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route pattern.
    ///
    /// Patterns containing `{name}` segments are templated; anything else
    /// is an exact path. Templated patterns are tried in registration
    /// order; first match wins.
    pub fn add_route(&mut self, pattern: impl AsRef<str>, config: RouteSsrConfig) {
        let pattern = pattern.as_ref();
        if pattern.contains('{') {
            self.patterns.push((PathPattern::parse(pattern), config));
        } else {
            self.exact.insert(normalize(pattern), config);
        }
    }

    /// Looks up the configuration for a request path.
    #[must_use]
    pub fn lookup(&self, path: &str) -> RouteSsrConfig {
        if let Some(config) = self.exact.get(&normalize(path)) {
            return *config;
        }
        self.patterns
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, config)| *config)
            .unwrap_or_default()
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
