//! Error taxonomy and control-flow signals for Hermes.
//!
//! This module provides [`RpcError`], the single error type that flows out of
//! validators, middleware, and handlers. Three of its variants are not
//! failures at all but *control-flow signals* ([`RpcError::Redirect`],
//! [`RpcError::NotFound`], [`RpcError::Http`]): a handler raises them to
//! shape the response, and the executor consumes them exactly once with an
//! exhaustive match. Modeling signals as enum variants keeps the response
//! mapping statically checkable instead of relying on a catch-chain.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`RpcError`].
pub type RpcResult<T> = Result<T, RpcError>;

/// The error and control-signal type for server-function execution.
///
/// Raised from anywhere in the validator/middleware/handler chain and
/// consumed exactly once at the executor boundary.
///
/// # Example
///
/// ```
/// use hermes_core::RpcError;
///
/// fn load_report(id: &str) -> Result<String, RpcError> {
///     if id.is_empty() {
///         return Err(RpcError::not_found("no such report"));
///     }
///     Ok(format!("report {id}"))
/// }
/// ```
#[derive(Error, Debug)]
pub enum RpcError {
    /// Input failed validation.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable error message.
        message: String,
        /// Per-field validation failures.
        #[source]
        field_errors: Option<FieldErrors>,
    },

    /// Function or resource not found.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// Redirect signal. Not a failure: the caller's navigation state should
    /// move to `location`.
    #[error("Redirect to {location}")]
    Redirect {
        /// Target URL.
        location: String,
        /// Redirect status (302 by default).
        status: StatusCode,
    },

    /// Arbitrary HTTP error with an explicit status (auth failures, rate
    /// limits, and anything else middleware wants to surface directly).
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status.
        status: StatusCode,
        /// Human-readable error message.
        message: String,
    },

    /// Unclassified internal error. The message is only surfaced to callers
    /// in diagnostic mode; the source is logged server-side.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (never exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl RpcError {
    /// Creates a validation error with a message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    /// Creates a validation error with per-field details.
    #[must_use]
    pub fn validation_with_fields(message: impl Into<String>, field_errors: FieldErrors) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: Some(field_errors),
        }
    }

    /// Creates a not-found signal.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a redirect signal with status 302 Found.
    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
            status: StatusCode::FOUND,
        }
    }

    /// Creates a redirect signal with an explicit status (e.g. 303).
    #[must_use]
    pub fn redirect_with_status(location: impl Into<String>, status: StatusCode) -> Self {
        Self::Redirect {
            location: location.into(),
            status,
        }
    }

    /// Creates an HTTP error signal with an explicit status.
    #[must_use]
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the HTTP status code for this error or signal.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Redirect { status, .. } | Self::Http { status, .. } => *status,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Redirect { .. } => "REDIRECT",
            Self::Http { .. } => "HTTP_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Returns `true` for control-flow signals (redirects) as opposed to
    /// genuine failures.
    #[must_use]
    pub fn is_signal(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }

    /// Converts this error to a serializable envelope.
    ///
    /// With `diagnostics` off, internal errors are replaced by a generic
    /// message; everything the caller is allowed to see stays intact.
    #[must_use]
    pub fn to_envelope(&self, diagnostics: bool) -> ErrorEnvelope {
        let message = match self {
            Self::Internal { message, .. } if diagnostics => message.clone(),
            Self::Internal { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let details = match self {
            Self::Validation {
                field_errors: Some(errors),
                ..
            } => serde_json::to_value(errors).ok(),
            _ => None,
        };
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                details,
            },
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::validation(format!("malformed JSON input: {err}"))
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Path to the offending field (e.g. `"message"` or `"user.email"`).
    pub path: String,
    /// What went wrong.
    pub message: String,
}

/// Ordered collection of field-level validation failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Error)]
#[error("field validation errors")]
pub struct FieldErrors {
    /// The individual failures, in the order they were recorded.
    pub errors: Vec<FieldError>,
}

impl FieldErrors {
    /// Creates a new empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure for a field path.
    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Returns `true` if no failures were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` if any failure targets the given path.
    #[must_use]
    pub fn contains_path(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (per-field validation errors).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
