//! Validator adapter.
//!
//! Normalizes "something that can check input" into a single parse-or-fail
//! contract: [`Validator::validate`] takes the raw decoded input and either
//! returns the (possibly normalized) value or fails with
//! [`RpcError::Validation`] carrying per-field details. Validators have no
//! side effects.

use crate::error::RpcError;
use serde_json::Value;

/// A parse-or-fail input validator.
///
/// Implementations receive the raw input as decoded JSON and must either
/// hand back the value that should flow onward to middleware and the
/// handler, or fail with a validation error.
///
/// # Example
///
/// ```
/// use hermes_core::{FieldErrors, FnValidator, RpcError, Validator};
/// use serde_json::{json, Value};
///
/// let non_empty_message = FnValidator::new(|raw: Value| {
///     let mut fields = FieldErrors::new();
///     match raw.get("message").and_then(Value::as_str) {
///         Some(m) if !m.is_empty() => return Ok(raw),
///         Some(_) => fields.add("message", "must not be empty"),
///         None => fields.add("message", "required"),
///     }
///     Err(RpcError::validation_with_fields("invalid input", fields))
/// });
///
/// assert!(non_empty_message.validate(json!({"message": "hi"})).is_ok());
/// assert!(non_empty_message.validate(json!({"message": ""})).is_err());
/// ```
pub trait Validator: Send + Sync + 'static {
    /// Validates raw input, returning the value to pass onward.
    fn validate(&self, raw: Value) -> Result<Value, RpcError>;
}

/// A validator built from a plain function or closure.
pub struct FnValidator<F> {
    func: F,
}

impl<F> FnValidator<F>
where
    F: Fn(Value) -> Result<Value, RpcError> + Send + Sync + 'static,
{
    /// Wraps a closure as a [`Validator`].
    #[must_use]
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Validator for FnValidator<F>
where
    F: Fn(Value) -> Result<Value, RpcError> + Send + Sync + 'static,
{
    fn validate(&self, raw: Value) -> Result<Value, RpcError> {
        (self.func)(raw)
    }
}
