//! Deferred values: async computations with a bounded wait.
//!
//! A [`Deferred`] wraps an in-flight computation with an observable status.
//! [`Deferred::wait_with_timeout`] either returns the resolved value,
//! surfaces the rejection, or reports "not yet available" without blocking
//! past the bound — the dispatcher uses it to decide whether a slow data
//! dependency is inlined into the initial document or left for the client
//! to pick up later.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Observable status of a deferred computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredStatus {
    /// Still running (or finished but not yet observed).
    Pending,
    /// Observed to have resolved.
    Resolved,
    /// Observed to have failed.
    Rejected,
}

/// Errors from deferred computations.
#[derive(Debug, Error)]
pub enum DeferError {
    /// The computation itself failed.
    #[error("deferred computation failed: {message}")]
    Failed {
        /// What went wrong.
        message: String,
    },
    /// The computation's task was cancelled or panicked.
    #[error("deferred computation was cancelled")]
    Cancelled,
    /// The value was already taken by an earlier wait.
    #[error("deferred value already consumed")]
    Consumed,
}

impl DeferError {
    /// Creates a failure with a message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Result of a bounded wait on a deferred value.
#[derive(Debug)]
pub enum DeferredPoll<T> {
    /// The computation resolved within the bound.
    Ready(T),
    /// The computation failed within the bound.
    Failed(DeferError),
    /// Not yet available; the value may still resolve later.
    Pending,
}

enum Inner<T> {
    Task(JoinHandle<Result<T, DeferError>>),
    Settled(Option<Result<T, DeferError>>),
}

/// An asynchronous result whose resolution may outlive the initial
/// response.
///
/// # Example
///
/// ```
/// use hermes_ssr::{Deferred, DeferredPoll};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut fast = Deferred::spawn(async { Ok(42) });
/// match fast.wait_with_timeout(Duration::from_secs(1)).await {
///     DeferredPoll::Ready(n) => assert_eq!(n, 42),
///     other => panic!("expected ready, got {other:?}"),
/// }
/// # }
/// ```
pub struct Deferred<T> {
    inner: Inner<T>,
    status: DeferredStatus,
}

impl<T: Send + 'static> Deferred<T> {
    /// Spawns the computation onto the runtime.
    #[must_use]
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, DeferError>> + Send + 'static,
    {
        Self {
            inner: Inner::Task(tokio::spawn(future)),
            status: DeferredStatus::Pending,
        }
    }

    /// Wraps an already-resolved value.
    #[must_use]
    pub fn resolved(value: T) -> Self {
        Self {
            inner: Inner::Settled(Some(Ok(value))),
            status: DeferredStatus::Resolved,
        }
    }

    /// Wraps an already-rejected computation.
    #[must_use]
    pub fn rejected(error: DeferError) -> Self {
        Self {
            inner: Inner::Settled(Some(Err(error))),
            status: DeferredStatus::Rejected,
        }
    }

    /// Returns the observed status.
    #[must_use]
    pub fn status(&self) -> DeferredStatus {
        self.status
    }

    /// Waits for the value, but never longer than `limit`.
    ///
    /// Returns [`DeferredPoll::Pending`] when the bound elapses first; the
    /// computation keeps running and a later wait can still observe it.
    pub async fn wait_with_timeout(&mut self, limit: Duration) -> DeferredPoll<T> {
        if let Inner::Settled(slot) = &mut self.inner {
            return match slot.take() {
                Some(Ok(value)) => {
                    self.status = DeferredStatus::Resolved;
                    DeferredPoll::Ready(value)
                }
                Some(Err(error)) => {
                    self.status = DeferredStatus::Rejected;
                    DeferredPoll::Failed(error)
                }
                None => DeferredPoll::Failed(DeferError::Consumed),
            };
        }

        let Inner::Task(handle) = &mut self.inner else {
            return DeferredPoll::Failed(DeferError::Consumed);
        };
        match tokio::time::timeout(limit, &mut *handle).await {
            Err(_) => DeferredPoll::Pending,
            Ok(joined) => {
                self.inner = Inner::Settled(None);
                match joined {
                    Ok(Ok(value)) => {
                        self.status = DeferredStatus::Resolved;
                        DeferredPoll::Ready(value)
                    }
                    Ok(Err(error)) => {
                        self.status = DeferredStatus::Rejected;
                        DeferredPoll::Failed(error)
                    }
                    Err(join_error) => {
                        self.status = DeferredStatus::Rejected;
                        let error = if join_error.is_cancelled() {
                            DeferError::Cancelled
                        } else {
                            DeferError::failed(join_error.to_string())
                        };
                        DeferredPoll::Failed(error)
                    }
                }
            }
        }
    }

    /// Waits for the value without a bound.
    pub async fn wait(mut self) -> Result<T, DeferError> {
        match self.inner {
            Inner::Settled(ref mut slot) => slot.take().unwrap_or(Err(DeferError::Consumed)),
            Inner::Task(handle) => match handle.await {
                Ok(result) => result,
                Err(join_error) if join_error.is_cancelled() => Err(DeferError::Cancelled),
                Err(join_error) => Err(DeferError::failed(join_error.to_string())),
            },
        }
    }
}

impl<T> std::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
