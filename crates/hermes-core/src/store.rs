//! Process-wide registry of in-flight invocation contexts.
//!
//! The [`ContextStore`] maps each active invocation's id to its
//! [`InvocationContext`]. Every invocation gets its own key; there is no
//! shared "current context" slot, so concurrent invocations cannot observe
//! or overwrite each other's state.
//!
//! Cleanup is guaranteed by RAII: [`ContextStore::begin`] returns a
//! [`ContextGuard`] whose `Drop` removes the entry, so the slot is freed on
//! every exit path — success, validation failure, control signal, error,
//! or panic.

use crate::context::{InvocationContext, InvocationId, RequestIdentity};
use dashmap::DashMap;
use std::sync::Arc;

/// Registry of in-flight invocation contexts, keyed per invocation.
///
/// The store itself is explicit injectable state: the executor owns an
/// `Arc<ContextStore>` and threads contexts through the pipeline as
/// explicit parameters, while the store lets the transport look up an
/// invocation's accumulated response metadata by id.
///
/// # Example
///
/// ```
/// use hermes_core::{ContextStore, RequestIdentity};
/// use std::sync::Arc;
///
/// let store = Arc::new(ContextStore::new());
/// {
///     let guard = store.begin(RequestIdentity::synthetic("echo"));
///     assert_eq!(store.active(), 1);
///     assert!(store.get(guard.context().id()).is_some());
/// }
/// // guard dropped: slot freed
/// assert_eq!(store.active(), 0);
/// ```
#[derive(Debug, Default)]
pub struct ContextStore {
    entries: DashMap<InvocationId, Arc<InvocationContext>>,
}

impl ContextStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh context for one invocation.
    ///
    /// Returns a guard that removes the entry when dropped.
    #[must_use]
    pub fn begin(self: &Arc<Self>, identity: RequestIdentity) -> ContextGuard {
        let ctx = Arc::new(InvocationContext::new(identity));
        self.entries.insert(ctx.id(), Arc::clone(&ctx));
        ContextGuard {
            store: Arc::clone(self),
            ctx,
        }
    }

    /// Looks up an in-flight context by id.
    #[must_use]
    pub fn get(&self, id: InvocationId) -> Option<Arc<InvocationContext>> {
        self.entries.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the number of in-flight invocations.
    #[must_use]
    pub fn active(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no invocation is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&self, id: InvocationId) {
        self.entries.remove(&id);
    }
}

/// RAII handle to one registered invocation context.
///
/// Dropping the guard removes the context from the store. The guard is held
/// by the executor for the full duration of the pipeline, which is what
/// makes the "cleanup on every exit path" contract hold.
#[derive(Debug)]
pub struct ContextGuard {
    store: Arc<ContextStore>,
    ctx: Arc<InvocationContext>,
}

impl ContextGuard {
    /// Returns the context registered by this guard.
    #[must_use]
    pub fn context(&self) -> &Arc<InvocationContext> {
        &self.ctx
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.store.remove(self.ctx.id());
    }
}
