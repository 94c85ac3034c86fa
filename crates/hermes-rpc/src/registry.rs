//! Name-keyed registry of server-function descriptors.
//!
//! The registry is write-once-at-startup, read-many-during-serving: every
//! definition registers under its stable declared name before the transport
//! starts accepting calls, and lookups never mutate.

use crate::function::ServerFnDescriptor;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised during server-function registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A function with this name is already registered. Names must be
    /// stable and unique so callers on either side of the network boundary
    /// agree on them without coordination.
    #[error("server function '{name}' is already registered")]
    DuplicateName {
        /// The conflicting name.
        name: String,
    },
}

/// Registry mapping stable function names to descriptors.
///
/// # Example
///
/// ```
/// use hermes_rpc::ServerFnRegistry;
///
/// let registry = ServerFnRegistry::new();
/// assert!(registry.is_empty());
/// assert!(registry.lookup("missing").is_none());
/// ```
#[derive(Debug, Default)]
pub struct ServerFnRegistry {
    entries: DashMap<String, Arc<ServerFnDescriptor>>,
}

impl ServerFnRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor under its name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if the name is taken.
    pub fn register(&self, descriptor: ServerFnDescriptor) -> Result<(), RegistryError> {
        let name = descriptor.name().to_string();
        match self.entries.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(RegistryError::DuplicateName { name })
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                tracing::debug!(function = %name, "registered server function");
                slot.insert(Arc::new(descriptor));
                Ok(())
            }
        }
    }

    /// Looks up a descriptor by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<ServerFnDescriptor>> {
        self.entries.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns `true` if a function with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the registered names, in no particular order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    /// Returns the number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{ErasedServerFn, RpcMethod, ServerFnDescriptor};

    fn descriptor(name: &str) -> ServerFnDescriptor {
        let handler: ErasedServerFn =
            Arc::new(|_ctx, input| Box::pin(async move { Ok(input) }));
        ServerFnDescriptor::new(name, RpcMethod::Post, None, Vec::new(), handler)
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ServerFnRegistry::new();
        registry.register(descriptor("echo")).unwrap();

        assert!(registry.contains("echo"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("echo").unwrap().name(), "echo");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = ServerFnRegistry::new();
        registry.register(descriptor("echo")).unwrap();

        let err = registry.register(descriptor("echo")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { name } if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names() {
        let registry = ServerFnRegistry::new();
        registry.register(descriptor("a")).unwrap();
        registry.register(descriptor("b")).unwrap();

        let mut names = registry.names();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }
}
