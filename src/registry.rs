//! Handle registry: opaque handles to open store connections.
//!
//! Owned by the operation glue and passed in at construction, so independent
//! glue instances (and tests) never share connections.

use crate::store::DocumentStore;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// Opaque reference to a registered store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(Uuid);

impl Handle {
    fn generate() -> Self {
        Handle(Uuid::new_v4())
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Handle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Handle)
    }
}

struct Registered {
    name: String,
    store: Arc<dyn DocumentStore>,
}

#[derive(Default)]
pub struct HandleRegistry {
    stores: RwLock<HashMap<Handle, Registered>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` under a fresh handle.
    pub fn register(&self, name: impl Into<String>, store: Arc<dyn DocumentStore>) -> Handle {
        let handle = Handle::generate();
        let name = name.into();
        tracing::info!(
            "Registered {} store '{}' as {}",
            store.store_type(),
            name,
            handle
        );
        self.stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, Registered { name, store });
        handle
    }

    pub fn get(&self, handle: &Handle) -> Option<Arc<dyn DocumentStore>> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .map(|r| Arc::clone(&r.store))
    }

    /// Name the store was registered under.
    pub fn name(&self, handle: &Handle) -> Option<String> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .map(|r| r.name.clone())
    }

    /// Drop the registry's reference to the store. Returns false for an
    /// unknown handle. Operations already holding the store finish normally.
    pub fn close(&self, handle: &Handle) -> bool {
        let removed = self
            .stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(handle);
        match removed {
            Some(registered) => {
                tracing::info!("Closed store '{}' ({})", registered.name, handle);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.stores.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_register_get_close() {
        let registry = HandleRegistry::new();
        assert!(registry.is_empty());

        let handle = registry.register("scratch", Arc::new(MemoryStore::new()));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&handle).is_some());
        assert_eq!(registry.name(&handle).as_deref(), Some("scratch"));

        assert!(registry.close(&handle));
        assert!(registry.get(&handle).is_none());
        assert!(!registry.close(&handle));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handles_are_distinct() {
        let registry = HandleRegistry::new();
        let a = registry.register("a", Arc::new(MemoryStore::new()));
        let b = registry.register("b", Arc::new(MemoryStore::new()));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_handle_parses_from_display() {
        let registry = HandleRegistry::new();
        let handle = registry.register("a", Arc::new(MemoryStore::new()));
        let parsed: Handle = handle.to_string().parse().unwrap();
        assert_eq!(parsed, handle);
        assert!("not-a-handle".parse::<Handle>().is_err());
    }

    #[test]
    fn test_closed_store_outlives_registry_entry() {
        let registry = HandleRegistry::new();
        let handle = registry.register("a", Arc::new(MemoryStore::new()));
        let store = registry.get(&handle).unwrap();
        registry.close(&handle);
        assert_eq!(store.store_type(), "memory");
    }
}
