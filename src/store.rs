//! Authoritative owner of the per-window forests.
//!
//! The store pairs the exclusion lock with the persistence adapter. Reads
//! and writes take an [`ExclusionGuard`], so they can only happen from
//! inside an exclusive body.

use crate::error::StoreError;
use crate::exclusion::{ExclusionGuard, ExclusionLock};
use crate::forest::Collection;
use crate::persistence::{KeyValueStore, PersistenceAdapter};
use std::future::Future;

/// Hierarchy store: one instance per process, shared by handle
#[derive(Debug)]
pub struct HierarchyStore {
    lock: ExclusionLock,
    persistence: PersistenceAdapter,
}

impl HierarchyStore {
    pub fn new(persistence: PersistenceAdapter) -> Self {
        Self {
            lock: ExclusionLock::new(),
            persistence,
        }
    }

    /// Convenience constructor over a raw backend
    pub fn with_backend(backend: Box<dyn KeyValueStore>, key: &str) -> Self {
        Self::new(PersistenceAdapter::new(backend, key))
    }

    pub fn lock(&self) -> &ExclusionLock {
        &self.lock
    }

    /// Run one exclusive body against the store
    pub async fn run_exclusive<F, Fut, T>(&self, body: F) -> T
    where
        F: FnOnce(ExclusionGuard) -> Fut,
        Fut: Future<Output = T>,
    {
        self.lock.run_exclusive(body).await
    }

    /// Read the whole collection
    pub fn get(&self, _guard: &ExclusionGuard) -> Collection {
        self.persistence.load()
    }

    /// Replace the whole collection
    pub fn set(&self, _guard: &ExclusionGuard, collection: &Collection) -> Result<(), StoreError> {
        self.persistence.save(collection)
    }

    /// Forget everything that was persisted
    pub fn clear(&self, _guard: &ExclusionGuard) -> Result<(), StoreError> {
        self.persistence.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::Forest;
    use crate::persistence::MemoryKv;

    #[tokio::test]
    async fn test_get_set_through_guard() {
        let store = HierarchyStore::with_backend(Box::new(MemoryKv::new()), "tabstruct");

        let guard = store.lock().acquire().await;
        assert!(store.get(&guard).is_empty());

        let mut collection = Collection::new();
        collection.insert(1, Forest::from_pairs([(10, None), (11, Some(10))]));
        store.set(&guard, &collection).unwrap();
        assert_eq!(store.get(&guard), collection);

        store.clear(&guard).unwrap();
        assert!(store.get(&guard).is_empty());
    }
}
