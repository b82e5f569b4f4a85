//! In-process memory tier.
//!
//! The only tier the rest of the application reads from directly. Reads and
//! writes are synchronous and infallible, which is the whole point: callers
//! such as an HTTP client building an `Authorization` header cannot wait for
//! the durable tier to answer.
//!
//! The map lives behind an `RwLock` shared across cheap clones of the
//! handle. The lock is held only for the duration of a single map operation
//! and never across an `.await`, so a write that returns is immediately
//! visible to every subsequent read (read-your-writes), and concurrent
//! writes to the same key resolve to whichever call acquired the lock last.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

/// Shared handle to the in-process key-value map.
///
/// Created empty, populated once by recovery, then mutated directly by
/// writes. Never persisted itself; it is a projection of the durable tier.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    store: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryCache {
    /// Create an empty memory cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a value by key. Never fails, never blocks on I/O.
    pub fn get(&self, key: &str) -> Option<String> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Insert or replace a value. Immediately visible to subsequent `get`.
    pub fn set(&self, key: &str, value: &str) {
        debug!(key = key, "memory.set");
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    /// Remove a key if present.
    pub fn remove(&self, key: &str) {
        debug!(key = key, "memory.remove");
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Check whether a key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Return the number of entries.
    pub fn len(&self) -> usize {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all entries.
    pub fn clear(&self) {
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        debug!(entries = store.len(), "memory.clear");
        store.clear();
    }

    /// Snapshot of all entries, in no particular order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

// ── tests ────────────────────────────────────────────────────────────
