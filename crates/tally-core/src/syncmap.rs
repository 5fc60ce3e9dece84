//! Concurrency-safe map with atomic update-or-create.
//!
//! Shared by the counter (replica id -> count) and the registry
//! (event name -> counter). The contract that matters is per-key: every
//! mutation of a given key is atomic relative to all other mutations of
//! that key, and `get_or_insert_with` admits exactly one winner under
//! concurrent first access. Cross-key atomicity is not promised; a
//! `snapshot` is a consistent view of the map at some single point, but
//! two successive reads may interleave with writers.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;

/// A map safe for concurrent readers and writers.
#[derive(Debug, Default)]
pub struct SyncMap<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K, V> SyncMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Current value for `key`, if present.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.read().get(key).cloned()
    }

    /// Insert or replace the value for `key`.
    pub fn insert(&self, key: K, value: V) {
        self.inner.write().insert(key, value);
    }

    /// Value for `key`, inserting `factory()` if absent.
    ///
    /// Under concurrent first access for the same key exactly one caller's
    /// factory value is stored; every caller gets that stored value back.
    pub fn get_or_insert_with(&self, key: K, factory: impl FnOnce() -> V) -> V {
        if let Some(existing) = self.inner.read().get(&key) {
            return existing.clone();
        }
        let mut guard = self.inner.write();
        guard.entry(key).or_insert_with(factory).clone()
    }

    /// Atomic read-modify-write of one key.
    ///
    /// `apply` sees the current value (or `None` if absent) and returns the
    /// new one. The whole step happens under the write lock, so concurrent
    /// `update_or_insert` calls on the same key never lose updates.
    pub fn update_or_insert(&self, key: K, apply: impl FnOnce(Option<&V>) -> V) {
        let mut guard = self.inner.write();
        let next = apply(guard.get(&key));
        guard.insert(key, next);
    }

    /// Consistent clone of the whole map.
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.inner.read().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
