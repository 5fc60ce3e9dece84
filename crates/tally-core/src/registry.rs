//! The per-event counter registry.
//!
//! One [`GCounter`] per event name, created lazily on first reference with
//! a fresh replica identity. The registry is the fan-out point for local
//! increments, incoming merges, and the full-state snapshot exchanged by
//! anti-entropy push/pull.

use crate::errors::CounterError;
use crate::gcounter::GCounter;
use crate::identity::{IdentitySource, UuidIdentity};
use crate::syncmap::SyncMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of one replicated counter per event name.
pub struct CounterRegistry {
    counters: SyncMap<String, Arc<GCounter>>,
    identity: Arc<dyn IdentitySource>,
}

impl CounterRegistry {
    /// Create a registry generating UUID replica identities.
    pub fn new() -> Self {
        Self::with_identity_source(Arc::new(UuidIdentity))
    }

    /// Create a registry with an injected identity source.
    pub fn with_identity_source(identity: Arc<dyn IdentitySource>) -> Self {
        Self {
            counters: SyncMap::new(),
            identity,
        }
    }

    /// Counter for `event`, created with a fresh replica identity if absent.
    ///
    /// Concurrent first access for the same event yields exactly one
    /// instance; later callers always get that same instance.
    pub fn counter_for(&self, event: &str) -> Arc<GCounter> {
        self.counters.get_or_insert_with(event.to_string(), || {
            Arc::new(GCounter::new(self.identity.generate()))
        })
    }

    /// Increment the local replica's sub-count for `event`.
    pub fn increment(&self, event: &str, amount: i64) -> Result<(), CounterError> {
        self.counter_for(event).increment(amount)
    }

    /// Total count for `event` across all replicas seen so far.
    pub fn total(&self, event: &str) -> i64 {
        self.counter_for(event).total()
    }

    /// Merge a remote replica's counter for `event` into the local one.
    pub fn merge(&self, event: &str, other: &GCounter) {
        self.counter_for(event).merge(other);
    }

    /// Snapshot of all current counters.
    ///
    /// Events created after the call starts may or may not appear; events
    /// present at call start always do.
    pub fn all_counters(&self) -> Vec<(String, Arc<GCounter>)> {
        self.counters.snapshot().into_iter().collect()
    }

    /// Current total per event.
    pub fn totals(&self) -> BTreeMap<String, i64> {
        self.all_counters()
            .into_iter()
            .map(|(event, counter)| (event, counter.total()))
            .collect()
    }

    /// Serialize the full registry state for push/pull exchange.
    ///
    /// The wire shape is a map from event name to that event's serialized
    /// counter snapshot.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CounterError> {
        let mut events = BTreeMap::new();
        for (event, counter) in self.all_counters() {
            events.insert(event, counter.to_bytes()?);
        }
        bincode::serialize(&RegistrySnapshot { events })
            .map_err(|e| CounterError::encode(e.to_string()))
    }

    /// Decode a peer's full registry state and merge every event's counter
    /// into the local registry.
    ///
    /// Fails with [`CounterError::Decode`] if the outer map or any nested
    /// counter payload is malformed; local state is untouched in that case.
    pub fn merge_state(&self, bytes: &[u8]) -> Result<(), CounterError> {
        let snapshot: RegistrySnapshot =
            bincode::deserialize(bytes).map_err(|e| CounterError::decode(e.to_string()))?;
        // Decode every nested counter before merging anything, so a corrupt
        // payload leaves local state untouched.
        let mut decoded = Vec::with_capacity(snapshot.events.len());
        for (event, payload) in snapshot.events {
            decoded.push((event, GCounter::from_bytes(&payload)?));
        }
        for (event, counter) in decoded {
            self.merge(&event, &counter);
        }
        Ok(())
    }
}

impl Default for CounterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable full-registry state: event name -> serialized counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Serialized [`crate::CounterSnapshot`] per event.
    pub events: BTreeMap<String, Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SequentialIdentity;
    use std::thread;

    fn test_registry(prefix: &str) -> CounterRegistry {
        CounterRegistry::with_identity_source(Arc::new(SequentialIdentity::new(prefix)))
    }

    #[test]
    fn counter_for_creates_once_and_reuses() {
        let registry = test_registry("r");
        let first = registry.counter_for("clicks");
        let second = registry.counter_for("clicks");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.identity(), "r-0");

        let other = registry.counter_for("views");
        assert_eq!(other.identity(), "r-1");
    }

    #[test]
    fn concurrent_first_access_yields_one_instance() {
        let registry = Arc::new(CounterRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.counter_for("clicks").identity().to_string())
            })
            .collect();
        let identities: Vec<String> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(identities.iter().all(|id| *id == identities[0]));
        assert_eq!(registry.all_counters().len(), 1);
    }

    #[test]
    fn increment_and_totals_fan_out() {
        let registry = test_registry("r");
        registry.increment("a", 2).unwrap();
        registry.increment("a", 3).unwrap();
        registry.increment("b", 7).unwrap();

        assert_eq!(registry.total("a"), 5);
        assert_eq!(registry.total("b"), 7);
        assert_eq!(
            registry.totals(),
            BTreeMap::from([("a".to_string(), 5), ("b".to_string(), 7)])
        );
    }

    #[test]
    fn full_state_round_trip_merges_every_event() {
        let source = test_registry("src");
        source.increment("a", 4).unwrap();
        source.increment("b", 9).unwrap();

        let target = test_registry("dst");
        target.increment("b", 2).unwrap();

        target.merge_state(&source.to_bytes().unwrap()).unwrap();
        assert_eq!(target.total("a"), 4);
        // Disjoint replica identities, so both sides' contributions count.
        assert_eq!(target.total("b"), 11);
    }

    #[test]
    fn merge_state_rejects_garbage_without_mutating() {
        let registry = test_registry("r");
        registry.increment("a", 1).unwrap();

        let err = registry.merge_state(&[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        assert!(matches!(err, CounterError::Decode { .. }));
        assert_eq!(registry.total("a"), 1);
        assert_eq!(registry.all_counters().len(), 1);
    }
}
