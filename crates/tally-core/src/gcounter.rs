//! The grow-only counter (G-Counter).
//!
//! One `GCounter` holds a single event's distributed count: a map from
//! replica identity to that replica's locally-observed sub-count. A replica
//! only ever increments its own key; reconciliation takes the pointwise
//! maximum of every key, so merges commute, associate, and are idempotent
//! regardless of delivery order.

use crate::errors::CounterError;
use crate::semilattice::{Bottom, JoinSemilattice};
use crate::syncmap::SyncMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-replica counts form the lattice; the join is pointwise max.
impl JoinSemilattice for BTreeMap<String, i64> {
    fn join(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (identity, value) in other {
            out.entry(identity.clone())
                .and_modify(|v| *v = (*v).max(*value))
                .or_insert(*value);
        }
        out
    }
}

impl Bottom for BTreeMap<String, i64> {
    fn bottom() -> Self {
        BTreeMap::new()
    }
}

/// A single event's replicated counter.
///
/// Interior-mutable and safe for concurrent `increment`, `merge`, and
/// `total` calls; see [`SyncMap`] for the per-key atomicity contract.
#[derive(Debug)]
pub struct GCounter {
    /// Unique identity of this replica, assigned once at creation.
    identity: String,
    /// Replica identity -> that replica's sub-count.
    counts: SyncMap<String, i64>,
}

impl GCounter {
    /// Create a counter owned by the replica `identity`.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            counts: SyncMap::new(),
        }
    }

    /// This replica's identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Add `amount` to this replica's own sub-count.
    ///
    /// Only positive amounts are accepted; zero or negative amounts fail
    /// with [`CounterError::InvalidAmount`] and leave the counter
    /// unchanged. The update is an atomic read-modify-write, so concurrent
    /// increments never lose updates.
    pub fn increment(&self, amount: i64) -> Result<(), CounterError> {
        if amount < 1 {
            return Err(CounterError::InvalidAmount { amount });
        }
        self.counts.update_or_insert(self.identity.clone(), |old| {
            old.copied().unwrap_or(0) + amount
        });
        Ok(())
    }

    /// Total count across all replicas.
    ///
    /// Sums a point-in-time snapshot; under concurrent mutation the result
    /// reflects some consistent view of the map, not necessarily the very
    /// latest write to every key.
    pub fn total(&self) -> i64 {
        self.counts.snapshot().values().sum()
    }

    /// Merge another replica's state into this counter.
    ///
    /// Takes the pointwise maximum for every key of `other`; no key ever
    /// decreases.
    pub fn merge(&self, other: &GCounter) {
        for (identity, value) in other.entries() {
            self.merge_entry(identity, value);
        }
    }

    /// Merge a decoded snapshot into this counter.
    pub fn merge_snapshot(&self, snapshot: &CounterSnapshot) {
        for (identity, value) in &snapshot.counts {
            self.merge_entry(identity.clone(), *value);
        }
    }

    fn merge_entry(&self, identity: String, value: i64) {
        self.counts
            .update_or_insert(identity, |old| old.copied().unwrap_or(0).max(value));
    }

    /// Current per-replica counts.
    pub fn entries(&self) -> BTreeMap<String, i64> {
        self.counts.snapshot().into_iter().collect()
    }

    /// Point-in-time value snapshot of this counter.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            identity: self.identity.clone(),
            counts: self.entries(),
        }
    }

    /// Rebuild a counter from a snapshot.
    pub fn from_snapshot(snapshot: CounterSnapshot) -> Self {
        let counter = GCounter::new(snapshot.identity);
        for (identity, value) in snapshot.counts {
            counter.counts.insert(identity, value);
        }
        counter
    }

    /// Serialize the current state.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CounterError> {
        bincode::serialize(&self.snapshot()).map_err(|e| CounterError::encode(e.to_string()))
    }

    /// Rebuild a counter from serialized state.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CounterError> {
        let snapshot: CounterSnapshot =
            bincode::deserialize(bytes).map_err(|e| CounterError::decode(e.to_string()))?;
        Ok(Self::from_snapshot(snapshot))
    }
}

/// Serializable value snapshot of a [`GCounter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Identity of the replica that produced the snapshot.
    pub identity: String,
    /// Per-replica counts at snapshot time.
    pub counts: BTreeMap<String, i64>,
}

impl CounterSnapshot {
    /// Total count across all replicas in this snapshot.
    pub fn total(&self) -> i64 {
        self.counts.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_rejects_non_positive_amounts() {
        let counter = GCounter::new("r1");
        assert_eq!(
            counter.increment(0),
            Err(CounterError::InvalidAmount { amount: 0 })
        );
        assert_eq!(
            counter.increment(-3),
            Err(CounterError::InvalidAmount { amount: -3 })
        );
        assert_eq!(counter.total(), 0);
        assert!(counter.entries().is_empty());
    }

    #[test]
    fn increment_accumulates_on_own_key() {
        let counter = GCounter::new("r1");
        counter.increment(5).unwrap();
        counter.increment(2).unwrap();
        assert_eq!(counter.total(), 7);
        assert_eq!(counter.entries().get("r1"), Some(&7));
    }

    #[test]
    fn two_replica_merge_converges_both_ways() {
        let r1 = GCounter::new("r1");
        let r2 = GCounter::new("r2");
        r1.increment(5).unwrap();
        r2.increment(3).unwrap();

        r1.merge(&r2);
        assert_eq!(r1.total(), 8);

        r2.merge(&r1);
        assert_eq!(r2.total(), 8);
    }

    #[test]
    fn merge_never_decreases_a_key() {
        let local = GCounter::new("r1");
        local.increment(10).unwrap();

        // Stale remote view of r1 plus a new key.
        let remote = GCounter::from_snapshot(CounterSnapshot {
            identity: "r2".to_string(),
            counts: [("r1".to_string(), 4), ("r2".to_string(), 6)].into(),
        });

        local.merge(&remote);
        assert_eq!(local.entries().get("r1"), Some(&10));
        assert_eq!(local.entries().get("r2"), Some(&6));
        assert_eq!(local.total(), 16);
    }

    #[test]
    fn merge_with_own_snapshot_is_a_noop() {
        let counter = GCounter::new("r1");
        counter.increment(4).unwrap();
        let before = counter.snapshot();

        counter.merge_snapshot(&before);
        assert_eq!(counter.snapshot(), before);
    }

    #[test]
    fn round_trip_preserves_state() {
        let counter = GCounter::new("r1");
        counter.increment(5).unwrap();
        let remote = GCounter::new("r2");
        remote.increment(9).unwrap();
        counter.merge(&remote);

        let restored = GCounter::from_bytes(&counter.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.snapshot(), counter.snapshot());
        assert_eq!(restored.identity(), "r1");
    }

    #[test]
    fn round_trip_of_empty_counter() {
        let counter = GCounter::new("fresh");
        let restored = GCounter::from_bytes(&counter.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.identity(), "fresh");
        assert_eq!(restored.total(), 0);
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        let err = GCounter::from_bytes(&[0xff, 0x01, 0x02]).unwrap_err();
        assert!(matches!(err, CounterError::Decode { .. }));
    }
}
