//! Replica identity generation.
//!
//! Every counter replica carries a globally-unique string identity, assigned
//! once at creation and never reused. The generator is injected rather than
//! hardwired so tests can use deterministic identities.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// A capability supplying globally-unique identity strings on demand.
pub trait IdentitySource: Send + Sync {
    /// Produce a fresh identity, never returned before.
    fn generate(&self) -> String;
}

/// Production identity source: random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdentity;

impl IdentitySource for UuidIdentity {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic identity source for tests: `<prefix>-0`, `<prefix>-1`, ...
///
/// Unique only within one instance; production code wants [`UuidIdentity`].
#[derive(Debug)]
pub struct SequentialIdentity {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdentity {
    /// Create a source emitting identities under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }
}

impl IdentitySource for SequentialIdentity {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.prefix)
    }
}
