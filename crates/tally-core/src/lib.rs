//! # Tally Core - the replicated event-counter engine
//!
//! This crate implements the state-based CRDT at the heart of tally:
//! - [`GCounter`]: a grow-only counter keeping one monotonic sub-count per
//!   contributing replica, merged by pointwise maximum
//! - [`CounterRegistry`]: one `GCounter` per event name, lazily created with
//!   a fresh replica identity, with full-state snapshot/merge for
//!   anti-entropy exchange
//! - [`SyncMap`]: the concurrency-safe map both of them are built on
//!
//! ## Design Principles
//!
//! - **Join-only convergence**: all cross-replica reconciliation goes
//!   through [`JoinSemilattice::join`] (pointwise max), which is
//!   commutative, associative, and idempotent - delivery order never
//!   matters
//! - **No lost updates**: every mutation of a map key is an atomic
//!   read-modify-write; concurrent increments and merges on the same
//!   counter are safe without external locking
//! - **In-memory, synchronous**: no operation suspends or touches I/O;
//!   callers own any network or timeout policy

pub mod errors;
pub mod gcounter;
pub mod identity;
pub mod registry;
pub mod semilattice;
pub mod syncmap;

pub use errors::CounterError;
pub use gcounter::{CounterSnapshot, GCounter};
pub use identity::{IdentitySource, SequentialIdentity, UuidIdentity};
pub use registry::CounterRegistry;
pub use semilattice::{Bottom, JoinSemilattice};
pub use syncmap::SyncMap;
