//! Join-semilattice traits for state-based CRDTs.
//!
//! A CvRDT synchronizes by exchanging full state and merging with a join
//! operation that is commutative, associative, and idempotent. Keeping the
//! join as a pure value-level function lets the algebra be tested in
//! isolation from the concurrent containers that use it.

/// A type whose values form a join-semilattice under `join`.
///
/// Laws (checked by property tests, not the compiler):
/// - `a.join(&b) == b.join(&a)` (commutative)
/// - `a.join(&b).join(&c) == a.join(&b.join(&c))` (associative)
/// - `a.join(&a) == a` (idempotent)
pub trait JoinSemilattice {
    /// Least upper bound of `self` and `other`.
    fn join(&self, other: &Self) -> Self;
}

/// Types with a least element, the identity of `join`.
pub trait Bottom {
    /// The least element: `bottom().join(&a) == a` for all `a`.
    fn bottom() -> Self;
}
