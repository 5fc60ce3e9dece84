//! The node facade.
//!
//! [`CounterNode`] composes the counter registry, the gossip delegate, and
//! the membership transport into the surface a serving layer (RPC/HTTP)
//! consumes: increment, totals, membership.

use crate::delegate::{CounterDelegate, ProtocolFault};
use crate::transport::{BroadcastQueue, Member, Membership};
use std::collections::BTreeMap;
use std::sync::Arc;
use tally_core::{CounterError, CounterRegistry};
use tracing::debug;

/// Errors surfaced at the node facade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GossipError {
    /// Counter engine error (invalid amount, decode failure).
    #[error(transparent)]
    Counter(#[from] CounterError),

    /// Fatal protocol fault; the caller must escalate, not retry.
    #[error(transparent)]
    Fault(#[from] ProtocolFault),

    /// No seed node could be reached during a join.
    #[error("join failed: {message}")]
    Join {
        /// What went wrong contacting the seeds
        message: String,
    },
}

/// One counter node: registry, gossip integration, and membership.
pub struct CounterNode {
    registry: Arc<CounterRegistry>,
    delegate: Arc<CounterDelegate>,
    membership: Arc<dyn Membership>,
}

impl CounterNode {
    /// Compose a node from a registry and an already-created transport.
    ///
    /// The transport must already be invoking the returned delegate's
    /// callbacks for broadcast delivery and push/pull exchange.
    pub fn new(
        registry: Arc<CounterRegistry>,
        broadcasts: Arc<dyn BroadcastQueue>,
        membership: Arc<dyn Membership>,
    ) -> Self {
        let delegate = Arc::new(CounterDelegate::new(Arc::clone(&registry), broadcasts));
        Self {
            registry,
            delegate,
            membership,
        }
    }

    /// The delegate the transport must invoke callbacks on.
    pub fn delegate(&self) -> Arc<CounterDelegate> {
        Arc::clone(&self.delegate)
    }

    /// Increment `event` by `amount` and queue a broadcast of the updated
    /// counter state.
    ///
    /// The broadcast and the next push/pull cycle race freely; merge
    /// semantics make the order irrelevant.
    pub fn increment(&self, event: &str, amount: i64) -> Result<(), GossipError> {
        self.registry.increment(event, amount)?;
        self.delegate.broadcast_counter(event)?;
        Ok(())
    }

    /// Total count for `event` as locally known.
    pub fn total(&self, event: &str) -> i64 {
        self.registry.total(event)
    }

    /// Locally known totals for every event.
    pub fn all_totals(&self) -> BTreeMap<String, i64> {
        self.registry.totals()
    }

    /// Join an existing cluster through `seeds`.
    ///
    /// Empty `seeds` is a no-op: the node runs as a single-member cluster.
    pub fn join(&self, seeds: &[String]) -> Result<usize, GossipError> {
        if seeds.is_empty() {
            debug!("no seeds given, starting as a single-member cluster");
            return Ok(0);
        }
        self.membership.join(seeds)
    }

    /// The local node's identity.
    pub fn local_member(&self) -> Member {
        self.membership.local_member()
    }

    /// Currently known cluster members.
    pub fn members(&self) -> Vec<Member> {
        self.membership.members()
    }
}
