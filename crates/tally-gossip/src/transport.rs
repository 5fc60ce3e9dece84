//! Transport-facing boundary.
//!
//! The membership/gossip transport is an external collaborator; this
//! module defines the two capabilities the counter layer consumes from it.
//! Failure detection, peer selection, retransmission, and message
//! transmission all live behind these traits.

use crate::node::GossipError;
use serde::{Deserialize, Serialize};

/// One cluster member as the membership layer reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Node name, unique per process lifetime (`host-<unique-id>`).
    pub name: String,
    /// Advertised address.
    pub addr: String,
    /// Advertised port.
    pub port: u16,
}

/// Best-effort broadcast queue owned by the transport.
///
/// Queued payloads are propagated to a bounded number of peers on the
/// transport's own schedule and retransmission policy. This layer never
/// invalidates a previously queued payload and takes no action when a
/// broadcast finishes.
pub trait BroadcastQueue: Send + Sync {
    /// Hand a serialized envelope to the transport for propagation.
    fn queue(&self, payload: Vec<u8>);
}

/// Cluster membership operations owned by the transport.
pub trait Membership: Send + Sync {
    /// Contact seed nodes and join their cluster.
    ///
    /// Returns the number of seeds successfully contacted. An empty seed
    /// list is a no-op returning 0: the node starts as a single-member
    /// cluster. A non-empty list where no seed could be reached is an
    /// error.
    fn join(&self, seeds: &[String]) -> Result<usize, GossipError>;

    /// Currently known cluster members, including the local node.
    fn members(&self) -> Vec<Member>;

    /// The local node's own identity.
    fn local_member(&self) -> Member;
}
