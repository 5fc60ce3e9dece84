//! # Tally Gossip - counter/transport integration
//!
//! This crate wires the [`tally_core`] counter engine to a
//! membership/gossip transport. It owns both sides of the contract:
//! - outgoing: serialize per-event counter state into [`wire::Envelope`]
//!   broadcasts and full-registry snapshots for anti-entropy push/pull
//! - incoming: decode and merge peer broadcasts and full-state blobs via
//!   the [`delegate::GossipDelegate`] callbacks the transport invokes
//!
//! The transport itself (failure detection, peer discovery, message
//! transmission) stays behind the [`transport::BroadcastQueue`] and
//! [`transport::Membership`] traits. Broadcasts are best-effort and lossy;
//! the periodic full-state exchange is the convergence backstop that makes
//! delivery order and message loss irrelevant.

pub mod delegate;
pub mod node;
pub mod transport;
pub mod wire;

pub use delegate::{CounterDelegate, GossipDelegate, ProtocolFault};
pub use node::{CounterNode, GossipError};
pub use transport::{BroadcastQueue, Member, Membership};
pub use wire::{Envelope, ENVELOPE_KIND_MERGE};
