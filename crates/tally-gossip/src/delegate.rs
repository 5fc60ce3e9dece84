//! The gossip integration layer.
//!
//! [`CounterDelegate`] implements the callback contract a membership
//! transport invokes into this node: consume partial updates
//! (broadcasts), and produce/consume full local state for periodic
//! anti-entropy push/pull. It also owns the outgoing partial-update path
//! triggered by local increments.
//!
//! Error posture (see [`ProtocolFault`]): a malformed *broadcast* is a
//! dropped gossip message - logged and ignored, because push/pull will
//! reconcile. A malformed *full-state* blob or an unrecognized envelope
//! kind means a peer with an incompatible protocol version; those are
//! fatal and must be escalated, never papered over.

use crate::transport::BroadcastQueue;
use crate::wire::{Envelope, ENVELOPE_KIND_MERGE};
use std::sync::Arc;
use tally_core::{CounterRegistry, GCounter};
use tracing::{debug, warn};

/// Unrecoverable protocol condition.
///
/// Every variant is fatal by contract: the embedding process must treat it
/// as version skew or a programming error and escalate (abort the node or
/// crash the handling task), not retry or ignore.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolFault {
    /// A peer sent an envelope kind this version does not produce.
    #[error("unsupported envelope kind: {kind}")]
    UnsupportedKind {
        /// The unrecognized kind discriminator
        kind: String,
    },

    /// A peer's full-state blob failed to decode during push/pull.
    #[error("corrupt full-state payload: {message}")]
    CorruptState {
        /// Decode failure detail
        message: String,
    },

    /// Local state failed to serialize. Always a programming error.
    #[error("local state failed to encode: {message}")]
    Encode {
        /// Encode failure detail
        message: String,
    },
}

/// Callbacks the transport invokes into the counter layer.
pub trait GossipDelegate: Send + Sync {
    /// A peer's broadcast payload was delivered.
    fn receive_broadcast(&self, payload: &[u8]) -> Result<(), ProtocolFault>;

    /// The transport needs this node's full state for a push/pull exchange
    /// or for a newly joining peer.
    fn local_state(&self) -> Result<Vec<u8>, ProtocolFault>;

    /// A peer's full state arrived from a push/pull exchange or join.
    fn merge_remote_state(&self, payload: &[u8]) -> Result<(), ProtocolFault>;
}

/// Gossip integration for a [`CounterRegistry`].
pub struct CounterDelegate {
    registry: Arc<CounterRegistry>,
    broadcasts: Arc<dyn BroadcastQueue>,
}

impl CounterDelegate {
    /// Wire a registry to a transport's broadcast queue.
    pub fn new(registry: Arc<CounterRegistry>, broadcasts: Arc<dyn BroadcastQueue>) -> Self {
        Self {
            registry,
            broadcasts,
        }
    }

    /// Queue a broadcast of `event`'s full current counter state.
    ///
    /// The whole per-event counter is shipped, not just the latest local
    /// delta; each snapshot is broadcast independently and never
    /// invalidates an earlier one.
    pub fn broadcast_counter(&self, event: &str) -> Result<(), ProtocolFault> {
        let payload = self
            .registry
            .counter_for(event)
            .to_bytes()
            .map_err(|e| ProtocolFault::Encode {
                message: e.to_string(),
            })?;
        let bytes = Envelope::merge(event, payload)
            .encode()
            .map_err(|e| ProtocolFault::Encode {
                message: e.to_string(),
            })?;

        debug!(event, "broadcasting local counter state");
        self.broadcasts.queue(bytes);
        Ok(())
    }
}

impl GossipDelegate for CounterDelegate {
    fn receive_broadcast(&self, payload: &[u8]) -> Result<(), ProtocolFault> {
        if payload.is_empty() {
            return Ok(());
        }

        let envelope = match Envelope::decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                // A bad peer message must not crash the node; push/pull
                // reconciles whatever this broadcast carried.
                warn!(error = %e, "dropping undecodable broadcast envelope");
                return Ok(());
            }
        };

        match envelope.kind.as_str() {
            ENVELOPE_KIND_MERGE => {
                let remote = match GCounter::from_bytes(&envelope.payload) {
                    Ok(remote) => remote,
                    Err(e) => {
                        warn!(
                            event = %envelope.event,
                            error = %e,
                            "dropping merge broadcast with undecodable counter"
                        );
                        return Ok(());
                    }
                };
                debug!(event = %envelope.event, "merging broadcast counter state");
                self.registry.merge(&envelope.event, &remote);
                Ok(())
            }
            other => Err(ProtocolFault::UnsupportedKind {
                kind: other.to_string(),
            }),
        }
    }

    fn local_state(&self) -> Result<Vec<u8>, ProtocolFault> {
        debug!("sharing full local state for push/pull");
        self.registry.to_bytes().map_err(|e| ProtocolFault::Encode {
            message: e.to_string(),
        })
    }

    fn merge_remote_state(&self, payload: &[u8]) -> Result<(), ProtocolFault> {
        if payload.is_empty() {
            return Ok(());
        }

        debug!("merging full remote state from push/pull");
        self.registry
            .merge_state(payload)
            .map_err(|e| ProtocolFault::CorruptState {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Envelope;
    use std::sync::Mutex;

    /// Minimal queue capturing everything handed to the transport.
    #[derive(Default)]
    struct QueueSpy {
        sent: Mutex<Vec<Vec<u8>>>,
    }

    impl BroadcastQueue for QueueSpy {
        fn queue(&self, payload: Vec<u8>) {
            self.sent.lock().unwrap().push(payload);
        }
    }

    fn delegate() -> (Arc<CounterRegistry>, Arc<QueueSpy>, CounterDelegate) {
        let registry = Arc::new(CounterRegistry::new());
        let queue = Arc::new(QueueSpy::default());
        let delegate = CounterDelegate::new(Arc::clone(&registry), queue.clone());
        (registry, queue, delegate)
    }

    #[test]
    fn broadcast_carries_the_full_event_counter() {
        let (registry, queue, delegate) = delegate();
        registry.increment("clicks", 5).unwrap();

        delegate.broadcast_counter("clicks").unwrap();

        let sent = queue.sent.lock().unwrap();
        let envelope = Envelope::decode(&sent[0]).unwrap();
        assert_eq!(envelope.kind, ENVELOPE_KIND_MERGE);
        assert_eq!(envelope.event, "clicks");
        let counter = GCounter::from_bytes(&envelope.payload).unwrap();
        assert_eq!(counter.total(), 5);
    }

    #[test]
    fn empty_broadcast_is_a_noop() {
        let (registry, _queue, delegate) = delegate();
        delegate.receive_broadcast(&[]).unwrap();
        assert!(registry.totals().is_empty());
    }

    #[test]
    fn undecodable_envelope_is_dropped_silently() {
        let (registry, _queue, delegate) = delegate();
        registry.increment("clicks", 2).unwrap();

        delegate.receive_broadcast(&[0xba, 0xad]).unwrap();
        assert_eq!(registry.total("clicks"), 2);
    }

    #[test]
    fn merge_broadcast_with_undecodable_counter_is_dropped() {
        let (registry, _queue, delegate) = delegate();
        registry.increment("clicks", 2).unwrap();

        let bytes = Envelope::merge("clicks", vec![0xff, 0xfe]).encode().unwrap();
        delegate.receive_broadcast(&bytes).unwrap();
        assert_eq!(registry.total("clicks"), 2);
    }

    #[test]
    fn unsupported_kind_is_fatal() {
        let (_registry, _queue, delegate) = delegate();

        let envelope = Envelope {
            kind: "evict".to_string(),
            event: "clicks".to_string(),
            payload: Vec::new(),
        };
        let err = delegate
            .receive_broadcast(&envelope.encode().unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolFault::UnsupportedKind {
                kind: "evict".to_string()
            }
        );
    }

    #[test]
    fn merge_broadcast_updates_registry() {
        let (registry, _queue, delegate) = delegate();

        let remote = GCounter::new("remote");
        remote.increment(7).unwrap();
        let bytes = Envelope::merge("clicks", remote.to_bytes().unwrap())
            .encode()
            .unwrap();

        delegate.receive_broadcast(&bytes).unwrap();
        assert_eq!(registry.total("clicks"), 7);
    }

    #[test]
    fn empty_remote_state_is_a_noop() {
        let (registry, _queue, delegate) = delegate();
        delegate.merge_remote_state(&[]).unwrap();
        assert!(registry.totals().is_empty());
    }

    #[test]
    fn corrupt_remote_state_is_fatal() {
        let (_registry, _queue, delegate) = delegate();
        let err = delegate.merge_remote_state(&[0x00, 0x01]).unwrap_err();
        assert!(matches!(err, ProtocolFault::CorruptState { .. }));
    }

    #[test]
    fn local_state_round_trips_through_merge() {
        let (registry, _queue, delegate) = delegate();
        registry.increment("a", 4).unwrap();
        registry.increment("b", 2).unwrap();

        let peer_registry = Arc::new(CounterRegistry::new());
        let peer = CounterDelegate::new(
            Arc::clone(&peer_registry),
            Arc::new(QueueSpy::default()),
        );
        peer.merge_remote_state(&delegate.local_state().unwrap())
            .unwrap();

        assert_eq!(peer_registry.total("a"), 4);
        assert_eq!(peer_registry.total("b"), 2);
    }
}
