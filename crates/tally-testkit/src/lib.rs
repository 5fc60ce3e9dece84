//! # Tally Testkit - in-memory cluster transport
//!
//! A deterministic substitute for a real membership/gossip transport, used
//! by integration tests and demos. It implements the same boundary a
//! production transport would ([`BroadcastQueue`] + [`Membership`]) but
//! keeps every node in one process and puts the test in charge of time:
//! broadcasts sit in per-node outboxes until [`MemoryCluster::deliver_broadcasts`]
//! runs (or are discarded to simulate loss), and anti-entropy push/pull
//! happens exactly when [`MemoryCluster::exchange`] is called.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tally_core::CounterRegistry;
use tally_gossip::{
    BroadcastQueue, CounterNode, GossipDelegate, GossipError, Member, Membership, ProtocolFault,
};
use tracing::debug;
use uuid::Uuid;

/// A single-process cluster of in-memory transports.
#[derive(Default)]
pub struct MemoryCluster {
    peers: RwLock<Vec<Arc<MemoryTransport>>>,
}

impl MemoryCluster {
    /// Create an empty cluster.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a new node and return its transport.
    ///
    /// The node name follows the `host-<unique-id>` shape a production
    /// bootstrap assigns once at process start.
    pub fn add_node(self: &Arc<Self>, host: &str) -> Arc<MemoryTransport> {
        let mut peers = self.peers.write();
        let member = Member {
            name: format!("{host}-{}", Uuid::new_v4()),
            addr: "127.0.0.1".to_string(),
            port: 7946 + peers.len() as u16,
        };
        let transport = Arc::new(MemoryTransport {
            cluster: Arc::clone(self),
            member,
            delegate: RwLock::new(None),
            outbox: Mutex::new(Vec::new()),
        });
        peers.push(Arc::clone(&transport));
        transport
    }

    /// Register a node and compose a [`CounterNode`] over `registry`.
    ///
    /// Wires the node's delegate back into the transport so broadcast
    /// delivery and push/pull callbacks reach it.
    pub fn add_counter_node(
        self: &Arc<Self>,
        host: &str,
        registry: Arc<CounterRegistry>,
    ) -> CounterNode {
        let transport = self.add_node(host);
        let node = CounterNode::new(
            registry,
            transport.clone() as Arc<dyn BroadcastQueue>,
            transport.clone() as Arc<dyn Membership>,
        );
        transport.register_delegate(node.delegate());
        node
    }

    /// Deliver every queued broadcast to every other node.
    ///
    /// A real transport fans out to a bounded random subset; delivering to
    /// all peers keeps tests deterministic while exercising the same
    /// receive path.
    pub fn deliver_broadcasts(&self) -> Result<(), ProtocolFault> {
        let peers = self.snapshot();
        for sender in &peers {
            let queued: Vec<Vec<u8>> = sender.outbox.lock().drain(..).collect();
            for payload in queued {
                for receiver in &peers {
                    if receiver.member.name == sender.member.name {
                        continue;
                    }
                    receiver.delegate().receive_broadcast(&payload)?;
                }
            }
        }
        Ok(())
    }

    /// Discard every queued broadcast: simulated message loss.
    pub fn drop_broadcasts(&self) {
        for peer in self.snapshot() {
            peer.outbox.lock().clear();
        }
    }

    /// Bidirectional push/pull exchange between two nodes, by host prefix
    /// or full member name.
    pub fn exchange(&self, a: &str, b: &str) -> Result<(), ProtocolFault> {
        let first = self.find(a);
        let second = self.find(b);
        exchange_states(&first, &second)
    }

    fn snapshot(&self) -> Vec<Arc<MemoryTransport>> {
        self.peers.read().clone()
    }

    fn find(&self, name: &str) -> Arc<MemoryTransport> {
        self.snapshot()
            .into_iter()
            .find(|p| p.member.name == name || p.member.name.starts_with(&format!("{name}-")))
            .unwrap_or_else(|| panic!("no cluster member named {name}"))
    }
}

fn exchange_states(a: &MemoryTransport, b: &MemoryTransport) -> Result<(), ProtocolFault> {
    debug!(a = %a.member.name, b = %b.member.name, "push/pull exchange");
    let a_delegate = a.delegate();
    let b_delegate = b.delegate();
    b_delegate.merge_remote_state(&a_delegate.local_state()?)?;
    a_delegate.merge_remote_state(&b_delegate.local_state()?)?;
    Ok(())
}

/// One node's view of the in-memory cluster.
pub struct MemoryTransport {
    cluster: Arc<MemoryCluster>,
    member: Member,
    delegate: RwLock<Option<Arc<dyn GossipDelegate>>>,
    outbox: Mutex<Vec<Vec<u8>>>,
}

impl MemoryTransport {
    /// Wire the delegate callbacks for this node.
    pub fn register_delegate(&self, delegate: Arc<dyn GossipDelegate>) {
        *self.delegate.write() = Some(delegate);
    }

    /// Number of broadcasts waiting in this node's outbox.
    pub fn queued_broadcasts(&self) -> usize {
        self.outbox.lock().len()
    }

    fn delegate(&self) -> Arc<dyn GossipDelegate> {
        self.delegate
            .read()
            .clone()
            .unwrap_or_else(|| panic!("no delegate registered for {}", self.member.name))
    }
}

impl BroadcastQueue for MemoryTransport {
    fn queue(&self, payload: Vec<u8>) {
        self.outbox.lock().push(payload);
    }
}

impl Membership for MemoryTransport {
    fn join(&self, seeds: &[String]) -> Result<usize, GossipError> {
        if seeds.is_empty() {
            return Ok(0);
        }
        let peers = self.cluster.snapshot();
        let mut reached = 0;
        for seed in seeds {
            let found = peers.iter().find(|p| {
                p.member.name != self.member.name
                    && (p.member.name == *seed
                        || format!("{}:{}", p.member.addr, p.member.port) == *seed)
            });
            if let Some(peer) = found {
                // Join performs an immediate state exchange with the seed,
                // the way a real transport push/pulls on join.
                exchange_states(self, peer).map_err(GossipError::Fault)?;
                reached += 1;
            }
        }
        if reached == 0 {
            return Err(GossipError::Join {
                message: format!("none of {} seed(s) could be reached", seeds.len()),
            });
        }
        Ok(reached)
    }

    fn members(&self) -> Vec<Member> {
        self.cluster
            .snapshot()
            .into_iter()
            .map(|p| p.member.clone())
            .collect()
    }

    fn local_member(&self) -> Member {
        self.member.clone()
    }
}
