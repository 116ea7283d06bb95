//! A simulated network of mock peers sharing an in-process routing table
//!
//! Each physical peer owns an inbox channel; a shared registry of outgoing
//! senders lets any peer address any other. The overlay's tree of
//! [`Context`]s is laid over this flat peer set by a shared routing table
//! mapping `(ContextId, VAddr) -> physical peer index`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};

use overlay_core::{Context, ContextId};

use crate::envelope::Envelope;
use crate::policy::MockCommPolicy;

pub(crate) type PhysicalId = u32;

pub(crate) struct MockNetworkState {
    pub(crate) inboxes: DashMap<PhysicalId, mpsc::Sender<Envelope>>,
    /// `routing[ctx_id][vaddr] = physical peer index`
    pub(crate) routing: DashMap<ContextId, Vec<PhysicalId>>,
}

impl MockNetworkState {
    pub(crate) fn physical_of(&self, ctx_id: ContextId, vaddr: overlay_core::VAddr) -> PhysicalId {
        self.routing
            .get(&ctx_id)
            .and_then(|members| members.get(vaddr.get() as usize).copied())
            .expect("vaddr not registered for context; context was never split/announced here")
    }
}

/// Derive a context id deterministically from its parent and member set, so
/// that every peer computes the identical id for a `splitContext` call
/// without a shared mutable counter needing cross-task coordination.
pub(crate) fn derive_context_id(parent: ContextId, members: &[PhysicalId]) -> ContextId {
    let mut hasher = DefaultHasher::new();
    parent.get().hash(&mut hasher);
    members.hash(&mut hasher);
    ContextId::new(hasher.finish())
}

/// Builder/owner for a simulated network of `peer_count` mock peers.
///
/// Fully connected: every peer can reach every other peer directly, which
/// is the right fidelity level for exercising the overlay's protocol logic
/// rather than real transport behavior.
pub struct MockNetwork {
    state: Arc<MockNetworkState>,
    policies: Vec<Arc<MockCommPolicy>>,
}

const GLOBAL_CONTEXT: ContextId = ContextId::new(0);

impl MockNetwork {
    /// Build a fully-connected network of `peer_count` mock peers and the
    /// global context spanning all of them.
    pub fn new(peer_count: usize) -> Self {
        let state = Arc::new(MockNetworkState {
            inboxes: DashMap::new(),
            routing: DashMap::new(),
        });

        let members: Vec<PhysicalId> = (0..peer_count as PhysicalId).collect();
        state.routing.insert(GLOBAL_CONTEXT, members.clone());

        let mut receivers = Vec::with_capacity(peer_count);
        for physical in 0..peer_count as PhysicalId {
            let (tx, rx) = mpsc::channel(1024);
            state.inboxes.insert(physical, tx);
            receivers.push(rx);
        }

        let policies = receivers
            .into_iter()
            .enumerate()
            .map(|(physical, rx)| {
                let global = Context::member(
                    GLOBAL_CONTEXT,
                    peer_count,
                    overlay_core::VAddr::new(physical as u32),
                );
                Arc::new(MockCommPolicy {
                    physical: physical as PhysicalId,
                    network: state.clone(),
                    inbox_rx: Mutex::new(rx),
                    staging: Mutex::new(std::collections::VecDeque::new()),
                    collective_seq: DashMap::new(),
                    global_ctx: global,
                })
            })
            .collect();

        Self { state, policies }
    }

    /// The number of peers in this network.
    pub fn peer_count(&self) -> usize {
        self.policies.len()
    }

    /// The mock policy handle for physical peer `i`.
    pub fn policy(&self, i: usize) -> Arc<MockCommPolicy> {
        self.policies[i].clone()
    }

    /// All peer handles, in physical-index order.
    pub fn policies(&self) -> &[Arc<MockCommPolicy>] {
        &self.policies
    }
}

impl Drop for MockNetwork {
    fn drop(&mut self) {
        self.state.inboxes.clear();
    }
}
