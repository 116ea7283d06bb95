//! # overlay-nameservice
//!
//! The vertex directory: which peer hosts which vertex of which
//! graph, and the context each announced graph communicates over.
//!
//! Two announce variants are provided:
//!
//! - [`NameService::announce`] (Variant A, legacy): the graph's context is
//!   derived *after* the allGather loop, via a `split_context` over every
//!   peer that ended up hosting at least one vertex.
//! - [`NameService::announce_reannounce`] (Variant B): splits the context
//!   *before* assigning VAddrs, so a peer that no longer hosts any vertex of
//!   the graph can drop out of its context entirely. The new context is
//!   stored the moment it is computed, and every subsequent VAddr
//!   assignment happens only in the new context's address space — old and
//!   new VAddrs are never mixed mid-assignment.
//!
//! Both lookups ([`NameService::locate_vertex`], [`NameService::hosted_vertices`])
//! return [`OverlayError::DirectoryMiss`] on a missing entry rather than
//! panicking.

use dashmap::DashMap;

use overlay_core::{CommPolicy, Context, GraphId, OverlayError, ReduceOp, Result, VAddr, VertexId};
use overlay_graph::GraphPolicy;

/// The directory: which peer hosts which vertex, and each graph's context.
///
/// Keyed by [`GraphId`] at the top level so one `NameService` instance can
/// track several concurrently-announced graphs (a graph and its sub-graphs,
/// for instance). Internally DashMap-backed so lookups never block a
/// concurrent announce of a different graph.
#[derive(Default)]
pub struct NameService {
    comm_map: DashMap<GraphId, DashMap<VertexId, VAddr>>,
    context_map: DashMap<GraphId, Context>,
    vertex_map: DashMap<GraphId, DashMap<VAddr, Vec<VertexId>>>,
}

impl NameService {
    pub fn new() -> Self {
        Self::default()
    }

    /// The context this peer should announce `graph` over, before an
    /// announce has run for it: the supergraph's context if `graph` has one
    /// and it has already been announced, otherwise the global context.
    fn ambient_context<P: CommPolicy, V, E>(
        &self,
        policy: &P,
        graph: &impl GraphPolicy<V, E>,
    ) -> Result<Context> {
        if let Some(ctx) = self.context_map.get(&graph.graph_id()) {
            return Ok(ctx.clone());
        }
        if let Some(super_id) = graph.super_graph() {
            return self.graph_context(super_id);
        }
        Ok(policy.global_context())
    }

    /// Variant A: announce `vertices` as hosted by this peer, deriving the
    /// graph's context from the set of peers that end up hosting something.
    pub async fn announce<P: CommPolicy, V, E>(
        &self,
        policy: &P,
        graph: &impl GraphPolicy<V, E>,
        vertices: &[VertexId],
    ) -> Result<()> {
        let graph_id = graph.graph_id();
        let old_context = self.ambient_context(policy, graph)?;
        if !old_context.valid() {
            tracing::debug!(?graph_id, "skipping announce: not a member of the old context");
            return Ok(());
        }
        tracing::debug!(?graph_id, hosted = vertices.len(), "announcing graph");

        self.run_announce_round(policy, graph, &old_context, vertices)
            .await?;

        let host_vaddrs = self.graph_host_vaddrs(graph_id)?;
        let my_vaddr = old_context.get_vaddr();
        let is_host = my_vaddr.is_some_and(|v| host_vaddrs.contains(&v));
        let new_context = policy.split_context(is_host, &old_context).await?;
        tracing::info!(?graph_id, hosts = host_vaddrs.len(), "graph announced");
        self.context_map.insert(graph_id, new_context);
        Ok(())
    }

    /// Variant B: split the context *before* assigning VAddrs, so peers that
    /// no longer host anything drop out instead of lingering with stale
    /// directory entries.
    pub async fn announce_reannounce<P: CommPolicy, V, E>(
        &self,
        policy: &P,
        graph: &impl GraphPolicy<V, E>,
        vertices: &[VertexId],
    ) -> Result<()> {
        let graph_id = graph.graph_id();
        let old_context = self.ambient_context(policy, graph)?;
        if !old_context.valid() {
            tracing::debug!(?graph_id, "skipping reannounce: not a member of the old context");
            return Ok(());
        }

        let new_context = policy
            .split_context(!vertices.is_empty(), &old_context)
            .await?;
        self.context_map.insert(graph_id, new_context.clone());

        if !new_context.valid() {
            tracing::info!(?graph_id, "reannounce dropped this peer: no hosted vertices");
            return Ok(());
        }

        self.comm_map.remove(&graph_id);
        self.vertex_map.remove(&graph_id);
        self.run_announce_round(policy, graph, &new_context, vertices)
            .await?;
        tracing::info!(?graph_id, new_size = new_context.size(), "graph reannounced");
        Ok(())
    }

    /// The shared core of both variants: an allReduce to find the max
    /// number of vertices any single peer hosts, then that many rounds of
    /// allGather exchanging one local vertex index (or `-1`) per peer.
    async fn run_announce_round<P: CommPolicy, V, E>(
        &self,
        policy: &P,
        graph: &impl GraphPolicy<V, E>,
        context: &Context,
        vertices: &[VertexId],
    ) -> Result<()> {
        let graph_id = graph.graph_id();
        let my_count = vertices.len() as i64;
        let mut max_count_buf = [0i64];
        policy
            .all_reduce(ReduceOp::Max, context, &[my_count], &mut max_count_buf)
            .await?;
        let max_count = max_count_buf[0];

        let comm_map = self.comm_map.entry(graph_id).or_default();
        let vertex_map = self.vertex_map.entry(graph_id).or_default();

        for round in 0..max_count {
            let local_index = vertices
                .get(round as usize)
                .and_then(|v| graph.local_id(*v))
                .map(|idx| idx as i64)
                .unwrap_or(-1);

            let mut recv = vec![-1i64; context.size()];
            policy
                .all_gather(context, &[local_index], &mut recv)
                .await?;

            for (comm_id, &local_idx) in recv.iter().enumerate() {
                if local_idx == -1 {
                    continue;
                }
                let vertex_id = graph.vertices()[local_idx as usize].id;
                let vaddr = VAddr::new(comm_id as u32);
                comm_map.insert(vertex_id, vaddr);
                vertex_map.entry(vaddr).or_default().push(vertex_id);
            }
        }

        Ok(())
    }

    /// Directory read: which peer hosts `vertex` in `graph`.
    pub fn locate_vertex(&self, graph: GraphId, vertex: VertexId) -> Result<VAddr> {
        self.comm_map
            .get(&graph)
            .and_then(|m| m.get(&vertex).map(|e| *e))
            .ok_or(OverlayError::DirectoryMiss {
                graph,
                what: format!("vertex {vertex} has no known host"),
            })
    }

    /// The vertices of `graph` hosted by the peer at `vaddr`.
    pub fn hosted_vertices(&self, graph: GraphId, vaddr: VAddr) -> Result<Vec<VertexId>> {
        self.vertex_map
            .get(&graph)
            .and_then(|m| m.get(&vaddr).map(|e| e.value().clone()))
            .ok_or(OverlayError::DirectoryMiss {
                graph,
                what: format!("peer {vaddr} hosts nothing in this graph"),
            })
    }

    /// The context that `graph`'s hosts communicate over.
    pub fn graph_context(&self, graph: GraphId) -> Result<Context> {
        self.context_map
            .get(&graph)
            .map(|c| c.clone())
            .ok_or(OverlayError::DirectoryMiss {
                graph,
                what: "graph was never announced".into(),
            })
    }

    /// The sorted, deduplicated set of VAddrs hosting at least one vertex of
    /// `graph`.
    pub fn graph_host_vaddrs(&self, graph: GraphId) -> Result<Vec<VAddr>> {
        let comm_map = self.comm_map.get(&graph).ok_or(OverlayError::DirectoryMiss {
            graph,
            what: "graph was never announced".into(),
        })?;
        let mut hosts: Vec<VAddr> = comm_map.iter().map(|e| *e.value()).collect();
        hosts.sort_unstable();
        hosts.dedup();
        Ok(hosts)
    }
}
