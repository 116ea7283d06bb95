//! # overlay-comm
//!
//! The graph communicator: translates operations expressed in terms
//! of (vertex, edge) into peer-level calls on a [`CommPolicy`], using the
//! context and directory an [`overlay_nameservice::NameService`] maintains
//! for the graph.
//!
//! Point-to-point addressing follows directly from the directory: `send(g,
//! dstVertex, e, buf)` resolves to `policy.send(commMap[g][dstVertex],
//! e.id, contextMap[g], buf)`. The reverse direction is the edge's
//! [`overlay_graph::Edge::inverse`] — same edge ID, endpoints swapped.
//!
//! Graph-scoped collectives — `reduce`, `all_reduce`, `broadcast`, `gather`,
//! `all_gather`, and `scatter` — are vertex-rooted but peer-implemented: a
//! peer hosting several vertices of the graph invokes the underlying
//! policy-level collective once per hosted vertex, in ascending
//! [`overlay_core::VertexId`] order. Every peer must agree on this order for
//! the rounds to line up, which is why `hosted` is always the sorted output
//! of [`GraphCommunicator::local_hosted_vertices`]. Each round's policy-level
//! result is folded into a running accumulator (`reduce`/`all_reduce`) or
//! concatenated onto the running output (`gather`/`all_gather`/`scatter`).

use overlay_core::{
    CommPolicy, Element, Event, GraphId, OverlayError, ReduceOp, Result, Tag, VertexId,
};
use overlay_graph::Edge;
use overlay_nameservice::NameService;

/// Binds a [`CommPolicy`] and a [`NameService`] together to provide
/// vertex/edge-addressed communication over a single graph.
pub struct GraphCommunicator<'a, P> {
    policy: &'a P,
    names: &'a NameService,
    graph_id: GraphId,
}

impl<'a, P: CommPolicy> GraphCommunicator<'a, P> {
    pub fn new(policy: &'a P, names: &'a NameService, graph_id: GraphId) -> Self {
        Self {
            policy,
            names,
            graph_id,
        }
    }

    fn edge_tag<E: Clone>(edge: &Edge<E>) -> Tag {
        edge.id
    }

    /// Point-to-point send over `edge`, to whichever peer currently hosts
    /// `edge`'s destination vertex.
    pub async fn send<T: Element, E: Clone>(&self, edge: &Edge<E>, buf: &[T]) -> Result<()> {
        let ctx = self.names.graph_context(self.graph_id)?;
        let dst = self.names.locate_vertex(self.graph_id, edge.to)?;
        tracing::trace!(edge = edge.id.get(), dst = dst.get(), len = buf.len(), "edge send");
        self.policy.send(dst, Self::edge_tag(edge), &ctx, buf).await
    }

    /// Point-to-point receive over `edge`, from whichever peer currently
    /// hosts `edge`'s source vertex.
    pub async fn recv<T: Element, E: Clone>(&self, edge: &Edge<E>, buf: &mut [T]) -> Result<()> {
        let ctx = self.names.graph_context(self.graph_id)?;
        let src = self.names.locate_vertex(self.graph_id, edge.from)?;
        self.policy.recv(src, Self::edge_tag(edge), &ctx, buf).await
    }

    pub async fn async_send<T: Element, E: Clone>(&self, edge: &Edge<E>, buf: Vec<T>) -> Result<Event> {
        let ctx = self.names.graph_context(self.graph_id)?;
        let dst = self.names.locate_vertex(self.graph_id, edge.to)?;
        self.policy
            .async_send(dst, Self::edge_tag(edge), &ctx, buf)
            .await
    }

    pub async fn async_recv<T: Element, E: Clone>(&self, edge: &Edge<E>, len: usize) -> Result<Event> {
        let ctx = self.names.graph_context(self.graph_id)?;
        let src = self.names.locate_vertex(self.graph_id, edge.from)?;
        self.policy
            .async_recv(src, Self::edge_tag(edge), &ctx, len)
            .await
    }

    /// Broadcast a single value from `root`'s host to every peer in the
    /// graph's context.
    pub async fn broadcast<T: Element>(&self, root: VertexId, buf: &mut [T]) -> Result<()> {
        let ctx = self.names.graph_context(self.graph_id)?;
        let root_vaddr = self.names.locate_vertex(self.graph_id, root)?;
        self.policy.broadcast(root_vaddr, &ctx, buf).await
    }

    /// Reduce one contribution per hosted vertex at `root`'s host.
    ///
    /// `hosted` must be this peer's hosted vertices in ascending
    /// [`VertexId`] order; `contributions[i]` is the value vertex
    /// `hosted[i]` contributes. Every peer must call this the same number
    /// of times relative to its own hosted-vertex count for the rounds to
    /// line up; peers with fewer hosted vertices simply stop contributing
    /// once their own vertices are exhausted for this graph.
    pub async fn reduce<T: Element>(
        &self,
        root: VertexId,
        op: ReduceOp,
        hosted: &[VertexId],
        contributions: &[T],
    ) -> Result<Option<T>> {
        if hosted.len() != contributions.len() {
            return Err(OverlayError::CollectiveDesync(
                "hosted vertex count does not match contribution count".into(),
            ));
        }
        let ctx = self.names.graph_context(self.graph_id)?;
        let root_vaddr = self.names.locate_vertex(self.graph_id, root)?;

        let mut max_buf = [0i64];
        self.policy
            .all_reduce(ReduceOp::Max, &ctx, &[hosted.len() as i64], &mut max_buf)
            .await?;
        let rounds = max_buf[0].max(0) as usize;

        let mut accum: Option<T> = None;
        for round in 0..rounds {
            let send = contributions.get(round).copied().unwrap_or_else(T::zero);
            let mut round_result = [T::zero()];
            self.policy
                .reduce(root_vaddr, op, &ctx, &[send], &mut round_result)
                .await?;
            accum = Some(match accum {
                None => round_result[0],
                Some(a) => T::reduce(op, a, round_result[0]),
            });
        }
        Ok(accum)
    }

    /// Same as [`GraphCommunicator::reduce`], but every peer gets the
    /// folded result.
    pub async fn all_reduce<T: Element>(
        &self,
        op: ReduceOp,
        hosted: &[VertexId],
        contributions: &[T],
    ) -> Result<T> {
        if hosted.len() != contributions.len() {
            return Err(OverlayError::CollectiveDesync(
                "hosted vertex count does not match contribution count".into(),
            ));
        }
        let ctx = self.names.graph_context(self.graph_id)?;

        let mut max_buf = [0i64];
        self.policy
            .all_reduce(ReduceOp::Max, &ctx, &[hosted.len() as i64], &mut max_buf)
            .await?;
        let rounds = max_buf[0].max(0) as usize;

        let mut accum: Option<T> = None;
        for round in 0..rounds {
            let send = contributions.get(round).copied().unwrap_or_else(T::zero);
            let mut round_result = [T::zero()];
            self.policy
                .all_reduce(op, &ctx, &[send], &mut round_result)
                .await?;
            accum = Some(match accum {
                None => round_result[0],
                Some(a) => T::reduce(op, a, round_result[0]),
            });
        }
        accum.ok_or_else(|| {
            OverlayError::CollectiveDesync("all_reduce over an empty graph context".into())
        })
    }

    /// Gather one contribution per hosted vertex at `root`'s host. The
    /// result on `root`'s host is `context.size()` values per round,
    /// concatenated round-by-round; callers resolve a slot back to a vertex
    /// via [`NameService::hosted_vertices`] in the same ascending order used
    /// to drive the rounds.
    pub async fn gather<T: Element>(
        &self,
        root: VertexId,
        hosted: &[VertexId],
        contributions: &[T],
    ) -> Result<Vec<T>> {
        let ctx = self.names.graph_context(self.graph_id)?;
        let root_vaddr = self.names.locate_vertex(self.graph_id, root)?;

        let mut max_buf = [0i64];
        self.policy
            .all_reduce(ReduceOp::Max, &ctx, &[hosted.len() as i64], &mut max_buf)
            .await?;
        let rounds = max_buf[0].max(0) as usize;

        let mut out = Vec::with_capacity(rounds * ctx.size());
        for round in 0..rounds {
            let send = contributions.get(round).copied().unwrap_or_else(T::zero);
            let mut round_result = vec![T::zero(); ctx.size()];
            self.policy
                .gather(root_vaddr, &ctx, &[send], &mut round_result)
                .await?;
            out.extend(round_result);
        }
        Ok(out)
    }

    /// Same as [`GraphCommunicator::gather`], but every peer gets the full
    /// concatenated result instead of only `root`'s host.
    pub async fn all_gather<T: Element>(
        &self,
        hosted: &[VertexId],
        contributions: &[T],
    ) -> Result<Vec<T>> {
        if hosted.len() != contributions.len() {
            return Err(OverlayError::CollectiveDesync(
                "hosted vertex count does not match contribution count".into(),
            ));
        }
        let ctx = self.names.graph_context(self.graph_id)?;

        let mut max_buf = [0i64];
        self.policy
            .all_reduce(ReduceOp::Max, &ctx, &[hosted.len() as i64], &mut max_buf)
            .await?;
        let rounds = max_buf[0].max(0) as usize;

        let mut out = Vec::with_capacity(rounds * ctx.size());
        for round in 0..rounds {
            let send = contributions.get(round).copied().unwrap_or_else(T::zero);
            let mut round_result = vec![T::zero(); ctx.size()];
            self.policy
                .all_gather(&ctx, &[send], &mut round_result)
                .await?;
            out.extend(round_result);
        }
        Ok(out)
    }

    /// Scatter one value per hosted vertex from `root`'s host. `send` is only
    /// meaningful on `root`'s host: `context.size()` values per round,
    /// concatenated round-by-round in the same layout [`GraphCommunicator::gather`]
    /// produces, so a prior gather's output can be fed straight back in as a
    /// scatter. Peers other than `root`'s host may pass an empty `send`. The
    /// result is one value per round, in the same ascending-vertex order as
    /// `hosted`; a peer hosting fewer vertices than the round count simply
    /// ignores the trailing rounds.
    pub async fn scatter<T: Element>(
        &self,
        root: VertexId,
        hosted: &[VertexId],
        send: &[T],
    ) -> Result<Vec<T>> {
        let ctx = self.names.graph_context(self.graph_id)?;
        let root_vaddr = self.names.locate_vertex(self.graph_id, root)?;

        let mut max_buf = [0i64];
        self.policy
            .all_reduce(ReduceOp::Max, &ctx, &[hosted.len() as i64], &mut max_buf)
            .await?;
        let rounds = max_buf[0].max(0) as usize;

        let mut out = Vec::with_capacity(rounds);
        for round in 0..rounds {
            let round_send = send
                .get(round * ctx.size()..(round + 1) * ctx.size())
                .unwrap_or(&[]);
            let mut recv = [T::zero()];
            self.policy
                .scatter(root_vaddr, &ctx, round_send, &mut recv)
                .await?;
            out.push(recv[0]);
        }
        Ok(out)
    }

    /// This peer's hosted vertices for the graph, sorted ascending — the
    /// order collectives above expect `hosted`/`contributions` to follow.
    pub fn local_hosted_vertices(&self) -> Result<Vec<VertexId>> {
        let ctx = self.names.graph_context(self.graph_id)?;
        let vaddr = ctx
            .get_vaddr()
            .ok_or(OverlayError::ContextMismatch(ctx.id()))?;
        let mut vertices = self.names.hosted_vertices(self.graph_id, vaddr)?;
        vertices.sort_unstable();
        Ok(vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_core::{GraphId as Gid, ReduceOp, VertexId as Vid};
    use overlay_graph::{DirectedMultigraph, Vertex};
    use overlay_transport::MockNetwork;

    fn ring_graph(n: usize) -> DirectedMultigraph<(), ()> {
        let vertices = (0..n).map(|i| Vertex::new(Vid::new(i as u32), ())).collect();
        let edges = (0..n)
            .map(|i| {
                overlay_graph::Edge::new(
                    overlay_core::EdgeId::new(i as u32),
                    Vid::new(i as u32),
                    Vid::new(((i + 1) % n) as u32),
                    (),
                )
            })
            .collect();
        DirectedMultigraph::new(Gid::new(0), vertices, edges)
    }

    #[tokio::test]
    async fn ring_all_gather_collects_every_vertex_id() {
        let n = 8;
        let peer_count = 4;
        let net = MockNetwork::new(peer_count);
        let graph = std::sync::Arc::new(ring_graph(n));

        let mut handles = Vec::new();
        for peer in 0..peer_count {
            let policy = net.policy(peer);
            let graph = graph.clone();
            handles.push(tokio::spawn(async move {
                let ns = NameService::new();
                let hosted: Vec<Vid> = (0..n)
                    .filter(|v| overlay_pattern_shard(*v, peer, peer_count))
                    .map(|v| Vid::new(v as u32))
                    .collect();
                ns.announce(&*policy, &*graph, &hosted).await.unwrap();

                let comm = GraphCommunicator::new(&*policy, &ns, Gid::new(0));
                let local_hosted = comm.local_hosted_vertices().unwrap();
                let contributions: Vec<i64> =
                    local_hosted.iter().map(|v| v.get() as i64).collect();
                comm.all_gather(&local_hosted, &contributions).await.unwrap()
            }));
        }
        let mut expected: Vec<i64> = (0..n as i64).collect();
        expected.sort_unstable();
        for h in handles {
            let mut got = h.await.unwrap();
            got.sort_unstable();
            assert_eq!(got, expected);
        }
    }

    #[tokio::test]
    async fn ring_scatter_hands_each_host_its_vertex_id() {
        let n = 8;
        let peer_count = 4;
        let net = MockNetwork::new(peer_count);
        let graph = std::sync::Arc::new(ring_graph(n));

        let mut handles = Vec::new();
        for peer in 0..peer_count {
            let policy = net.policy(peer);
            let graph = graph.clone();
            handles.push(tokio::spawn(async move {
                let ns = NameService::new();
                let hosted: Vec<Vid> = (0..n)
                    .filter(|v| overlay_pattern_shard(*v, peer, peer_count))
                    .map(|v| Vid::new(v as u32))
                    .collect();
                ns.announce(&*policy, &*graph, &hosted).await.unwrap();

                let comm = GraphCommunicator::new(&*policy, &ns, Gid::new(0));
                let local_hosted = comm.local_hosted_vertices().unwrap();

                // Root (vertex 0's host) scatters each peer's own vertex IDs
                // back at it, one value per round, in ascending-vertex order.
                let root = Vid::new(0);
                let root_host = ns.locate_vertex(Gid::new(0), root).unwrap();
                let my_vaddr = ns.graph_context(Gid::new(0)).unwrap().get_vaddr().unwrap();
                let rounds = n.div_ceil(peer_count);
                let send = if my_vaddr == root_host {
                    let ctx = ns.graph_context(Gid::new(0)).unwrap();
                    let mut buf = vec![0i64; rounds * ctx.size()];
                    for r in 0..rounds {
                        for p in 0..peer_count {
                            let vertices: Vec<usize> = (0..n)
                                .filter(|v| overlay_pattern_shard(*v, p, peer_count))
                                .collect();
                            buf[r * ctx.size() + p] =
                                vertices.get(r).map(|v| *v as i64).unwrap_or(-1);
                        }
                    }
                    buf
                } else {
                    Vec::new()
                };
                let got = comm.scatter(root, &local_hosted, &send).await.unwrap();
                (local_hosted, got)
            }));
        }
        for h in handles {
            let (hosted, got) = h.await.unwrap();
            for (i, v) in hosted.iter().enumerate() {
                assert_eq!(got[i], v.get() as i64);
            }
        }
    }

    #[tokio::test]
    async fn ring_all_reduce_sums_vertex_ids() {
        let n = 8;
        let peer_count = 4;
        let net = MockNetwork::new(peer_count);
        let graph = std::sync::Arc::new(ring_graph(n));

        let mut handles = Vec::new();
        for peer in 0..peer_count {
            let policy = net.policy(peer);
            let graph = graph.clone();
            handles.push(tokio::spawn(async move {
                let ns = NameService::new();
                let hosted: Vec<Vid> = (0..n)
                    .filter(|v| overlay_pattern_shard(*v, peer, peer_count))
                    .map(|v| Vid::new(v as u32))
                    .collect();
                ns.announce(&*policy, &*graph, &hosted).await.unwrap();

                let comm = GraphCommunicator::new(&*policy, &ns, Gid::new(0));
                let local_hosted = comm.local_hosted_vertices().unwrap();
                let contributions: Vec<i64> =
                    local_hosted.iter().map(|v| v.get() as i64).collect();
                comm.all_reduce(ReduceOp::Sum, &local_hosted, &contributions)
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), (0..n as i64).sum::<i64>());
        }
    }

    fn overlay_pattern_shard(vertex: usize, peer: usize, peer_count: usize) -> bool {
        vertex % peer_count == peer
    }
}
