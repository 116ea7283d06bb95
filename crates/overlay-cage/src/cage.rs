//! The Cage: a single facade over a policy, a graph, and the name service

use overlay_core::{CommPolicy, Context, EdgeId, Element, Event, GraphId, OverlayError, ReduceOp, Result, VertexId};
use overlay_graph::{DirectedMultigraph, Edge, GraphPolicy, Vertex};
use overlay_nameservice::NameService;
use overlay_pattern::{GraphDescription, Mapping};

use overlay_comm::GraphCommunicator;

use crate::config::CageConfig;

/// Owns one communication-policy instance, one materialized graph, a name
/// service, and drives the graph communicator over them.
///
/// `V` and `E` are the user-defined vertex/edge payload types of the graph
/// currently held by this cage.
pub struct Cage<P, V, E> {
    policy: P,
    names: NameService,
    config: CageConfig,
    graph: Option<DirectedMultigraph<V, E>>,
    hosted: Vec<VertexId>,
}

impl<P: CommPolicy, V, E> Cage<P, V, E> {
    pub fn new(policy: P, config: CageConfig) -> Self {
        Self {
            policy,
            names: NameService::new(),
            config,
            graph: None,
            hosted: Vec::new(),
        }
    }

    pub fn config(&self) -> &CageConfig {
        &self.config
    }

    /// The context containing every peer in the network.
    pub fn peers(&self) -> Context {
        self.policy.global_context()
    }

    fn graph(&self) -> Result<&DirectedMultigraph<V, E>> {
        self.graph.as_ref().ok_or_else(|| {
            OverlayError::ConfigInvalid("no graph set; call set_graph first".into())
        })
    }

    /// When `config.abort_on_directory_miss` is set, turn a
    /// [`OverlayError::DirectoryMiss`] into a process abort instead of
    /// returning it to the caller. Every other error, and every `Ok`, passes
    /// through unchanged.
    fn check_miss<T>(&self, result: Result<T>) -> Result<T> {
        if self.config.abort_on_directory_miss {
            if let Err(OverlayError::DirectoryMiss { graph, what }) = &result {
                tracing::error!(?graph, %what, "directory miss, aborting (abort_on_directory_miss is set)");
                std::process::exit(1);
            }
        }
        result
    }

    /// Materialize a graph from a pattern's [`GraphDescription`]. `vertex_fn`
    /// and `edge_fn` attach user payloads to each vertex/edge; patterns
    /// themselves carry no payloads, only topology.
    pub fn set_graph(
        &mut self,
        graph_id: GraphId,
        description: GraphDescription,
        vertex_fn: impl Fn(VertexId) -> V,
        edge_fn: impl Fn(EdgeId, VertexId, VertexId) -> E,
    ) -> &DirectedMultigraph<V, E>
    where
        E: Clone,
    {
        let vertices = (0..description.vertex_count)
            .map(|i| {
                let id = VertexId::new(i as u32);
                Vertex::new(id, vertex_fn(id))
            })
            .collect();
        let edges = description
            .edges
            .iter()
            .enumerate()
            .map(|(i, &(from, to))| {
                let id = EdgeId::new(i as u32);
                Edge::new(id, from, to, edge_fn(id, from, to))
            })
            .collect();
        self.graph = Some(DirectedMultigraph::new(graph_id, vertices, edges));
        self.hosted.clear();
        self.graph.as_ref().unwrap()
    }

    /// Shard the current graph's vertices onto peers with mapping `M` and
    /// announce the result (Variant A). Defaults to
    /// [`overlay_pattern::Consecutive`] when `M` is left to inference at the
    /// call site with a turbofish, e.g. `cage.distribute::<Consecutive>()`.
    pub async fn distribute<M: Mapping>(&mut self) -> Result<&[VertexId]>
    where
        E: Clone,
    {
        let graph = self.graph()?;
        let hosted = M::shard(self.config.peer_id, self.config.peer_count, graph.vertices().len());
        self.names.announce(&self.policy, graph, &hosted).await?;
        self.hosted = hosted;
        Ok(&self.hosted)
    }

    /// Re-shard and re-announce the current graph (Variant B): peers that
    /// end up with no hosted vertices drop out of the graph's context.
    pub async fn reannounce<M: Mapping>(&mut self) -> Result<&[VertexId]>
    where
        E: Clone,
    {
        let graph = self.graph()?;
        let hosted = M::shard(self.config.peer_id, self.config.peer_count, graph.vertices().len());
        self.names.announce_reannounce(&self.policy, graph, &hosted).await?;
        self.hosted = hosted;
        Ok(&self.hosted)
    }

    /// Announce an explicit hosted-vertex set rather than deriving it from
    /// a [`Mapping`] — used to materialize and announce a sub-graph of the
    /// currently-held graph.
    pub async fn announce_subgraph(
        &mut self,
        sub_graph_id: GraphId,
        vertex_subset: &[VertexId],
        hosted: &[VertexId],
    ) -> Result<()>
    where
        V: Clone,
        E: Clone,
    {
        let sub = self.graph()?.subgraph(sub_graph_id, vertex_subset);
        self.names.announce(&self.policy, &sub, hosted).await?;
        Ok(())
    }

    pub fn get_vertex(&self, i: VertexId) -> Result<&Vertex<V>> {
        self.graph()?
            .vertex(i)
            .ok_or_else(|| OverlayError::ConfigInvalid(format!("no such vertex {i}")))
    }

    pub fn out_edges(&self, v: VertexId) -> Result<Vec<(VertexId, &Edge<E>)>> {
        Ok(self.graph()?.out_edges(v))
    }

    pub fn in_edges(&self, v: VertexId) -> Result<Vec<(VertexId, &Edge<E>)>> {
        Ok(self.graph()?.in_edges(v))
    }

    pub fn hosted_vertices(&self) -> &[VertexId] {
        &self.hosted
    }

    pub fn locate_vertex(&self, graph_id: GraphId, v: VertexId) -> Result<overlay_core::VAddr> {
        self.check_miss(self.names.locate_vertex(graph_id, v))
    }

    /// The context `graph_id`'s hosts communicate over. Invalid (not a
    /// member) for a peer that was excluded by the most recent announce.
    pub fn graph_context(&self, graph_id: GraphId) -> Result<Context> {
        self.check_miss(self.names.graph_context(graph_id))
    }

    fn communicator(&self, graph_id: GraphId) -> GraphCommunicator<'_, P> {
        GraphCommunicator::new(&self.policy, &self.names, graph_id)
    }

    pub async fn send<T: Element>(&self, graph_id: GraphId, edge: &Edge<E>, buf: &[T]) -> Result<()>
    where
        E: Clone,
    {
        self.check_miss(self.communicator(graph_id).send(edge, buf).await)
    }

    pub async fn recv<T: Element>(&self, graph_id: GraphId, edge: &Edge<E>, buf: &mut [T]) -> Result<()>
    where
        E: Clone,
    {
        self.check_miss(self.communicator(graph_id).recv(edge, buf).await)
    }

    pub async fn async_send<T: Element>(
        &self,
        graph_id: GraphId,
        edge: &Edge<E>,
        buf: Vec<T>,
    ) -> Result<Event>
    where
        E: Clone,
    {
        self.check_miss(self.communicator(graph_id).async_send(edge, buf).await)
    }

    pub async fn async_recv<T: Element>(
        &self,
        graph_id: GraphId,
        edge: &Edge<E>,
        len: usize,
    ) -> Result<Event>
    where
        E: Clone,
    {
        self.check_miss(self.communicator(graph_id).async_recv(edge, len).await)
    }

    pub async fn broadcast<T: Element>(&self, graph_id: GraphId, root: VertexId, buf: &mut [T]) -> Result<()> {
        self.check_miss(self.communicator(graph_id).broadcast(root, buf).await)
    }

    pub async fn reduce<T: Element>(
        &self,
        graph_id: GraphId,
        root: VertexId,
        op: ReduceOp,
        contributions: &[T],
    ) -> Result<Option<T>> {
        let hosted: Vec<VertexId> = self.check_miss(self.communicator(graph_id).local_hosted_vertices())?;
        self.check_miss(
            self.communicator(graph_id)
                .reduce(root, op, &hosted, contributions)
                .await,
        )
    }

    pub async fn all_reduce<T: Element>(
        &self,
        graph_id: GraphId,
        op: ReduceOp,
        contributions: &[T],
    ) -> Result<T> {
        let hosted: Vec<VertexId> = self.check_miss(self.communicator(graph_id).local_hosted_vertices())?;
        self.check_miss(
            self.communicator(graph_id)
                .all_reduce(op, &hosted, contributions)
                .await,
        )
    }

    pub async fn gather<T: Element>(
        &self,
        graph_id: GraphId,
        root: VertexId,
        contributions: &[T],
    ) -> Result<Vec<T>> {
        let hosted: Vec<VertexId> = self.check_miss(self.communicator(graph_id).local_hosted_vertices())?;
        self.check_miss(
            self.communicator(graph_id)
                .gather(root, &hosted, contributions)
                .await,
        )
    }

    pub async fn all_gather<T: Element>(&self, graph_id: GraphId, contributions: &[T]) -> Result<Vec<T>> {
        let hosted: Vec<VertexId> = self.check_miss(self.communicator(graph_id).local_hosted_vertices())?;
        self.check_miss(
            self.communicator(graph_id)
                .all_gather(&hosted, contributions)
                .await,
        )
    }

    pub async fn scatter<T: Element>(
        &self,
        graph_id: GraphId,
        root: VertexId,
        send: &[T],
    ) -> Result<Vec<T>> {
        let hosted: Vec<VertexId> = self.check_miss(self.communicator(graph_id).local_hosted_vertices())?;
        self.check_miss(
            self.communicator(graph_id)
                .scatter(root, &hosted, send)
                .await,
        )
    }
}
