//! The graph-policy contract and its default implementation

use std::collections::HashMap;

use overlay_core::{EdgeId, GraphId, VertexId};

use crate::vertex_edge::{Edge, Vertex};

/// Purely local, deterministic view over a directed multigraph: vertex and
/// edge collections, neighbor iteration, sub-graph carving. No communication,
/// no randomness — every method is a pure function of the graph's contents.
pub trait GraphPolicy<V, E> {
    fn graph_id(&self) -> GraphId;
    fn vertices(&self) -> &[Vertex<V>];
    fn edges(&self) -> &[Edge<E>];
    fn vertex(&self, id: VertexId) -> Option<&Vertex<V>>;
    fn edge(&self, id: EdgeId) -> Option<&Edge<E>>;

    /// The dense local index of `v` among this graph's vertices, used for
    /// tagging and directory keys.
    fn local_id(&self, v: VertexId) -> Option<usize>;

    /// `(neighbor, edge)` pairs for edges directed into `v`.
    fn in_edges(&self, v: VertexId) -> Vec<(VertexId, &Edge<E>)>;

    /// `(neighbor, edge)` pairs for edges directed out of `v`.
    fn out_edges(&self, v: VertexId) -> Vec<(VertexId, &Edge<E>)>;

    /// The parent graph in a sub-graph hierarchy, if this graph was carved
    /// from another via [`GraphPolicy::subgraph`].
    fn super_graph(&self) -> Option<GraphId>;

    /// A textual DOT rendering, for debugging and visualization.
    fn to_dot(&self) -> String {
        let mut out = format!("digraph g{} {{\n", self.graph_id());
        for v in self.vertices() {
            out.push_str(&format!("  v{};\n", v.id));
        }
        for e in self.edges() {
            out.push_str(&format!("  v{} -> v{} [label=\"e{}\"];\n", e.from, e.to, e.id));
        }
        out.push_str("}\n");
        out
    }
}

/// A concrete, in-memory directed multigraph keyed by dense vertex/edge IDs.
///
/// `new_id` is this graph's own ID; `super_graph` records the parent graph
/// when this instance was carved out of another via [`DirectedMultigraph::subgraph`].
#[derive(Debug, Clone)]
pub struct DirectedMultigraph<V, E> {
    id: GraphId,
    super_graph: Option<GraphId>,
    vertices: Vec<Vertex<V>>,
    edges: Vec<Edge<E>>,
    index_of: HashMap<VertexId, usize>,
    out_adj: HashMap<VertexId, Vec<usize>>,
    in_adj: HashMap<VertexId, Vec<usize>>,
}

impl<V, E> DirectedMultigraph<V, E> {
    pub fn new(id: GraphId, vertices: Vec<Vertex<V>>, edges: Vec<Edge<E>>) -> Self {
        Self::with_super_graph(id, None, vertices, edges)
    }

    pub fn with_super_graph(
        id: GraphId,
        super_graph: Option<GraphId>,
        vertices: Vec<Vertex<V>>,
        edges: Vec<Edge<E>>,
    ) -> Self {
        let index_of: HashMap<VertexId, usize> = vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (v.id, i))
            .collect();

        let mut out_adj: HashMap<VertexId, Vec<usize>> = HashMap::new();
        let mut in_adj: HashMap<VertexId, Vec<usize>> = HashMap::new();
        for (i, e) in edges.iter().enumerate() {
            out_adj.entry(e.from).or_default().push(i);
            in_adj.entry(e.to).or_default().push(i);
        }

        Self {
            id,
            super_graph,
            vertices,
            edges,
            index_of,
            out_adj,
            in_adj,
        }
    }
}

impl<V, E> GraphPolicy<V, E> for DirectedMultigraph<V, E> {
    fn graph_id(&self) -> GraphId {
        self.id
    }

    fn vertices(&self) -> &[Vertex<V>] {
        &self.vertices
    }

    fn edges(&self) -> &[Edge<E>] {
        &self.edges
    }

    fn vertex(&self, id: VertexId) -> Option<&Vertex<V>> {
        self.index_of.get(&id).map(|&i| &self.vertices[i])
    }

    fn edge(&self, id: EdgeId) -> Option<&Edge<E>> {
        self.edges.iter().find(|e| e.id == id)
    }

    fn local_id(&self, v: VertexId) -> Option<usize> {
        self.index_of.get(&v).copied()
    }

    fn in_edges(&self, v: VertexId) -> Vec<(VertexId, &Edge<E>)> {
        self.in_adj
            .get(&v)
            .into_iter()
            .flatten()
            .map(|&i| {
                let e = &self.edges[i];
                (e.from, e)
            })
            .collect()
    }

    fn out_edges(&self, v: VertexId) -> Vec<(VertexId, &Edge<E>)> {
        self.out_adj
            .get(&v)
            .into_iter()
            .flatten()
            .map(|&i| {
                let e = &self.edges[i];
                (e.to, e)
            })
            .collect()
    }

    fn super_graph(&self) -> Option<GraphId> {
        self.super_graph
    }
}

impl<V: Clone, E: Clone> DirectedMultigraph<V, E> {
    /// Carve a sub-graph from a vertex subset, preserving vertex and edge
    /// IDs. Only edges with both endpoints in `subset` survive.
    pub fn subgraph(&self, new_id: GraphId, subset: &[VertexId]) -> Self {
        let keep: std::collections::HashSet<VertexId> = subset.iter().copied().collect();
        let vertices: Vec<Vertex<V>> = self
            .vertices
            .iter()
            .filter(|v| keep.contains(&v.id))
            .cloned()
            .collect();
        let edges: Vec<Edge<E>> = self
            .edges
            .iter()
            .filter(|e| keep.contains(&e.from) && keep.contains(&e.to))
            .cloned()
            .collect();
        Self::with_super_graph(new_id, Some(self.id), vertices, edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DirectedMultigraph<&'static str, ()> {
        let vertices = vec![
            Vertex::new(VertexId::new(0), "a"),
            Vertex::new(VertexId::new(1), "b"),
            Vertex::new(VertexId::new(2), "c"),
        ];
        let edges = vec![
            Edge::new(EdgeId::new(0), VertexId::new(0), VertexId::new(1), ()),
            Edge::new(EdgeId::new(1), VertexId::new(1), VertexId::new(2), ()),
        ];
        DirectedMultigraph::new(GraphId::new(0), vertices, edges)
    }

    #[test]
    fn local_id_is_dense_insertion_order() {
        let g = sample();
        assert_eq!(g.local_id(VertexId::new(0)), Some(0));
        assert_eq!(g.local_id(VertexId::new(2)), Some(2));
        assert_eq!(g.local_id(VertexId::new(99)), None);
    }

    #[test]
    fn out_and_in_edges_follow_direction() {
        let g = sample();
        let out = g.out_edges(VertexId::new(1));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, VertexId::new(2));

        let inn = g.in_edges(VertexId::new(1));
        assert_eq!(inn.len(), 1);
        assert_eq!(inn[0].0, VertexId::new(0));
    }

    #[test]
    fn subgraph_preserves_ids_and_drops_cut_edges() {
        let g = sample();
        let sub = g.subgraph(GraphId::new(1), &[VertexId::new(0), VertexId::new(1)]);
        assert_eq!(sub.vertices().len(), 2);
        assert_eq!(sub.edges().len(), 1);
        assert_eq!(sub.super_graph(), Some(GraphId::new(0)));
        assert_eq!(sub.vertex(VertexId::new(0)).unwrap().data, "a");
    }

    #[test]
    fn to_dot_contains_vertices_and_edges() {
        let g = sample();
        let dot = g.to_dot();
        assert!(dot.contains("v0"));
        assert!(dot.contains("v0 -> v1"));
    }
}
