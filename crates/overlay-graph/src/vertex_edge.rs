//! Vertex and edge records

use serde::{Deserialize, Serialize};

use overlay_core::{EdgeId, VertexId};

/// A graph node: a stable ID within its graph plus a user-defined payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex<V> {
    pub id: VertexId,
    pub data: V,
}

impl<V> Vertex<V> {
    pub fn new(id: VertexId, data: V) -> Self {
        Self { id, data }
    }
}

/// A directed graph edge: knows its endpoints and carries a user-defined
/// payload. The edge ID doubles as the tag used to address traffic over it
/// ((src, dst, id) is unique within a graph's context).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge<E> {
    pub id: EdgeId,
    pub from: VertexId,
    pub to: VertexId,
    pub data: E,
}

impl<E: Clone> Edge<E> {
    pub fn new(id: EdgeId, from: VertexId, to: VertexId, data: E) -> Self {
        Self { id, from, to, data }
    }

    /// The edge addressing the reverse direction of `self`, for reply
    /// traffic. Shares the edge ID and payload; only the endpoints swap.
    pub fn inverse(&self) -> Self {
        Self {
            id: self.id,
            from: self.to,
            to: self.from,
            data: self.data.clone(),
        }
    }
}
