//! # overlay-graph
//!
//! The graph-policy contract: a purely local, deterministic view over
//! a directed multigraph with typed vertex/edge properties, neighbor
//! iteration, and sub-graph carving. [`DirectedMultigraph`] is the default
//! in-memory implementation; callers needing a different representation
//! (e.g. backed by an external graph database) implement [`GraphPolicy`]
//! directly.

mod graph;
mod vertex_edge;

pub use graph::{DirectedMultigraph, GraphPolicy};
pub use vertex_edge::{Edge, Vertex};
