//! Vertex-to-peer sharding functions
//!
//! A mapping is a pure, deterministic function `(peerId, peerCount,
//! vertexCount) -> list<VertexId>` assigning each peer the vertices it
//! hosts. For any fixed `(peerCount, vertexCount)` the shards must partition
//! the full vertex set: every vertex goes to exactly one peer.

use overlay_core::VertexId;

pub trait Mapping {
    /// The vertices peer `peer_id` (of `peer_count` total peers) hosts, out
    /// of a graph with `vertex_count` vertices.
    fn shard(peer_id: usize, peer_count: usize, vertex_count: usize) -> Vec<VertexId>;
}

/// Contiguous blocks of `ceil(vertex_count / peer_count)` vertices each:
/// every peer but the last gets a full block, and the last non-empty peer
/// gets whatever remains (possibly nothing, if `peer_count` outruns
/// `vertex_count`).
pub struct Consecutive;

impl Mapping for Consecutive {
    fn shard(peer_id: usize, peer_count: usize, vertex_count: usize) -> Vec<VertexId> {
        if peer_count == 0 || peer_id >= peer_count {
            return Vec::new();
        }
        let per_peer = vertex_count.div_ceil(peer_count);
        let start = peer_id * per_peer;
        if start >= vertex_count {
            return Vec::new();
        }
        let end = (start + per_peer).min(vertex_count);

        (start..end).map(|i| VertexId::new(i as u32)).collect()
    }
}

/// Vertex `i` goes to peer `i % peer_count`.
pub struct Roundrobin;

impl Mapping for Roundrobin {
    fn shard(peer_id: usize, peer_count: usize, vertex_count: usize) -> Vec<VertexId> {
        if peer_count == 0 || peer_id >= peer_count {
            return Vec::new();
        }
        (0..vertex_count)
            .filter(|i| i % peer_count == peer_id)
            .map(|i| VertexId::new(i as u32))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_partitions<M: Mapping>(peer_count: usize, vertex_count: usize) {
        let mut seen = std::collections::HashSet::new();
        for peer_id in 0..peer_count {
            for v in M::shard(peer_id, peer_count, vertex_count) {
                assert!(seen.insert(v), "vertex {v:?} assigned to more than one peer");
            }
        }
        assert_eq!(seen.len(), vertex_count);
    }

    #[test]
    fn consecutive_partitions_evenly_and_unevenly() {
        assert_partitions::<Consecutive>(4, 16);
        assert_partitions::<Consecutive>(3, 10);
        assert_partitions::<Consecutive>(5, 3);
    }

    #[test]
    fn roundrobin_partitions_evenly_and_unevenly() {
        assert_partitions::<Roundrobin>(4, 16);
        assert_partitions::<Roundrobin>(3, 10);
        assert_partitions::<Roundrobin>(5, 3);
    }

    proptest! {
        #[test]
        fn consecutive_is_a_partition_for_any_size(peer_count in 1usize..12, vertex_count in 0usize..200) {
            assert_partitions::<Consecutive>(peer_count, vertex_count);
        }

        #[test]
        fn roundrobin_is_a_partition_for_any_size(peer_count in 1usize..12, vertex_count in 0usize..200) {
            assert_partitions::<Roundrobin>(peer_count, vertex_count);
        }
    }
}
