//! End-to-end scenarios exercising the full policy/graph/name-service/communicator stack.

use overlay_cage::{Cage, CageConfig};
use overlay_core::{GraphId, OverlayError, ReduceOp, VertexId};
use overlay_pattern::{Consecutive, GraphDescription, Roundrobin, chain, grid, ring};
use overlay_transport::MockNetwork;

#[tokio::test]
async fn bistar_request_reply() {
    let net = MockNetwork::new(2);
    let graph_id = GraphId::new(1);

    let mut handles = Vec::new();
    for peer in 0..2 {
        let policy = net.policy(peer);
        handles.push(tokio::spawn(async move {
            let mut cage: Cage<_, (), ()> = Cage::new(policy, CageConfig::new(peer, 2));
            cage.set_graph(graph_id, overlay_pattern::bi_star(4), |_| (), |_, _, _| ());
            cage.distribute::<Consecutive>().await.unwrap();

            let hub = VertexId::new(0);
            let hosted = cage.hosted_vertices().to_vec();

            if hosted.contains(&hub) {
                for (_, edge) in cage.out_edges(hub).unwrap() {
                    let edge = edge.clone();
                    cage.send(graph_id, &edge, &[42i64]).await.unwrap();
                }
            }

            for v in &hosted {
                if *v == hub {
                    continue;
                }
                for (_, edge) in cage.in_edges(*v).unwrap() {
                    let edge = edge.clone();
                    let mut req = [0i64];
                    cage.recv(graph_id, &edge, &mut req).await.unwrap();
                    let reply: Vec<_> = cage
                        .out_edges(*v)
                        .unwrap()
                        .into_iter()
                        .map(|(_, e)| e.clone())
                        .collect();
                    for reply_edge in reply {
                        cage.send(graph_id, &reply_edge, &[req[0] * 2]).await.unwrap();
                    }
                }
            }

            if hosted.contains(&hub) {
                let mut replies = Vec::new();
                for (_, edge) in cage.in_edges(hub).unwrap() {
                    let edge = edge.clone();
                    let mut buf = [0i64];
                    cage.recv(graph_id, &edge, &mut buf).await.unwrap();
                    replies.push(buf[0]);
                }
                replies.sort_unstable();
                assert_eq!(replies, vec![84, 84, 84]);
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
}

#[tokio::test]
async fn ring_reduce_yields_sum_of_vertex_ids() {
    let n = 8;
    let peer_count = 4;
    let net = MockNetwork::new(peer_count);
    let graph_id = GraphId::new(2);

    let mut handles = Vec::new();
    for peer in 0..peer_count {
        let policy = net.policy(peer);
        handles.push(tokio::spawn(async move {
            let mut cage: Cage<_, i64, ()> = Cage::new(policy, CageConfig::new(peer, peer_count));
            cage.set_graph(graph_id, ring(n), |v| v.get() as i64, |_, _, _| ());
            cage.distribute::<Consecutive>().await.unwrap();

            let contributions: Vec<i64> = cage
                .hosted_vertices()
                .iter()
                .map(|v| cage.get_vertex(*v).unwrap().data)
                .collect();

            cage.all_reduce(graph_id, ReduceOp::Sum, &contributions)
                .await
                .unwrap()
        }));
    }
    for h in handles {
        assert_eq!(h.await.unwrap(), (0..n as i64).sum::<i64>());
    }
}

#[tokio::test]
async fn grid_diagonal_exchange_matches_neighbor_ids() {
    let width = 4;
    let height = 4;
    let peer_count = 4;
    let net = MockNetwork::new(peer_count);
    let graph_id = GraphId::new(3);

    let full = grid(width, height, true);
    let orthogonal = grid(width, height, false);
    let diagonal_edges: Vec<_> = full
        .edges
        .iter()
        .filter(|e| !orthogonal.edges.contains(e))
        .copied()
        .collect();
    let description = GraphDescription {
        vertex_count: full.vertex_count,
        edges: diagonal_edges,
    };

    let mut handles = Vec::new();
    for peer in 0..peer_count {
        let policy = net.policy(peer);
        let description = description.clone();
        handles.push(tokio::spawn(async move {
            let mut cage: Cage<_, i64, ()> = Cage::new(policy, CageConfig::new(peer, peer_count));
            cage.set_graph(graph_id, description, |v| v.get() as i64, |_, _, _| ());
            cage.distribute::<Roundrobin>().await.unwrap();

            for v in cage.hosted_vertices().to_vec() {
                for (_, edge) in cage.out_edges(v).unwrap() {
                    let edge = edge.clone();
                    cage.send(graph_id, &edge, &[v.get() as i64]).await.unwrap();
                }
            }
            for v in cage.hosted_vertices().to_vec() {
                for (neighbor, edge) in cage.in_edges(v).unwrap() {
                    let edge = edge.clone();
                    let mut buf = [0i64];
                    cage.recv(graph_id, &edge, &mut buf).await.unwrap();
                    assert_eq!(buf[0], neighbor.get() as i64);
                }
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
}

#[tokio::test]
async fn subgraph_announce_excludes_peers_outside_the_subset() {
    let peer_count = 3;
    let net = MockNetwork::new(peer_count);
    let full_graph_id = GraphId::new(4);
    let sub_graph_id = GraphId::new(5);

    let mut handles = Vec::new();
    for peer in 0..peer_count {
        let policy = net.policy(peer);
        handles.push(tokio::spawn(async move {
            let mut cage: Cage<_, (), ()> = Cage::new(policy, CageConfig::new(peer, peer_count));
            cage.set_graph(full_graph_id, ring(6), |_| (), |_, _, _| ());
            cage.distribute::<Consecutive>().await.unwrap();

            // Sub-graph over the first two vertices only; peer 0 hosts them
            // under Consecutive sharding of 6 vertices across 3 peers.
            let subset = [VertexId::new(0), VertexId::new(1)];
            let hosted: Vec<_> = cage
                .hosted_vertices()
                .iter()
                .copied()
                .filter(|v| subset.contains(v))
                .collect();
            cage.announce_subgraph(sub_graph_id, &subset, &hosted)
                .await
                .unwrap();

            // Every original peer resolves the directory entry (the
            // announce round broadcasts across the full supergraph context),
            // but only the peer actually hosting subset vertices ends up a
            // member of the sub-graph's own communication context.
            let located_ok = cage.locate_vertex(sub_graph_id, VertexId::new(0)).is_ok();
            let member_of_sub_context = cage.graph_context(sub_graph_id).unwrap().valid();
            (peer, located_ok, member_of_sub_context)
        }));
    }
    for h in handles {
        let (peer, located_ok, member_of_sub_context) = h.await.unwrap();
        assert!(located_ok);
        assert_eq!(member_of_sub_context, peer == 0);
    }
}

#[tokio::test]
async fn reannounce_drops_peers_with_no_hosted_vertices() {
    let peer_count = 4;
    let net = MockNetwork::new(peer_count);
    let graph_id = GraphId::new(6);

    let mut handles = Vec::new();
    for peer in 0..peer_count {
        let policy = net.policy(peer);
        handles.push(tokio::spawn(async move {
            let mut cage: Cage<_, (), ()> = Cage::new(policy, CageConfig::new(peer, peer_count));
            cage.set_graph(graph_id, chain(4), |_| (), |_, _, _| ());
            cage.distribute::<Consecutive>().await.unwrap();

            // Shrink: the same graph now has only 2 vertices, so under
            // Consecutive sharding peers 2 and 3 lose their vertex.
            cage.set_graph(graph_id, chain(2), |_| (), |_, _, _| ());
            cage.reannounce::<Consecutive>().await.unwrap();

            (peer, cage.locate_vertex(graph_id, VertexId::new(0)).is_ok())
        }));
    }
    for h in handles {
        let (peer, still_valid) = h.await.unwrap();
        assert_eq!(still_valid, peer < 2);
    }
}

#[tokio::test]
async fn locate_vertex_on_unannounced_graph_is_a_directory_miss() {
    let net = MockNetwork::new(1);
    let cage: Cage<_, (), ()> = Cage::new(net.policy(0), CageConfig::new(0, 1));
    let err = cage
        .locate_vertex(GraphId::new(99), VertexId::new(0))
        .unwrap_err();
    assert!(matches!(err, OverlayError::DirectoryMiss { .. }));
}
