//! Demo driver for the overlay graph stack
//!
//! Runs a handful of built-in scenarios over the in-memory mock policy, so
//! the whole pattern -> distribute -> communicate pipeline can be exercised
//! without a real network.

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use overlay_cage::{Cage, CageConfig};
use overlay_core::{GraphId, ReduceOp, VertexId};
use overlay_pattern::{Consecutive, bi_star, ring};
use overlay_transport::MockNetwork;

#[derive(Parser)]
#[command(name = "overlay-demo", about = "Overlay graph demo scenarios", version)]
struct Cli {
    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hub sends a request to every spoke, each spoke replies with double
    /// the value it received.
    BiStar {
        /// Total vertices (1 hub + n - 1 spokes)
        #[arg(short, long, default_value = "4")]
        vertices: usize,
        /// Number of peers sharing the graph
        #[arg(short, long, default_value = "2")]
        peers: usize,
    },
    /// Every hosted vertex contributes its own ID; allReduce sums them.
    RingReduce {
        /// Number of vertices in the ring
        #[arg(short, long, default_value = "8")]
        vertices: usize,
        /// Number of peers sharing the graph
        #[arg(short, long, default_value = "4")]
        peers: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    match cli.command {
        Commands::BiStar { vertices, peers } => run_bi_star(vertices, peers).await,
        Commands::RingReduce { vertices, peers } => run_ring_reduce(vertices, peers).await,
    }
}

async fn run_bi_star(n: usize, peer_count: usize) {
    tracing::info!(n, peer_count, "starting bistar request/reply");
    let net = MockNetwork::new(peer_count);
    let graph_id = GraphId::new(1);

    let mut handles = Vec::new();
    for peer in 0..peer_count {
        let policy = net.policy(peer);
        handles.push(tokio::spawn(async move {
            let mut cage: Cage<_, (), ()> = Cage::new(policy, CageConfig::new(peer, peer_count));
            cage.set_graph(graph_id, bi_star(n), |_| (), |_, _, _| ());
            cage.distribute::<Consecutive>().await.expect("distribute");

            let hub = VertexId::new(0);
            let hosted = cage.hosted_vertices().to_vec();

            if hosted.contains(&hub) {
                for (_, edge) in cage.out_edges(hub).expect("hub out edges") {
                    let edge = edge.clone();
                    cage.send(graph_id, &edge, &[42i64]).await.expect("request send");
                }
            }

            for v in &hosted {
                if *v == hub {
                    continue;
                }
                for (_, edge) in cage.in_edges(*v).expect("spoke in edges") {
                    let edge = edge.clone();
                    let mut req = [0i64];
                    cage.recv(graph_id, &edge, &mut req).await.expect("request recv");
                    tracing::debug!(peer, vertex = v.get(), request = req[0], "spoke handling request");
                    for (_, reply_edge) in cage.out_edges(*v).expect("spoke out edges") {
                        let reply_edge = reply_edge.clone();
                        cage.send(graph_id, &reply_edge, &[req[0] * 2])
                            .await
                            .expect("reply send");
                    }
                }
            }

            if hosted.contains(&hub) {
                for (_, edge) in cage.in_edges(hub).expect("hub in edges") {
                    let edge = edge.clone();
                    let mut buf = [0i64];
                    cage.recv(graph_id, &edge, &mut buf).await.expect("reply recv");
                    tracing::info!(peer, reply = buf[0], "hub received reply");
                }
            }
        }));
    }
    for h in handles {
        h.await.expect("peer task panicked");
    }
}

async fn run_ring_reduce(n: usize, peer_count: usize) {
    tracing::info!(n, peer_count, "starting ring allReduce");
    let net = MockNetwork::new(peer_count);
    let graph_id = GraphId::new(2);

    let mut handles = Vec::new();
    for peer in 0..peer_count {
        let policy = net.policy(peer);
        handles.push(tokio::spawn(async move {
            let mut cage: Cage<_, i64, ()> = Cage::new(policy, CageConfig::new(peer, peer_count));
            cage.set_graph(graph_id, ring(n), |v| v.get() as i64, |_, _, _| ());
            cage.distribute::<Consecutive>().await.expect("distribute");

            let contributions: Vec<i64> = cage
                .hosted_vertices()
                .iter()
                .map(|v| cage.get_vertex(*v).expect("hosted vertex").data)
                .collect();

            let total = cage
                .all_reduce(graph_id, ReduceOp::Sum, &contributions)
                .await
                .expect("all_reduce");
            tracing::info!(peer, total, "ring reduce complete");
        }));
    }
    for h in handles {
        h.await.expect("peer task panicked");
    }
}
