//! # overlay-transport
//!
//! An in-memory [`CommPolicy`](overlay_core::CommPolicy) implementation
//! backed by `tokio::sync::mpsc` channels, for exercising the rest of the
//! overlay stack without real sockets or an MPI runtime.
//!
//! Build a [`MockNetwork`] of `N` peers, hand each peer's
//! [`MockNetwork::policy`] to the layers above, and drive every peer's
//! future concurrently (`tokio::join!`, a `JoinSet`, or similar) — the mock
//! substrate has no notion of which task is "the" peer, only which
//! `MockCommPolicy` handle is being called.

mod envelope;
mod network;
mod policy;

pub use network::MockNetwork;
pub use policy::MockCommPolicy;

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_core::{CommPolicy, ReduceOp, VAddr};

    #[tokio::test]
    async fn point_to_point_send_recv() {
        let net = MockNetwork::new(2);
        let a = net.policy(0);
        let b = net.policy(1);
        let ctx = a.global_context();

        let sender = tokio::spawn(async move {
            a.send(VAddr::new(1), overlay_core::Tag::new(1), &ctx, &[10u32, 20])
                .await
        });
        let ctx_b = b.global_context();
        let mut buf = [0u32; 2];
        b.recv(VAddr::new(0), overlay_core::Tag::new(1), &ctx_b, &mut buf)
            .await
            .unwrap();
        sender.await.unwrap().unwrap();
        assert_eq!(buf, [10, 20]);
    }

    #[tokio::test]
    async fn all_gather_collects_every_peer() {
        let net = MockNetwork::new(3);
        let mut handles = Vec::new();
        for i in 0..3 {
            let policy = net.policy(i);
            handles.push(tokio::spawn(async move {
                let ctx = policy.global_context();
                let send = [(i as u32 + 1) * 10];
                let mut recv = [0u32; 3];
                policy.all_gather(&ctx, &send, &mut recv).await.unwrap();
                recv
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), [10, 20, 30]);
        }
    }

    #[tokio::test]
    async fn all_reduce_sums_across_peers() {
        let net = MockNetwork::new(4);
        let mut handles = Vec::new();
        for i in 0..4 {
            let policy = net.policy(i);
            handles.push(tokio::spawn(async move {
                let ctx = policy.global_context();
                let send = [i as i64 + 1];
                let mut recv = [0i64];
                policy
                    .all_reduce(ReduceOp::Sum, &ctx, &send, &mut recv)
                    .await
                    .unwrap();
                recv[0]
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), 1 + 2 + 3 + 4);
        }
    }

    #[tokio::test]
    async fn split_context_partitions_by_flag() {
        let net = MockNetwork::new(4);
        let mut handles = Vec::new();
        for i in 0..4 {
            let policy = net.policy(i);
            handles.push(tokio::spawn(async move {
                let ctx = policy.global_context();
                let is_even = i % 2 == 0;
                policy.split_context(is_even, &ctx).await.unwrap()
            }));
        }
        let results: Vec<_> = {
            let mut out = Vec::new();
            for h in handles {
                out.push(h.await.unwrap());
            }
            out
        };
        assert_eq!(results[0].id(), results[2].id());
        assert_eq!(results[1].id(), results[3].id());
        assert_ne!(results[0].id(), results[1].id());
        assert_eq!(results[0].size(), 2);
        assert_eq!(results[1].size(), 2);
    }
}
