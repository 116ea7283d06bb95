//! `MockCommPolicy`: an in-memory `CommPolicy` over a [`MockNetwork`](crate::network::MockNetwork)
//!
//! Each peer owns an inbox fed by every other peer's outgoing sends.
//! Point-to-point send/recv is built directly on that; every collective is
//! layered on top of point-to-point send/recv in turn.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};

use overlay_core::{
    CommPolicy, Context, ContextId, Element, Event, OverlayError, ReduceOp, Result, Tag, VAddr,
    event_pair,
};

use crate::envelope::{Envelope, from_bytes, to_bytes};
use crate::network::{MockNetworkState, PhysicalId, derive_context_id};

/// Collective tags live in the upper half of the tag space so they never
/// collide with caller-assigned edge-ID tags used for point-to-point sends.
const COLLECTIVE_TAG_BASE: u32 = 0x8000_0000;

pub struct MockCommPolicy {
    pub(crate) physical: PhysicalId,
    pub(crate) network: Arc<MockNetworkState>,
    pub(crate) inbox_rx: Mutex<mpsc::Receiver<Envelope>>,
    pub(crate) staging: Mutex<VecDeque<Envelope>>,
    pub(crate) collective_seq: DashMap<ContextId, AtomicU64>,
    pub(crate) global_ctx: Context,
}

impl MockCommPolicy {
    fn next_collective_tag(&self, ctx_id: ContextId) -> Tag {
        let counter = self
            .collective_seq
            .entry(ctx_id)
            .or_insert_with(|| AtomicU64::new(0));
        let seq = counter.fetch_add(1, Ordering::Relaxed);
        Tag::new(COLLECTIVE_TAG_BASE.wrapping_add(seq as u32))
    }

    async fn raw_send_bytes(&self, ctx_id: ContextId, dst: VAddr, tag: Tag, bytes: Vec<u8>) -> Result<()> {
        let physical = self.network.physical_of(ctx_id, dst);
        let local_vaddr = self.network.routing.get(&ctx_id).and_then(|members| {
            members
                .iter()
                .position(|&p| p == self.physical)
                .map(|i| VAddr::new(i as u32))
        });
        let src_vaddr = local_vaddr.ok_or(OverlayError::ContextMismatch(ctx_id))?;
        let sender = self
            .network
            .inboxes
            .get(&physical)
            .ok_or_else(|| OverlayError::SubstrateFailure(format!("no inbox for peer {physical}")))?
            .clone();
        sender
            .send(Envelope {
                ctx_id,
                src_vaddr,
                tag,
                bytes,
            })
            .await
            .map_err(|_| OverlayError::SubstrateFailure("peer inbox closed".into()))
    }

    /// Pull the next envelope matching `ctx_id`, and optionally `src`/`tag`,
    /// from the staging buffer or the live inbox.
    async fn raw_recv_matching(
        &self,
        ctx_id: ContextId,
        src: Option<VAddr>,
        tag: Option<Tag>,
    ) -> Result<Envelope> {
        let matches = |e: &Envelope| {
            e.ctx_id == ctx_id
                && src.is_none_or(|s| e.src_vaddr == s)
                && tag.is_none_or(|t| e.tag == t)
        };

        {
            let mut staging = self.staging.lock().await;
            if let Some(pos) = staging.iter().position(matches) {
                return Ok(staging.remove(pos).unwrap());
            }
        }

        let mut rx = self.inbox_rx.lock().await;
        loop {
            let envelope = rx
                .recv()
                .await
                .ok_or_else(|| OverlayError::SubstrateFailure("inbox closed".into()))?;
            if matches(&envelope) {
                return Ok(envelope);
            }
            self.staging.lock().await.push_back(envelope);
        }
    }

    async fn raw_send<T: Element>(&self, ctx: &Context, dst: VAddr, tag: Tag, buf: &[T]) -> Result<()> {
        self.raw_send_bytes(ctx.id(), dst, tag, to_bytes(buf)?).await
    }

    async fn raw_recv<T: Element>(
        &self,
        ctx: &Context,
        src: VAddr,
        tag: Tag,
        out: &mut [T],
    ) -> Result<()> {
        let envelope = self.raw_recv_matching(ctx.id(), Some(src), Some(tag)).await?;
        from_bytes(&envelope.bytes, out)
    }

    fn my_vaddr(&self, ctx: &Context) -> Result<VAddr> {
        ctx.get_vaddr().ok_or(OverlayError::ContextMismatch(ctx.id()))
    }
}

#[async_trait]
impl CommPolicy for MockCommPolicy {
    async fn send<T: Element>(&self, dst: VAddr, tag: Tag, ctx: &Context, buf: &[T]) -> Result<()> {
        self.raw_send(ctx, dst, tag, buf).await
    }

    async fn recv<T: Element>(
        &self,
        src: VAddr,
        tag: Tag,
        ctx: &Context,
        buf: &mut [T],
    ) -> Result<()> {
        self.raw_recv(ctx, src, tag, buf).await
    }

    async fn recv_any<T: Element>(&self, ctx: &Context, buf: &mut [T]) -> Result<Event> {
        let envelope = self.raw_recv_matching(ctx.id(), None, None).await?;
        from_bytes(&envelope.bytes, buf)?;
        let (event, tx) = event_pair();
        let _ = tx.send(Ok(overlay_core::EventOutcome {
            source: Some(envelope.src_vaddr),
            tag: Some(envelope.tag),
        }));
        Ok(event)
    }

    async fn async_send<T: Element>(
        &self,
        dst: VAddr,
        tag: Tag,
        ctx: &Context,
        buf: Vec<T>,
    ) -> Result<Event> {
        let result = self.raw_send(ctx, dst, tag, &buf).await;
        let (event, tx) = event_pair();
        let _ = tx.send(result.map(|()| overlay_core::EventOutcome::default()));
        Ok(event)
    }

    async fn async_recv<T: Element>(
        &self,
        src: VAddr,
        tag: Tag,
        ctx: &Context,
        len: usize,
    ) -> Result<Event> {
        let mut buf = vec![T::zero(); len];
        let result = self.raw_recv(ctx, src, tag, &mut buf).await;
        let (event, tx) = event_pair();
        let _ = tx.send(result.map(|()| overlay_core::EventOutcome::default()));
        Ok(event)
    }

    async fn gather<T: Element>(
        &self,
        root: VAddr,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
    ) -> Result<()> {
        let my = self.my_vaddr(ctx)?;
        let tag = self.next_collective_tag(ctx.id());
        let n = send.len();
        if my == root {
            for k in ctx.vaddrs() {
                let slot = &mut recv[k.get() as usize * n..(k.get() as usize + 1) * n];
                if k == root {
                    slot.copy_from_slice(send);
                } else {
                    self.raw_recv(ctx, k, tag, slot).await?;
                }
            }
        } else {
            self.raw_send(ctx, root, tag, send).await?;
        }
        Ok(())
    }

    async fn gather_var<T: Element>(
        &self,
        root: VAddr,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
        counts: &[usize],
    ) -> Result<()> {
        let my = self.my_vaddr(ctx)?;
        let tag = self.next_collective_tag(ctx.id());
        if my == root {
            let mut offset = 0usize;
            for k in ctx.vaddrs() {
                let count = counts[k.get() as usize];
                let slot = &mut recv[offset..offset + count];
                if k == root {
                    slot.copy_from_slice(send);
                } else {
                    self.raw_recv(ctx, k, tag, slot).await?;
                }
                offset += count;
            }
        } else {
            self.raw_send(ctx, root, tag, send).await?;
        }
        Ok(())
    }

    async fn all_gather<T: Element>(
        &self,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
    ) -> Result<()> {
        let my = self.my_vaddr(ctx)?;
        let tag = self.next_collective_tag(ctx.id());
        let n = send.len();
        for k in ctx.vaddrs() {
            if k != my {
                self.raw_send(ctx, k, tag, send).await?;
            }
        }
        recv[my.get() as usize * n..(my.get() as usize + 1) * n].copy_from_slice(send);
        for k in ctx.vaddrs() {
            if k != my {
                let slot = &mut recv[k.get() as usize * n..(k.get() as usize + 1) * n];
                self.raw_recv(ctx, k, tag, slot).await?;
            }
        }
        Ok(())
    }

    async fn all_gather_var<T: Element>(
        &self,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
        counts: &[usize],
    ) -> Result<()> {
        let my = self.my_vaddr(ctx)?;
        let tag = self.next_collective_tag(ctx.id());
        for k in ctx.vaddrs() {
            if k != my {
                self.raw_send(ctx, k, tag, send).await?;
            }
        }
        let offsets: Vec<usize> = counts
            .iter()
            .scan(0usize, |acc, &c| {
                let start = *acc;
                *acc += c;
                Some(start)
            })
            .collect();
        let my_idx = my.get() as usize;
        recv[offsets[my_idx]..offsets[my_idx] + counts[my_idx]].copy_from_slice(send);
        for k in ctx.vaddrs() {
            if k != my {
                let idx = k.get() as usize;
                let slot = &mut recv[offsets[idx]..offsets[idx] + counts[idx]];
                self.raw_recv(ctx, k, tag, slot).await?;
            }
        }
        Ok(())
    }

    async fn scatter<T: Element>(
        &self,
        root: VAddr,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
    ) -> Result<()> {
        let my = self.my_vaddr(ctx)?;
        let tag = self.next_collective_tag(ctx.id());
        let n = recv.len();
        if my == root {
            for k in ctx.vaddrs() {
                let slot = &send[k.get() as usize * n..(k.get() as usize + 1) * n];
                if k == root {
                    recv.copy_from_slice(slot);
                } else {
                    self.raw_send(ctx, k, tag, slot).await?;
                }
            }
        } else {
            self.raw_recv(ctx, root, tag, recv).await?;
        }
        Ok(())
    }

    async fn all_to_all<T: Element>(
        &self,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
    ) -> Result<()> {
        let my = self.my_vaddr(ctx)?;
        let tag = self.next_collective_tag(ctx.id());
        let n = recv.len() / ctx.size();
        for k in ctx.vaddrs() {
            if k != my {
                let slot = &send[k.get() as usize * n..(k.get() as usize + 1) * n];
                self.raw_send(ctx, k, tag, slot).await?;
            }
        }
        let my_slot = my.get() as usize;
        recv[my_slot * n..(my_slot + 1) * n].copy_from_slice(&send[my_slot * n..(my_slot + 1) * n]);
        for k in ctx.vaddrs() {
            if k != my {
                let slot = &mut recv[k.get() as usize * n..(k.get() as usize + 1) * n];
                self.raw_recv(ctx, k, tag, slot).await?;
            }
        }
        Ok(())
    }

    async fn reduce<T: Element>(
        &self,
        root: VAddr,
        op: ReduceOp,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
    ) -> Result<()> {
        let my = self.my_vaddr(ctx)?;
        let tag = self.next_collective_tag(ctx.id());
        let n = send.len();
        if my == root {
            recv.copy_from_slice(send);
            let mut scratch = vec![T::zero(); n];
            for k in ctx.vaddrs() {
                if k == root {
                    continue;
                }
                self.raw_recv(ctx, k, tag, &mut scratch).await?;
                for i in 0..n {
                    recv[i] = T::reduce(op, recv[i], scratch[i]);
                }
            }
        } else {
            self.raw_send(ctx, root, tag, send).await?;
        }
        Ok(())
    }

    async fn all_reduce<T: Element>(
        &self,
        op: ReduceOp,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
    ) -> Result<()> {
        self.reduce(VAddr::new(0), op, ctx, send, recv).await?;
        self.broadcast(VAddr::new(0), ctx, recv).await?;
        Ok(())
    }

    async fn broadcast<T: Element>(&self, root: VAddr, ctx: &Context, buf: &mut [T]) -> Result<()> {
        let my = self.my_vaddr(ctx)?;
        let tag = self.next_collective_tag(ctx.id());
        if my == root {
            for k in ctx.vaddrs() {
                if k != root {
                    self.raw_send(ctx, k, tag, buf).await?;
                }
            }
        } else {
            self.raw_recv(ctx, root, tag, buf).await?;
        }
        Ok(())
    }

    async fn synchronize(&self, ctx: &Context) -> Result<()> {
        let flag = [0u8];
        let mut recv = vec![0u8; ctx.size()];
        self.all_gather(ctx, &flag, &mut recv).await
    }

    async fn split_context(&self, is_member: bool, old: &Context) -> Result<Context> {
        let flag = [is_member as u8];
        let mut flags = vec![0u8; old.size()];
        self.all_gather(old, &flag, &mut flags).await?;

        let old_members = self
            .network
            .routing
            .get(&old.id())
            .ok_or(OverlayError::ContextMismatch(old.id()))?
            .clone();

        let new_members: Vec<PhysicalId> = old_members
            .iter()
            .zip(flags.iter())
            .filter(|(_, &f)| f != 0)
            .map(|(&p, _)| p)
            .collect();

        let new_id = derive_context_id(old.id(), &new_members);
        self.network
            .routing
            .entry(new_id)
            .or_insert_with(|| new_members.clone());
        tracing::debug!(old_size = old.size(), new_size = new_members.len(), "split context");

        match new_members.iter().position(|&p| p == self.physical) {
            Some(idx) => Ok(Context::member(new_id, new_members.len(), VAddr::new(idx as u32))),
            None => Ok(Context::non_member(new_id, new_members.len())),
        }
    }

    fn global_context(&self) -> Context {
        self.global_ctx.clone()
    }
}
