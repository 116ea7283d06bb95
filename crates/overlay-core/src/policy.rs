//! The communication-policy contract
//!
//! Any substrate — MPI-style, socket-based, or an in-memory mock for
//! testing — implements [`CommPolicy`] against a [`Context`]. Because the
//! methods are generic over the buffer element type, this trait is not
//! object-safe; callers hold a concrete `P: CommPolicy` behind a type
//! parameter rather than a `dyn CommPolicy`, the same way the rest of this
//! stack composes abstractions at the type level instead of via trait
//! objects.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::element::{Element, ReduceOp};
use crate::error::Result;
use crate::event::Event;
use crate::vaddr::{Tag, VAddr};

#[async_trait]
pub trait CommPolicy: Send + Sync {
    /// Blocking point-to-point send.
    async fn send<T: Element>(&self, dst: VAddr, tag: Tag, ctx: &Context, buf: &[T]) -> Result<()>;

    /// Blocking point-to-point receive from a known source and tag.
    async fn recv<T: Element>(
        &self,
        src: VAddr,
        tag: Tag,
        ctx: &Context,
        buf: &mut [T],
    ) -> Result<()>;

    /// Blocking receive from any source / any tag. The returned event's
    /// outcome carries the source VAddr and tag of the completed message.
    async fn recv_any<T: Element>(&self, ctx: &Context, buf: &mut [T]) -> Result<Event>;

    async fn async_send<T: Element>(
        &self,
        dst: VAddr,
        tag: Tag,
        ctx: &Context,
        buf: Vec<T>,
    ) -> Result<Event>;

    async fn async_recv<T: Element>(
        &self,
        src: VAddr,
        tag: Tag,
        ctx: &Context,
        len: usize,
    ) -> Result<Event>;

    /// Gather fixed-size contributions at `root`.
    async fn gather<T: Element>(
        &self,
        root: VAddr,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
    ) -> Result<()>;

    /// Gather variable-size contributions at `root`; `counts[k]` is the
    /// element count contributed by the peer at VAddr `k`.
    async fn gather_var<T: Element>(
        &self,
        root: VAddr,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
        counts: &[usize],
    ) -> Result<()>;

    async fn all_gather<T: Element>(&self, ctx: &Context, send: &[T], recv: &mut [T])
    -> Result<()>;

    async fn all_gather_var<T: Element>(
        &self,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
        counts: &[usize],
    ) -> Result<()>;

    async fn scatter<T: Element>(
        &self,
        root: VAddr,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
    ) -> Result<()>;

    async fn all_to_all<T: Element>(&self, ctx: &Context, send: &[T], recv: &mut [T])
    -> Result<()>;

    async fn reduce<T: Element>(
        &self,
        root: VAddr,
        op: ReduceOp,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
    ) -> Result<()>;

    async fn all_reduce<T: Element>(
        &self,
        op: ReduceOp,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
    ) -> Result<()>;

    async fn broadcast<T: Element>(&self, root: VAddr, ctx: &Context, buf: &mut [T]) -> Result<()>;

    /// A barrier among all members of `ctx`.
    async fn synchronize(&self, ctx: &Context) -> Result<()>;

    /// Collective over `old`: yields a new context containing exactly the
    /// peers that passed `is_member = true`, with a fresh contiguous VAddr
    /// space. Peers that passed `false` receive an invalid context.
    async fn split_context(&self, is_member: bool, old: &Context) -> Result<Context>;

    /// The context containing every peer in the network.
    fn global_context(&self) -> Context;
}

/// Blanket impl so an `Arc<P>` handle — the shape every multi-peer test or
/// demo shares a policy instance through — is itself a `CommPolicy`.
#[async_trait]
impl<P: CommPolicy + ?Sized> CommPolicy for Arc<P> {
    async fn send<T: Element>(&self, dst: VAddr, tag: Tag, ctx: &Context, buf: &[T]) -> Result<()> {
        (**self).send(dst, tag, ctx, buf).await
    }

    async fn recv<T: Element>(
        &self,
        src: VAddr,
        tag: Tag,
        ctx: &Context,
        buf: &mut [T],
    ) -> Result<()> {
        (**self).recv(src, tag, ctx, buf).await
    }

    async fn recv_any<T: Element>(&self, ctx: &Context, buf: &mut [T]) -> Result<Event> {
        (**self).recv_any(ctx, buf).await
    }

    async fn async_send<T: Element>(
        &self,
        dst: VAddr,
        tag: Tag,
        ctx: &Context,
        buf: Vec<T>,
    ) -> Result<Event> {
        (**self).async_send(dst, tag, ctx, buf).await
    }

    async fn async_recv<T: Element>(
        &self,
        src: VAddr,
        tag: Tag,
        ctx: &Context,
        len: usize,
    ) -> Result<Event> {
        (**self).async_recv(src, tag, ctx, len).await
    }

    async fn gather<T: Element>(
        &self,
        root: VAddr,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
    ) -> Result<()> {
        (**self).gather(root, ctx, send, recv).await
    }

    async fn gather_var<T: Element>(
        &self,
        root: VAddr,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
        counts: &[usize],
    ) -> Result<()> {
        (**self).gather_var(root, ctx, send, recv, counts).await
    }

    async fn all_gather<T: Element>(&self, ctx: &Context, send: &[T], recv: &mut [T]) -> Result<()> {
        (**self).all_gather(ctx, send, recv).await
    }

    async fn all_gather_var<T: Element>(
        &self,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
        counts: &[usize],
    ) -> Result<()> {
        (**self).all_gather_var(ctx, send, recv, counts).await
    }

    async fn scatter<T: Element>(
        &self,
        root: VAddr,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
    ) -> Result<()> {
        (**self).scatter(root, ctx, send, recv).await
    }

    async fn all_to_all<T: Element>(&self, ctx: &Context, send: &[T], recv: &mut [T]) -> Result<()> {
        (**self).all_to_all(ctx, send, recv).await
    }

    async fn reduce<T: Element>(
        &self,
        root: VAddr,
        op: ReduceOp,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
    ) -> Result<()> {
        (**self).reduce(root, op, ctx, send, recv).await
    }

    async fn all_reduce<T: Element>(
        &self,
        op: ReduceOp,
        ctx: &Context,
        send: &[T],
        recv: &mut [T],
    ) -> Result<()> {
        (**self).all_reduce(op, ctx, send, recv).await
    }

    async fn broadcast<T: Element>(&self, root: VAddr, ctx: &Context, buf: &mut [T]) -> Result<()> {
        (**self).broadcast(root, ctx, buf).await
    }

    async fn synchronize(&self, ctx: &Context) -> Result<()> {
        (**self).synchronize(ctx).await
    }

    async fn split_context(&self, is_member: bool, old: &Context) -> Result<Context> {
        (**self).split_context(is_member, old).await
    }

    fn global_context(&self) -> Context {
        (**self).global_context()
    }
}
