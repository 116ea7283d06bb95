//! Context: an immutable membership set with a dense address space

use std::sync::Arc;

use crate::vaddr::{ContextId, VAddr};

#[derive(Debug)]
struct ContextInner {
    id: ContextId,
    size: usize,
    /// `None` when this process is not a member of the context.
    local_vaddr: Option<VAddr>,
}

/// An immutable set of peers sharing a collective namespace.
///
/// Contexts form a tree rooted at the global context. Cloning a `Context`
/// is cheap: it is a handle around a shared, immutable inner record.
/// Equality is by [`ContextId`] alone, per the contract.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Construct a context in which this process is a member at `local_vaddr`.
    pub fn member(id: ContextId, size: usize, local_vaddr: VAddr) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id,
                size,
                local_vaddr: Some(local_vaddr),
            }),
        }
    }

    /// Construct a context in which this process is *not* a member (e.g. the
    /// result of `splitContext` on a peer that passed `is_member = false`).
    pub fn non_member(id: ContextId, size: usize) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id,
                size,
                local_vaddr: None,
            }),
        }
    }

    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    pub fn size(&self) -> usize {
        self.inner.size
    }

    pub fn valid(&self) -> bool {
        self.inner.local_vaddr.is_some()
    }

    /// The local VAddr, if this process is a member.
    pub fn get_vaddr(&self) -> Option<VAddr> {
        self.inner.local_vaddr
    }

    /// Iterate the full VAddr space `0..size`, regardless of local membership.
    pub fn vaddrs(&self) -> impl Iterator<Item = VAddr> + '_ {
        (0..self.inner.size as u32).map(VAddr::new)
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Context {}
