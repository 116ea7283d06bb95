//! # overlay-core
//!
//! Core types and the communication-policy contract for the overlay
//! network: the narrow set of peer-level primitives any substrate must
//! supply, plus the [`Context`]/[`Event`] handles built on top of them.
//! Higher layers (name service, graph communicator, cage) are
//! generic over [`CommPolicy`] and never depend on a concrete substrate.
//!
//! ## Key types
//!
//! - [`VAddr`], [`ContextId`], [`GraphId`], [`VertexId`], [`EdgeId`]: dense
//!   integer identifiers.
//! - [`Context`]: an immutable membership set.
//! - [`Event`]: a single-use handle for an in-flight async operation.
//! - [`CommPolicy`]: the contract every substrate implements.

pub mod context;
pub mod element;
pub mod error;
pub mod event;
pub mod policy;
pub mod vaddr;

pub use context::Context;
pub use element::{Element, ReduceOp};
pub use error::{OverlayError, Result};
pub use event::{Event, EventOutcome, EventSender, event_pair};
pub use policy::CommPolicy;
pub use vaddr::{ContextId, EdgeId, GraphId, Tag, VAddr, VertexId};
