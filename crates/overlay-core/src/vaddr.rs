//! Dense address and identifier newtypes
//!
//! [`VAddr`] is a peer's dense integer address within a specific [`Context`](crate::context::Context).
//! [`ContextId`], [`GraphId`], [`VertexId`], [`EdgeId`] and [`Tag`] are the
//! other small integer identifiers that thread through the overlay.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! dense_id {
    ($name:ident, $inner:ty) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub $inner);

        impl $name {
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }
    };
}

dense_id!(VAddr, u32);
dense_id!(ContextId, u64);
dense_id!(GraphId, u32);
dense_id!(VertexId, u32);
dense_id!(EdgeId, u32);
/// Tags are drawn from a bounded space; for point-to-point over an edge the
/// edge ID is used directly as the tag, since (src, dst, edge ID) is unique
/// within a graph's context.
pub type Tag = EdgeId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_ids_are_ordered_and_display() {
        let a = VAddr::new(3);
        let b = VAddr::new(7);
        assert!(a < b);
        assert_eq!(format!("{a}"), "3");
        assert_eq!(VAddr::from(5u32), VAddr::new(5));
    }
}
