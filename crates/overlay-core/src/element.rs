//! Buffer element bound and reduction operators

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Marker bound for types that may appear in a communication buffer.
///
/// Every send/recv buffer is a contiguous region of a homogeneous element
/// type, wire-encoded with `postcard` at the substrate boundary, hence the
/// `serde` bound.
pub trait Element: Copy + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Neutral element for [`ReduceOp::Sum`].
    fn zero() -> Self;
    /// Neutral element for [`ReduceOp::Product`].
    fn one() -> Self;
    fn reduce(op: ReduceOp, a: Self, b: Self) -> Self;
}

/// A pure, associative, commutative binary operator over an [`Element`].
///
/// The contract requires at least addition, multiplication, min, and max.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Product,
    Min,
    Max,
}

macro_rules! impl_element_numeric {
    ($($t:ty),+) => {
        $(
            impl Element for $t {
                fn zero() -> Self { 0 as $t }
                fn one() -> Self { 1 as $t }
                fn reduce(op: ReduceOp, a: Self, b: Self) -> Self {
                    match op {
                        ReduceOp::Sum => a + b,
                        ReduceOp::Product => a * b,
                        ReduceOp::Min => if a < b { a } else { b },
                        ReduceOp::Max => if a > b { a } else { b },
                    }
                }
            }
        )+
    };
}

impl_element_numeric!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);
