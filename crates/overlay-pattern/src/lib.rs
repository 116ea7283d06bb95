//! # overlay-pattern
//!
//! Pure graph-description factories ([`pattern`]) and vertex-to-peer
//! sharding functions ([`mapping`]). Neither touches a communication
//! policy, a graph-policy instance, or the name service; `overlay-cage`
//! is what turns a [`pattern::GraphDescription`] plus a [`mapping::Mapping`]
//! into an announced, communicating graph.

pub mod mapping;
pub mod pattern;

pub use mapping::{Consecutive, Mapping, Roundrobin};
pub use pattern::{GraphDescription, bi_star, chain, fully_connected, grid, hyper_cube, ring, star};
