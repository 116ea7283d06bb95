//! # overlay-cage
//!
//! [`Cage`]: the single entry point a user program drives — pattern in,
//! announced and communicating graph out. Binds a communication policy
//! ([`overlay_core::CommPolicy`]), a materialized graph
//! ([`overlay_graph::DirectedMultigraph`]), the name service
//! ([`overlay_nameservice::NameService`]), and the graph communicator
//! ([`overlay_comm::GraphCommunicator`]) behind one API.

mod cage;
mod config;

pub use cage::Cage;
pub use config::CageConfig;
