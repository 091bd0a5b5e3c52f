//! Latency-weighted network topology between regions.
//!
//! Regions are the only graph nodes. Every [NetworkLink] is an undirected edge carrying an
//! integer delay, and [Topology] answers shortest-path and path-delay queries over them.

pub mod error;
pub mod network_link;
pub mod topology;

pub use error::{Result, TopologyError};
pub use network_link::{LinkId, NetworkLink, RegionId};
pub use topology::Topology;
