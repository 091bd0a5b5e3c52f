//! Topology error types.

use thiserror::Error;

use crate::network_link::RegionId;

/// Errors returned by [Topology](crate::Topology) construction and queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("region {0} is not part of the topology")]
    UnknownRegion(RegionId),

    #[error("region {0} was already added to the topology")]
    DuplicateRegion(RegionId),

    #[error("link would connect region {0} to itself")]
    SelfLoop(RegionId),

    #[error("regions {0} and {1} are already connected")]
    DuplicateLink(RegionId, RegionId),

    #[error("no path between regions {origin} and {target}")]
    NoPathFound { origin: RegionId, target: RegionId },

    #[error("regions {from} and {to} are consecutive in a path but not linked")]
    MissingLink { from: RegionId, to: RegionId },
}

pub type Result<T> = std::result::Result<T, TopologyError>;
