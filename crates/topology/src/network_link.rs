//! Model of a network link.

use serde::{Deserialize, Serialize};

pub type RegionId = usize;
pub type LinkId = usize;

/// Undirected edge between two regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkLink {
    /// 1-based id, assigned in creation order.
    pub id: LinkId,
    /// Regions connected by the link. Order carries no meaning.
    pub nodes: (RegionId, RegionId),
    /// Link delay, same units as user delay SLAs.
    pub delay: u64,
}

impl NetworkLink {
    /// Returns the region on the other side of the link, if `region` is one of its ends.
    pub fn other_end(&self, region: RegionId) -> Option<RegionId> {
        if self.nodes.0 == region {
            Some(self.nodes.1)
        } else if self.nodes.1 == region {
            Some(self.nodes.0)
        } else {
            None
        }
    }

    pub fn connects(&self, a: RegionId, b: RegionId) -> bool {
        self.nodes == (a, b) || self.nodes == (b, a)
    }
}
