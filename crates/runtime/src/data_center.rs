//! Model of a data center.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    entity::{Component, Entity, EntityKind, EntityRef, Relationship},
    provider::ProviderId,
    region::RegionId,
    service::ServiceId,
};

pub type DataCenterId = usize;

/// Capacity-bounded host located in a region and owned by a provider.
///
/// `demand` always equals the summed demand of `services`. Both are only changed by the
/// placement primitives on [World](crate::world::World).
#[derive(Debug, Clone)]
pub struct DataCenter {
    pub id: DataCenterId,
    pub alias: String,
    pub capacity: u64,
    pub(crate) demand: u64,
    /// Per-unit cost for each service kind.
    pub allocation_cost: BTreeMap<String, u64>,
    pub region: RegionId,
    pub provider: ProviderId,
    pub(crate) services: Vec<ServiceId>,
}

impl DataCenter {
    pub fn demand(&self) -> u64 {
        self.demand
    }

    /// Hosted services in provisioning order.
    pub fn services(&self) -> &[ServiceId] {
        &self.services
    }

    /// Remaining capacity. Negative when the data center is overloaded.
    pub fn free_capacity(&self) -> i128 {
        self.capacity as i128 - self.demand as i128
    }

    pub fn can_host(&self, demand: u64) -> bool {
        demand <= self.capacity.saturating_sub(self.demand)
    }

    pub fn is_overloaded(&self) -> bool {
        self.demand > self.capacity
    }

    pub fn cost_of(&self, label: &str) -> Option<u64> {
        self.allocation_cost.get(label).copied()
    }

    /// Highest per-unit cost over all service kinds, 0 if no cost is defined.
    pub fn max_allocation_cost(&self) -> u64 {
        self.allocation_cost.values().copied().max().unwrap_or(0)
    }
}

#[derive(Serialize, Deserialize)]
pub struct DataCenterAttributes {
    #[serde(default)]
    pub alias: String,
    pub capacity: u64,
    #[serde(default)]
    pub demand: u64,
    #[serde(default)]
    pub allocation_cost: BTreeMap<String, u64>,
}

impl Entity for DataCenter {
    const KIND: EntityKind = EntityKind::DataCenter;

    fn id(&self) -> usize {
        self.id
    }
}

impl Component for DataCenter {
    type Attributes = DataCenterAttributes;

    fn attributes(&self) -> DataCenterAttributes {
        DataCenterAttributes {
            alias: self.alias.clone(),
            capacity: self.capacity,
            demand: self.demand,
            allocation_cost: self.allocation_cost.clone(),
        }
    }

    fn relationships(&self) -> BTreeMap<String, Relationship> {
        BTreeMap::from([
            (
                "region".to_string(),
                Relationship::One(EntityRef::new(EntityKind::Region, self.region)),
            ),
            (
                "provider".to_string(),
                Relationship::One(EntityRef::new(EntityKind::Provider, self.provider)),
            ),
            (
                "services".to_string(),
                Relationship::Many(
                    self.services
                        .iter()
                        .map(|&id| EntityRef::new(EntityKind::Service, id))
                        .collect(),
                ),
            ),
        ])
    }
}
