//! Model of a region.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    data_center::DataCenterId,
    entity::{Component, Entity, EntityKind, EntityRef, Relationship},
    user::UserId,
};

pub use geoplace_topology::RegionId;

/// Geographic site and node of the network topology.
#[derive(Debug, Clone)]
pub struct Region {
    pub id: RegionId,
    pub label: String,
    pub coordinates: Option<(f64, f64)>,
    /// Data centers located in the region, in creation order.
    pub data_centers: Vec<DataCenterId>,
    /// Users whose home is the region.
    pub users: Vec<UserId>,
}

#[derive(Serialize, Deserialize)]
pub struct RegionAttributes {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub coordinates: Option<(f64, f64)>,
}

impl Entity for Region {
    const KIND: EntityKind = EntityKind::Region;

    fn id(&self) -> usize {
        self.id
    }
}

impl Component for Region {
    type Attributes = RegionAttributes;

    fn attributes(&self) -> RegionAttributes {
        RegionAttributes {
            label: self.label.clone(),
            coordinates: self.coordinates,
        }
    }

    fn relationships(&self) -> BTreeMap<String, Relationship> {
        BTreeMap::from([
            (
                "data_centers".to_string(),
                Relationship::Many(
                    self.data_centers
                        .iter()
                        .map(|&id| EntityRef::new(EntityKind::DataCenter, id))
                        .collect(),
                ),
            ),
            (
                "users".to_string(),
                Relationship::Many(self.users.iter().map(|&id| EntityRef::new(EntityKind::User, id)).collect()),
            ),
        ])
    }
}
