//! Model of a provider.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    data_center::DataCenterId,
    entity::{Component, Entity, EntityKind, EntityRef, Relationship},
};

pub type ProviderId = usize;

/// Grouping of data centers owned by the same company.
#[derive(Debug, Clone)]
pub struct Provider {
    pub id: ProviderId,
    pub data_centers: Vec<DataCenterId>,
}

#[derive(Serialize, Deserialize)]
pub struct ProviderAttributes {}

impl Entity for Provider {
    const KIND: EntityKind = EntityKind::Provider;

    fn id(&self) -> usize {
        self.id
    }
}

impl Component for Provider {
    type Attributes = ProviderAttributes;

    fn attributes(&self) -> ProviderAttributes {
        ProviderAttributes {}
    }

    fn relationships(&self) -> BTreeMap<String, Relationship> {
        BTreeMap::from([(
            "data_centers".to_string(),
            Relationship::Many(
                self.data_centers
                    .iter()
                    .map(|&id| EntityRef::new(EntityKind::DataCenter, id))
                    .collect(),
            ),
        )])
    }
}
