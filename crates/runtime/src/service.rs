//! Model of a service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    application::ApplicationId,
    data_center::DataCenterId,
    entity::{Component, Entity, EntityKind, EntityRef, Relationship},
};

pub type ServiceId = usize;

/// One tier of an application.
#[derive(Debug, Clone)]
pub struct Service {
    pub id: ServiceId,
    /// Service kind, used to look up allocation costs.
    pub label: String,
    pub demand: u64,
    pub application: ApplicationId,
    pub(crate) data_center: Option<DataCenterId>,
}

impl Service {
    /// Hosting data center, `None` while unprovisioned.
    pub fn data_center(&self) -> Option<DataCenterId> {
        self.data_center
    }

    pub fn is_placed(&self) -> bool {
        self.data_center.is_some()
    }
}

#[derive(Serialize, Deserialize)]
pub struct ServiceAttributes {
    #[serde(default)]
    pub label: String,
    pub demand: u64,
}

impl Entity for Service {
    const KIND: EntityKind = EntityKind::Service;

    fn id(&self) -> usize {
        self.id
    }
}

impl Component for Service {
    type Attributes = ServiceAttributes;

    fn attributes(&self) -> ServiceAttributes {
        ServiceAttributes {
            label: self.label.clone(),
            demand: self.demand,
        }
    }

    fn relationships(&self) -> BTreeMap<String, Relationship> {
        BTreeMap::from([
            (
                "data_center".to_string(),
                self.data_center
                    .map(|id| Relationship::One(EntityRef::new(EntityKind::DataCenter, id)))
                    .unwrap_or(Relationship::Empty),
            ),
            (
                "application".to_string(),
                Relationship::One(EntityRef::new(EntityKind::Application, self.application)),
            ),
        ])
    }
}
