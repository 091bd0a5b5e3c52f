//! Registry view of topology links.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::{Component, Entity, EntityKind, EntityRef, Relationship};

pub use geoplace_topology::{LinkId, NetworkLink};

#[derive(Serialize, Deserialize)]
pub struct NetworkLinkAttributes {
    pub delay: u64,
}

impl Entity for NetworkLink {
    const KIND: EntityKind = EntityKind::NetworkLink;

    fn id(&self) -> usize {
        self.id
    }
}

impl Component for NetworkLink {
    type Attributes = NetworkLinkAttributes;

    fn attributes(&self) -> NetworkLinkAttributes {
        NetworkLinkAttributes { delay: self.delay }
    }

    fn relationships(&self) -> BTreeMap<String, Relationship> {
        BTreeMap::from([(
            "nodes".to_string(),
            Relationship::Many(vec![
                EntityRef::new(EntityKind::Region, self.nodes.0),
                EntityRef::new(EntityKind::Region, self.nodes.1),
            ]),
        )])
    }
}
