//! Model of an application.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    entity::{Component, Entity, EntityKind, EntityRef, Relationship},
    service::ServiceId,
    user::UserId,
};

pub type ApplicationId = usize;

/// Ordered chain of services accessed by one user.
#[derive(Debug, Clone)]
pub struct Application {
    pub id: ApplicationId,
    pub user: UserId,
    /// Services in communication-chain order.
    pub services: Vec<ServiceId>,
}

#[derive(Serialize, Deserialize)]
pub struct ApplicationAttributes {}

impl Entity for Application {
    const KIND: EntityKind = EntityKind::Application;

    fn id(&self) -> usize {
        self.id
    }
}

impl Component for Application {
    type Attributes = ApplicationAttributes;

    fn attributes(&self) -> ApplicationAttributes {
        ApplicationAttributes {}
    }

    fn relationships(&self) -> BTreeMap<String, Relationship> {
        BTreeMap::from([
            (
                "user".to_string(),
                Relationship::One(EntityRef::new(EntityKind::User, self.user)),
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
