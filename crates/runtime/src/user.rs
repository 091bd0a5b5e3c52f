//! Model of a user.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    application::ApplicationId,
    entity::{Component, Entity, EntityKind, EntityRef, Relationship},
    region::RegionId,
};

pub type UserId = usize;

/// End user located in a home region and accessing exactly one application.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub region: RegionId,
    pub application: Option<ApplicationId>,
    /// Upper bound on the end-to-end delay.
    pub delay_sla: u64,
    pub(crate) delay: f64,
    pub(crate) communication_path: Vec<Vec<RegionId>>,
}

impl User {
    /// End-to-end delay, `+inf` while the application is not fully reachable.
    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// One region sequence per resolved hop of `[user.region] + [host regions]`.
    pub fn communication_path(&self) -> &[Vec<RegionId>] {
        &self.communication_path
    }

    pub fn violates_sla(&self) -> bool {
        self.delay > self.delay_sla as f64
    }
}

#[derive(Serialize, Deserialize)]
pub struct UserAttributes {
    pub delay_sla: u64,
    #[serde(default)]
    pub communication_path: Vec<Vec<RegionId>>,
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> usize {
        self.id
    }
}

impl Component for User {
    type Attributes = UserAttributes;

    fn attributes(&self) -> UserAttributes {
        UserAttributes {
            delay_sla: self.delay_sla,
            communication_path: self.communication_path.clone(),
        }
    }

    fn relationships(&self) -> BTreeMap<String, Relationship> {
        BTreeMap::from([
            (
                "region".to_string(),
                Relationship::One(EntityRef::new(EntityKind::Region, self.region)),
            ),
            (
                "application".to_string(),
                self.application
                    .map(|id| Relationship::One(EntityRef::new(EntityKind::Application, id)))
                    .unwrap_or(Relationship::Empty),
            ),
        ])
    }
}
