//! Identity-assigned, class-scoped entity storage.
//!
//! Every entity type lives in its own [Arena], a dense vector indexed by `id - 1`. Ids are
//! 1-based and handed out in creation order. Cross-entity references are plain ids, and generic
//! references coming from a dataset are typed [EntityRef] values resolved through
//! [World::contains](crate::world::World::contains).

use std::{collections::BTreeMap, fmt};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Closed set of entity types known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Region,
    Provider,
    DataCenter,
    User,
    Application,
    Service,
    NetworkLink,
}

impl EntityKind {
    /// All kinds, ordered so that every kind only references kinds listed before it
    /// (except for the user/application pair, which is wired from the application side).
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Region,
        EntityKind::Provider,
        EntityKind::DataCenter,
        EntityKind::User,
        EntityKind::Application,
        EntityKind::Service,
        EntityKind::NetworkLink,
    ];

    /// Class name used in datasets.
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Region => "Region",
            EntityKind::Provider => "Provider",
            EntityKind::DataCenter => "DataCenter",
            EntityKind::User => "User",
            EntityKind::Application => "Application",
            EntityKind::Service => "Service",
            EntityKind::NetworkLink => "NetworkLink",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed reference to an entity, serialized as `{"class": "<Kind>", "id": <id>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub class: EntityKind,
    pub id: usize,
}

impl EntityRef {
    pub fn new(class: EntityKind, id: usize) -> Self {
        Self { class, id }
    }
}

/// Shape of a relationship value in a component record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Relationship {
    /// Reference to a single entity.
    One(EntityRef),
    /// Ordered list of entities.
    Many(Vec<EntityRef>),
    /// Entities keyed by an arbitrary string.
    Keyed(BTreeMap<String, EntityRef>),
    /// Explicitly unset (`null`).
    Empty,
}

/// Serialized form of one entity: scalar/dict attributes plus typed relationships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: BTreeMap<String, Relationship>,
}

/// Anything stored in an [Arena].
pub trait Entity {
    const KIND: EntityKind;

    fn id(&self) -> usize;
}

/// Attribute/relationship mapping used by the dataset loader and exporter.
///
/// Attributes are converted with serde. Relationships are wired by the
/// [World](crate::world::World), which owns every arena and can check both ends.
pub trait Component: Entity {
    type Attributes: Serialize + DeserializeOwned;

    fn attributes(&self) -> Self::Attributes;

    fn relationships(&self) -> BTreeMap<String, Relationship>;

    fn to_record(&self) -> Result<ComponentRecord> {
        let mut attributes = match serde_json::to_value(self.attributes())? {
            Value::Object(map) => map,
            other => {
                return Err(Error::InvalidAttribute {
                    kind: Self::KIND,
                    id: self.id(),
                    reason: format!("attributes must serialize to an object, got {}", other),
                })
            }
        };
        attributes.insert("id".to_string(), Value::from(self.id()));
        Ok(ComponentRecord {
            attributes,
            relationships: self.relationships(),
        })
    }
}

/// Parses the attribute part of a record for entity `id` of type `T`.
pub fn parse_attributes<T: Component>(id: usize, record: &ComponentRecord) -> Result<T::Attributes> {
    serde_json::from_value(Value::Object(record.attributes.clone())).map_err(|e| Error::InvalidAttribute {
        kind: T::KIND,
        id,
        reason: e.to_string(),
    })
}

/// Dense per-type storage with sequential 1-based ids.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next created entity will receive.
    pub fn next_id(&self) -> usize {
        self.items.len() + 1
    }

    /// Creates an entity from its freshly assigned id.
    pub fn create(&mut self, build: impl FnOnce(usize) -> T) -> usize {
        let id = self.next_id();
        let item = build(id);
        debug_assert_eq!(item.id(), id);
        self.items.push(item);
        id
    }

    pub fn find_by_id(&self, id: usize) -> Result<&T> {
        id.checked_sub(1)
            .and_then(|index| self.items.get(index))
            .ok_or(Error::EntityNotFound { kind: T::KIND, id })
    }

    pub fn find_by_id_mut(&mut self, id: usize) -> Result<&mut T> {
        id.checked_sub(1)
            .and_then(|index| self.items.get_mut(index))
            .ok_or(Error::EntityNotFound { kind: T::KIND, id })
    }

    pub fn contains(&self, id: usize) -> bool {
        id >= 1 && id <= self.items.len()
    }

    /// All entities in creation order.
    pub fn all(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = usize> {
        1..=self.items.len()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a, T: Entity> IntoIterator for &'a Arena<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
