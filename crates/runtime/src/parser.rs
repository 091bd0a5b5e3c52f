//! Loading scenarios from JSON datasets and writing them back.
//!
//! A dataset maps class names to lists of component records:
//!
//! ```json
//! {
//!   "Region": [{"attributes": {"id": 1, "label": "a"}, "relationships": {"data_centers": [...]}}],
//!   "NetworkLink": [{"attributes": {"id": 1, "delay": 5},
//!                    "relationships": {"nodes": [{"class": "Region", "id": 1}, {"class": "Region", "id": 2}]}}]
//! }
//! ```
//!
//! Records of a class get ids `1, 2, ...` in document order. References are `{"class", "id"}`
//! pairs, lists of them, maps of them, or `null`. Every reference is checked against the
//! registry, and the back-references that are derived from the owning side (region and provider
//! data center lists, the user's application, the hosted services of a data center) must agree
//! with it. Hosted services are replayed through [World::provision_service], so demand and
//! communication paths are always recomputed rather than trusted.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    data_center::{DataCenter, DataCenterAttributes},
    entity::{parse_attributes, Component, ComponentRecord, EntityKind, EntityRef, Relationship},
    error::{Error, Result},
    network_link::{NetworkLink, NetworkLinkAttributes},
    region::{Region, RegionAttributes},
    service::{Service, ServiceAttributes},
    user::{User, UserAttributes},
    world::World,
};

/// Classes that may appear in a dataset but carry nothing the registry needs.
const IGNORED_CLASSES: [&str; 2] = ["Topology", "Simulator"];

/// Record as it appears in a dataset. Relationships stay untyped until resolved, since some
/// of them point to ignored classes.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawRecord {
    #[serde(default)]
    attributes: Map<String, Value>,
    #[serde(default)]
    relationships: Map<String, Value>,
}

impl RawRecord {
    fn component(&self) -> ComponentRecord {
        ComponentRecord {
            attributes: self.attributes.clone(),
            relationships: BTreeMap::new(),
        }
    }
}

/// Resolves the relationships of one record against the registry.
struct Resolver<'a> {
    kind: EntityKind,
    id: usize,
    record: &'a RawRecord,
}

impl<'a> Resolver<'a> {
    fn invalid(&self, relationship: &str, reason: String) -> Error {
        Error::InvalidRelationship {
            kind: self.kind,
            id: self.id,
            relationship: relationship.to_string(),
            reason,
        }
    }

    /// Typed shape of a relationship, [Relationship::Empty] when absent.
    fn relationship(&self, relationship: &str) -> Result<Relationship> {
        match self.record.relationships.get(relationship) {
            None => Ok(Relationship::Empty),
            Some(value) => serde_json::from_value(value.clone()).map_err(|_| {
                self.invalid(
                    relationship,
                    format!("{} is not a reference, a list or a map of them", value),
                )
            }),
        }
    }

    fn check(&self, world: &World, relationship: &str, reference: EntityRef, expected: EntityKind) -> Result<usize> {
        if reference.class != expected {
            return Err(self.invalid(
                relationship,
                format!("expected a {} reference, got {}", expected, reference.class),
            ));
        }
        if !world.contains(reference) {
            return Err(self.invalid(relationship, format!("{} {} does not exist", reference.class, reference.id)));
        }
        Ok(reference.id)
    }

    /// Single reference, `None` when absent or `null`.
    fn one(&self, world: &World, relationship: &str, expected: EntityKind) -> Result<Option<usize>> {
        match self.relationship(relationship)? {
            Relationship::Empty => Ok(None),
            Relationship::One(reference) => self.check(world, relationship, reference, expected).map(Some),
            _ => Err(self.invalid(relationship, format!("expected a single {} reference", expected))),
        }
    }

    fn required(&self, world: &World, relationship: &str, expected: EntityKind) -> Result<usize> {
        self.one(world, relationship, expected)?
            .ok_or_else(|| self.invalid(relationship, "reference is missing".to_string()))
    }

    /// List or keyed map of references, `None` when absent or `null`.
    fn many(&self, world: &World, relationship: &str, expected: EntityKind) -> Result<Option<Vec<usize>>> {
        let references = match self.relationship(relationship)? {
            Relationship::Empty => return Ok(None),
            Relationship::Many(references) => references,
            Relationship::Keyed(references) => references.into_values().collect(),
            Relationship::One(reference) => {
                return Err(self.invalid(
                    relationship,
                    format!("expected a list of references, got a single {} reference", reference.class),
                ))
            }
        };
        references
            .into_iter()
            .map(|reference| self.check(world, relationship, reference, expected))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// Checks that a listed back-reference holds exactly the ids derived from the owning side.
    fn matches(&self, world: &World, relationship: &str, expected: EntityKind, derived: &[usize]) -> Result<()> {
        if let Some(listed) = self.many(world, relationship, expected)? {
            if !same_members(&listed, derived) {
                return Err(self.invalid(
                    relationship,
                    format!("lists {:?}, but the owning side gives {:?}", listed, derived),
                ));
            }
        }
        Ok(())
    }
}

fn same_members(a: &[usize], b: &[usize]) -> bool {
    a.len() == b.len() && a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
}

/// Hosting relationships found in a dataset, replayed once every entity exists.
#[derive(Default)]
struct Hosting {
    /// `(service, data center)` from the service side.
    hosted: Vec<(usize, usize)>,
    /// Services listed by data centers that carry a `services` relationship.
    listed: BTreeMap<usize, Vec<usize>>,
}

impl Hosting {
    fn check(&self) -> Result<()> {
        for (&data_center, listed) in self.listed.iter() {
            let derived = self
                .hosted
                .iter()
                .filter(|&&(_, host)| host == data_center)
                .map(|&(service, _)| service)
                .collect::<Vec<_>>();
            if !same_members(listed, &derived) {
                return Err(Error::InvalidRelationship {
                    kind: EntityKind::DataCenter,
                    id: data_center,
                    relationship: "services".to_string(),
                    reason: format!("lists {:?}, but services {:?} point to it", listed, derived),
                });
            }
        }
        Ok(())
    }
}

fn check_id(kind: EntityKind, id: usize, record: &RawRecord) -> Result<()> {
    match record.attributes.get("id") {
        None => Ok(()),
        Some(value) if value.as_u64() == Some(id as u64) => Ok(()),
        Some(value) => Err(Error::InvalidAttribute {
            kind,
            id,
            reason: format!("id {} does not match its position, expected {}", value, id),
        }),
    }
}

fn parse_document(json: &str) -> Result<BTreeMap<EntityKind, Vec<RawRecord>>> {
    let document: Map<String, Value> = serde_json::from_str(json)?;
    let mut records = BTreeMap::new();
    for (class, value) in document.into_iter() {
        if IGNORED_CLASSES.contains(&class.as_str()) {
            continue;
        }
        let kind = EntityKind::from_name(&class).ok_or_else(|| Error::UnknownComponentClass(class.clone()))?;
        records.insert(kind, serde_json::from_value::<Vec<RawRecord>>(value)?);
    }
    Ok(records)
}

impl World {
    /// Builds a scenario from a JSON dataset.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records = parse_document(json)?;
        let empty = Vec::new();
        let of = |kind: EntityKind| records.get(&kind).unwrap_or(&empty);

        let mut world = World::new();
        for kind in EntityKind::ALL {
            for (index, record) in of(kind).iter().enumerate() {
                world.create_from_record(kind, index + 1, record)?;
            }
        }

        let mut hosting = Hosting::default();
        for kind in EntityKind::ALL {
            for (index, record) in of(kind).iter().enumerate() {
                world.check_back_references(kind, index + 1, record, &mut hosting)?;
            }
        }
        hosting.check()?;
        for (service, data_center) in hosting.hosted {
            let user = world.service_user(service)?;
            world.provision_service(user, service, data_center)?;
        }

        world.validate()?;
        world.log_summary();
        Ok(world)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    fn create_from_record(&mut self, kind: EntityKind, id: usize, record: &RawRecord) -> Result<()> {
        check_id(kind, id, record)?;
        let resolver = Resolver { kind, id, record };
        match kind {
            EntityKind::Region => {
                let attributes: RegionAttributes = parse_attributes::<Region>(id, &record.component())?;
                self.add_region(attributes.label, attributes.coordinates)?;
            }
            EntityKind::Provider => {
                self.add_provider();
            }
            EntityKind::DataCenter => {
                let attributes: DataCenterAttributes = parse_attributes::<DataCenter>(id, &record.component())?;
                let region = resolver.required(self, "region", EntityKind::Region)?;
                let provider = resolver.required(self, "provider", EntityKind::Provider)?;
                self.add_data_center(region, provider, attributes.capacity, attributes.allocation_cost)?;
                self.data_centers.find_by_id_mut(id)?.alias = attributes.alias;
            }
            EntityKind::User => {
                let attributes: UserAttributes = parse_attributes::<User>(id, &record.component())?;
                let region = resolver.required(self, "region", EntityKind::Region)?;
                self.add_user(region, attributes.delay_sla)?;
            }
            EntityKind::Application => {
                let user = resolver.required(self, "user", EntityKind::User)?;
                self.add_application(user)
                    .map_err(|e| resolver.invalid("user", e.to_string()))?;
            }
            EntityKind::Service => {
                let attributes: ServiceAttributes = parse_attributes::<Service>(id, &record.component())?;
                let application = resolver.required(self, "application", EntityKind::Application)?;
                self.add_service(application, attributes.label, attributes.demand)?;
            }
            EntityKind::NetworkLink => {
                let attributes: NetworkLinkAttributes = parse_attributes::<NetworkLink>(id, &record.component())?;
                let nodes = resolver.many(self, "nodes", EntityKind::Region)?.unwrap_or_default();
                let [a, b] = nodes[..] else {
                    return Err(resolver.invalid("nodes", format!("a link joins two regions, got {:?}", nodes)));
                };
                self.add_link(a, b, attributes.delay)
                    .map_err(|e| resolver.invalid("nodes", e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Checks the relationships that are not needed to create entities.
    fn check_back_references(
        &mut self,
        kind: EntityKind,
        id: usize,
        record: &RawRecord,
        hosting: &mut Hosting,
    ) -> Result<()> {
        let resolver = Resolver { kind, id, record };
        match kind {
            EntityKind::Region => {
                let region = self.regions.find_by_id(id)?;
                resolver.matches(self, "data_centers", EntityKind::DataCenter, &region.data_centers)?;
                resolver.matches(self, "users", EntityKind::User, &region.users)?;
            }
            EntityKind::Provider => {
                let provider = self.providers.find_by_id(id)?;
                resolver.matches(self, "data_centers", EntityKind::DataCenter, &provider.data_centers)?;
            }
            EntityKind::DataCenter => {
                if let Some(services) = resolver.many(self, "services", EntityKind::Service)? {
                    hosting.listed.insert(id, services);
                }
            }
            EntityKind::User => {
                let derived = self.users.find_by_id(id)?.application;
                let listed = resolver.one(self, "application", EntityKind::Application)?;
                if listed.is_some() && listed != derived {
                    return Err(resolver.invalid(
                        "application",
                        format!("lists {:?}, but the application side gives {:?}", listed, derived),
                    ));
                }
            }
            EntityKind::Application => {
                if let Some(chain) = resolver.many(self, "services", EntityKind::Service)? {
                    self.set_service_chain(id, chain)?;
                }
            }
            EntityKind::Service => {
                if let Some(data_center) = resolver.one(self, "data_center", EntityKind::DataCenter)? {
                    hosting.hosted.push((id, data_center));
                }
            }
            EntityKind::NetworkLink => {}
        }
        Ok(())
    }

    /// Writes the scenario in the dataset format read by [World::from_json_str].
    pub fn to_json_value(&self) -> Result<Value> {
        fn records<'a, T: Component + 'a>(items: impl Iterator<Item = &'a T>) -> Result<Value> {
            let mut records = Vec::new();
            for item in items {
                records.push(serde_json::to_value(item.to_record()?)?);
            }
            Ok(Value::Array(records))
        }

        let mut document = Map::new();
        document.insert(EntityKind::Region.to_string(), records(self.regions.iter())?);
        document.insert(EntityKind::Provider.to_string(), records(self.providers.iter())?);
        document.insert(EntityKind::DataCenter.to_string(), records(self.data_centers.iter())?);
        document.insert(EntityKind::User.to_string(), records(self.users.iter())?);
        document.insert(EntityKind::Application.to_string(), records(self.applications.iter())?);
        document.insert(EntityKind::Service.to_string(), records(self.services.iter())?);
        document.insert(EntityKind::NetworkLink.to_string(), records(self.topology.links().iter())?);
        Ok(Value::Object(document))
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_json_value()?)?)
    }

    pub fn write_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}
