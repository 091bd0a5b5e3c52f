//! Registry of every entity of a scenario together with its network topology.

use std::collections::{BTreeMap, BTreeSet};

use geoplace_topology::Topology;
use log::info;
use serde::Serialize;

use crate::{
    application::{Application, ApplicationId},
    data_center::{DataCenter, DataCenterId},
    entity::{Arena, EntityKind, EntityRef},
    error::{Error, Result},
    network_link::LinkId,
    provider::{Provider, ProviderId},
    region::{Region, RegionId},
    service::{Service, ServiceId},
    user::{User, UserId},
};

/// Scenario context owning one arena per entity type and the topology.
///
/// Every component and strategy receives the world explicitly. Cloning a world yields an
/// independent snapshot that can be evaluated on another thread.
#[derive(Debug, Clone, Default)]
pub struct World {
    pub(crate) regions: Arena<Region>,
    pub(crate) providers: Arena<Provider>,
    pub(crate) data_centers: Arena<DataCenter>,
    pub(crate) users: Arena<User>,
    pub(crate) applications: Arena<Application>,
    pub(crate) services: Arena<Service>,
    pub(crate) topology: Topology,
}

/// Entity counts of a loaded scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioSummary {
    pub counts: BTreeMap<EntityKind, usize>,
    pub data_centers_per_provider: BTreeMap<ProviderId, usize>,
    pub data_centers_per_region: BTreeMap<RegionId, usize>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_region(&mut self, label: impl Into<String>, coordinates: Option<(f64, f64)>) -> Result<RegionId> {
        let label = label.into();
        let id = self.regions.create(|id| Region {
            id,
            label,
            coordinates,
            data_centers: Vec::new(),
            users: Vec::new(),
        });
        self.topology.add_region(id)?;
        Ok(id)
    }

    pub fn add_provider(&mut self) -> ProviderId {
        self.providers.create(|id| Provider {
            id,
            data_centers: Vec::new(),
        })
    }

    pub fn add_data_center(
        &mut self,
        region: RegionId,
        provider: ProviderId,
        capacity: u64,
        allocation_cost: BTreeMap<String, u64>,
    ) -> Result<DataCenterId> {
        self.regions.find_by_id(region)?;
        self.providers.find_by_id(provider)?;
        let id = self.data_centers.create(|id| DataCenter {
            id,
            alias: String::new(),
            capacity,
            demand: 0,
            allocation_cost,
            region,
            provider,
            services: Vec::new(),
        });
        self.regions.find_by_id_mut(region)?.data_centers.push(id);
        self.providers.find_by_id_mut(provider)?.data_centers.push(id);
        Ok(id)
    }

    pub fn add_user(&mut self, region: RegionId, delay_sla: u64) -> Result<UserId> {
        self.regions.find_by_id(region)?;
        let id = self.users.create(|id| User {
            id,
            region,
            application: None,
            delay_sla,
            delay: f64::INFINITY,
            communication_path: Vec::new(),
        });
        self.regions.find_by_id_mut(region)?.users.push(id);
        Ok(id)
    }

    /// Creates the application of `user`. A user owns exactly one application.
    pub fn add_application(&mut self, user: UserId) -> Result<ApplicationId> {
        if let Some(existing) = self.users.find_by_id(user)?.application {
            return Err(Error::InvalidRelationship {
                kind: EntityKind::User,
                id: user,
                relationship: "application".to_string(),
                reason: format!("user already owns application {}", existing),
            });
        }
        let id = self.applications.create(|id| Application {
            id,
            user,
            services: Vec::new(),
        });
        self.users.find_by_id_mut(user)?.application = Some(id);
        Ok(id)
    }

    /// Appends a service to the end of the application's chain.
    pub fn add_service(
        &mut self,
        application: ApplicationId,
        label: impl Into<String>,
        demand: u64,
    ) -> Result<ServiceId> {
        self.applications.find_by_id(application)?;
        let label = label.into();
        let id = self.services.create(|id| Service {
            id,
            label,
            demand,
            application,
            data_center: None,
        });
        self.applications.find_by_id_mut(application)?.services.push(id);
        Ok(id)
    }

    pub fn add_link(&mut self, a: RegionId, b: RegionId, delay: u64) -> Result<LinkId> {
        Ok(self.topology.add_link(a, b, delay)?)
    }

    /// Reorders the service chain of an application. `chain` must be a permutation of its services.
    pub fn set_service_chain(&mut self, application: ApplicationId, chain: Vec<ServiceId>) -> Result<()> {
        let current = self.applications.find_by_id(application)?;
        let expected = current.services.iter().copied().collect::<BTreeSet<_>>();
        let given = chain.iter().copied().collect::<BTreeSet<_>>();
        if expected != given || chain.len() != current.services.len() {
            return Err(Error::InvalidRelationship {
                kind: EntityKind::Application,
                id: application,
                relationship: "services".to_string(),
                reason: format!("{:?} is not a permutation of {:?}", chain, current.services),
            });
        }
        self.applications.find_by_id_mut(application)?.services = chain;
        Ok(())
    }

    /// Drops every entity of every type and the topology.
    pub fn clear(&mut self) {
        self.regions.clear();
        self.providers.clear();
        self.data_centers.clear();
        self.users.clear();
        self.applications.clear();
        self.services.clear();
        self.topology.clear();
    }

    pub fn regions(&self) -> &Arena<Region> {
        &self.regions
    }

    pub fn providers(&self) -> &Arena<Provider> {
        &self.providers
    }

    pub fn data_centers(&self) -> &Arena<DataCenter> {
        &self.data_centers
    }

    pub fn users(&self) -> &Arena<User> {
        &self.users
    }

    pub fn applications(&self) -> &Arena<Application> {
        &self.applications
    }

    pub fn services(&self) -> &Arena<Service> {
        &self.services
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn region(&self, id: RegionId) -> Result<&Region> {
        self.regions.find_by_id(id)
    }

    pub fn provider(&self, id: ProviderId) -> Result<&Provider> {
        self.providers.find_by_id(id)
    }

    pub fn data_center(&self, id: DataCenterId) -> Result<&DataCenter> {
        self.data_centers.find_by_id(id)
    }

    pub fn user(&self, id: UserId) -> Result<&User> {
        self.users.find_by_id(id)
    }

    pub fn application(&self, id: ApplicationId) -> Result<&Application> {
        self.applications.find_by_id(id)
    }

    pub fn service(&self, id: ServiceId) -> Result<&Service> {
        self.services.find_by_id(id)
    }

    /// User accessing the application a service belongs to.
    pub fn service_user(&self, service: ServiceId) -> Result<UserId> {
        let application = self.services.find_by_id(service)?.application;
        Ok(self.applications.find_by_id(application)?.user)
    }

    /// Resolves a typed reference against the arena of its kind.
    pub fn contains(&self, reference: EntityRef) -> bool {
        match reference.class {
            EntityKind::Region => self.regions.contains(reference.id),
            EntityKind::Provider => self.providers.contains(reference.id),
            EntityKind::DataCenter => self.data_centers.contains(reference.id),
            EntityKind::User => self.users.contains(reference.id),
            EntityKind::Application => self.applications.contains(reference.id),
            EntityKind::Service => self.services.contains(reference.id),
            EntityKind::NetworkLink => self.topology.link(reference.id).is_some(),
        }
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Region => self.regions.count(),
            EntityKind::Provider => self.providers.count(),
            EntityKind::DataCenter => self.data_centers.count(),
            EntityKind::User => self.users.count(),
            EntityKind::Application => self.applications.count(),
            EntityKind::Service => self.services.count(),
            EntityKind::NetworkLink => self.topology.links().len(),
        }
    }

    pub fn summary(&self) -> ScenarioSummary {
        ScenarioSummary {
            counts: EntityKind::ALL.into_iter().map(|kind| (kind, self.count(kind))).collect(),
            data_centers_per_provider: self
                .providers
                .iter()
                .map(|provider| (provider.id, provider.data_centers.len()))
                .collect(),
            data_centers_per_region: self
                .regions
                .iter()
                .map(|region| (region.id, region.data_centers.len()))
                .collect(),
        }
    }

    pub fn log_summary(&self) {
        let summary = self.summary();
        for (kind, count) in summary.counts.iter() {
            info!("{}: {}", kind, count);
        }
        for (provider, count) in summary.data_centers_per_provider.iter() {
            info!("provider {}: {} data centers", provider, count);
        }
        for (region, count) in summary.data_centers_per_region.iter() {
            info!("region {}: {} data centers", region, count);
        }
    }

    /// Checks the static constraints a scenario must satisfy before strategies run on it.
    pub fn validate(&self) -> Result<()> {
        for user in self.users.iter() {
            if user.application.is_none() {
                return Err(Error::InvalidRelationship {
                    kind: EntityKind::User,
                    id: user.id,
                    relationship: "application".to_string(),
                    reason: "user has no application".to_string(),
                });
            }
        }

        let labels = self
            .services
            .iter()
            .map(|service| service.label.as_str())
            .collect::<BTreeSet<_>>();
        for data_center in self.data_centers.iter() {
            for label in labels.iter() {
                if !data_center.allocation_cost.contains_key(*label) {
                    return Err(Error::MissingAllocationCost {
                        data_center: data_center.id,
                        label: label.to_string(),
                    });
                }
            }
            if let Some((label, _)) = data_center.allocation_cost.iter().find(|&(_, &cost)| cost == 0) {
                return Err(Error::InvalidAttribute {
                    kind: EntityKind::DataCenter,
                    id: data_center.id,
                    reason: format!("allocation cost of '{}' must be positive", label),
                });
            }
        }
        Ok(())
    }

    /// Checks host/service consistency and the demand bookkeeping of every data center.
    pub fn check_invariants(&self) -> Result<()> {
        for data_center in self.data_centers.iter() {
            let mut demand = 0u128;
            for &service_id in data_center.services.iter() {
                let service = self.services.find_by_id(service_id)?;
                if service.data_center != Some(data_center.id) {
                    return Err(Error::InvalidPlacement(format!(
                        "data center {} lists service {} hosted on {:?}",
                        data_center.id, service_id, service.data_center
                    )));
                }
                demand += service.demand as u128;
            }
            if demand != data_center.demand as u128 {
                return Err(Error::InvalidPlacement(format!(
                    "data center {} has demand {} but hosts {}",
                    data_center.id, data_center.demand, demand
                )));
            }
        }
        for service in self.services.iter() {
            if let Some(host) = service.data_center {
                if !self.data_centers.find_by_id(host)?.services.contains(&service.id) {
                    return Err(Error::InvalidPlacement(format!(
                        "service {} points to data center {} which does not list it",
                        service.id, host
                    )));
                }
            }
        }
        Ok(())
    }
}
