//! Placement primitives: provisioning, communication paths and scenario reset.

use geoplace_topology::TopologyError;
use log::debug;

use crate::{
    data_center::DataCenterId,
    entity::EntityKind,
    error::{Error, Result},
    region::RegionId,
    service::ServiceId,
    user::UserId,
    world::World,
};

/// One data center id per service, indexed by `service id - 1`.
pub type Placement = Vec<DataCenterId>;

impl World {
    /// Hosts `service` on `data_center` and refreshes the communication path of `user`.
    ///
    /// Capacity is not checked: an overloaded data center is a scoring penalty, not an error.
    /// A service that is already hosted elsewhere is moved.
    pub fn provision_service(&mut self, user: UserId, service: ServiceId, data_center: DataCenterId) -> Result<()> {
        let owner = self.service_user(service)?;
        if owner != user {
            return Err(Error::InvalidRelationship {
                kind: EntityKind::Service,
                id: service,
                relationship: "application".to_string(),
                reason: format!("service belongs to user {}, not {}", owner, user),
            });
        }
        self.data_centers.find_by_id(data_center)?;

        if self.services.find_by_id(service)?.data_center.is_some() {
            self.detach(service)?;
        }

        let demand = self.services.find_by_id(service)?.demand;
        let host = self.data_centers.find_by_id_mut(data_center)?;
        host.demand = host.demand.checked_add(demand).ok_or_else(|| Error::InvalidAttribute {
            kind: EntityKind::DataCenter,
            id: data_center,
            reason: format!("demand {} plus {} does not fit in u64", host.demand, demand),
        })?;
        host.services.push(service);
        self.services.find_by_id_mut(service)?.data_center = Some(data_center);
        debug!("provisioned service {} on data center {}", service, data_center);

        self.recompute_communication_path(user)?;
        Ok(())
    }

    /// Removes `service` from its host, if any, and refreshes its user's communication path.
    pub fn unprovision_service(&mut self, service: ServiceId) -> Result<()> {
        if self.services.find_by_id(service)?.data_center.is_none() {
            return Ok(());
        }
        self.detach(service)?;
        let user = self.service_user(service)?;
        self.recompute_communication_path(user)?;
        Ok(())
    }

    fn detach(&mut self, service: ServiceId) -> Result<()> {
        let (demand, host) = {
            let service = self.services.find_by_id_mut(service)?;
            (service.demand, service.data_center.take())
        };
        if let Some(host) = host {
            let data_center = self.data_centers.find_by_id_mut(host)?;
            data_center.services.retain(|&hosted| hosted != service);
            data_center.demand -= demand;
        }
        Ok(())
    }

    /// Rebuilds the per-hop shortest paths of `[user.region] + [host region of each service]`.
    ///
    /// The chain stops at the first unplaced service and at the first unreachable hop, so the
    /// path is shorter than the service list exactly when the application is not fully reachable.
    pub fn recompute_communication_path(&mut self, user: UserId) -> Result<f64> {
        let chain = self.communication_chain(user)?;

        let mut communication_path = Vec::with_capacity(chain.len().saturating_sub(1));
        for hop in chain.windows(2) {
            match self.topology.shortest_path(hop[0], hop[1]) {
                Ok(path) => communication_path.push(path),
                Err(TopologyError::NoPathFound { origin, target }) => {
                    debug!("user {}: region {} is unreachable from {}", user, target, origin);
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.users.find_by_id_mut(user)?.communication_path = communication_path;
        self.recompute_delay(user)
    }

    /// Sums hop delays of the stored communication path. `+inf` while the path is incomplete.
    pub fn recompute_delay(&mut self, user: UserId) -> Result<f64> {
        let chain_length = match self.users.find_by_id(user)?.application {
            Some(application) => self.applications.find_by_id(application)?.services.len(),
            None => 0,
        };

        let user = self.users.find_by_id_mut(user)?;
        user.delay = if user.communication_path.len() < chain_length {
            f64::INFINITY
        } else {
            let mut delay = 0u128;
            for path in user.communication_path.iter() {
                delay += self.topology.path_delay(path)? as u128;
            }
            delay as f64
        };
        Ok(user.delay)
    }

    /// Regions of the user followed by the host regions of the placed prefix of its service chain.
    fn communication_chain(&self, user: UserId) -> Result<Vec<RegionId>> {
        let user = self.users.find_by_id(user)?;
        let mut chain = vec![user.region];
        if let Some(application) = user.application {
            for &service in self.applications.find_by_id(application)?.services.iter() {
                match self.services.find_by_id(service)?.data_center {
                    Some(host) => chain.push(self.data_centers.find_by_id(host)?.region),
                    None => break,
                }
            }
        }
        Ok(chain)
    }

    /// Detaches every service from its host and clears every user's delay and path.
    ///
    /// Must run between independent trials.
    pub fn reset_scenario(&mut self) {
        for data_center in self.data_centers.iter_mut() {
            data_center.services.clear();
            data_center.demand = 0;
        }
        for service in self.services.iter_mut() {
            service.data_center = None;
        }
        for user in self.users.iter_mut() {
            user.delay = f64::INFINITY;
            user.communication_path.clear();
        }
    }

    /// Provisions service `i + 1` on data center `solution[i]` for every entry.
    pub fn apply_placement(&mut self, solution: &[DataCenterId]) -> Result<()> {
        if solution.len() != self.services.count() {
            return Err(Error::InvalidPlacement(format!(
                "expected {} entries, got {}",
                self.services.count(),
                solution.len()
            )));
        }
        for (service, &data_center) in (1..).zip(solution.iter()) {
            let user = self.service_user(service)?;
            self.provision_service(user, service, data_center)?;
        }
        Ok(())
    }

    /// Current host of every service, indexed by `service id - 1`.
    pub fn current_placement(&self) -> Vec<Option<DataCenterId>> {
        self.services.iter().map(|service| service.data_center).collect()
    }

    pub fn placed_service_count(&self) -> usize {
        self.services.iter().filter(|service| service.is_placed()).count()
    }
}
