use geoplace_topology::TopologyError;
use log::debug;
use rand::Rng;
use rand_pcg::Pcg64;

use crate::{data_center::DataCenterId, error::Result, region::RegionId, service::ServiceId, world::World};

pub fn shuffle<T>(rng: &mut Pcg64, data: &mut [T]) {
    for i in 1..data.len() {
        data.swap(i, rng.gen_range(0..=i));
    }
}

/// Region the request reaches `service` from: the host region of the nearest placed predecessor
/// in the application chain, or the user's home region.
pub fn previous_hop_region(world: &World, service: ServiceId) -> Result<RegionId> {
    let application = world.application(world.service(service)?.application)?;
    let user = world.user(application.user)?;

    let position = application
        .services
        .iter()
        .position(|&id| id == service)
        .unwrap_or(application.services.len());
    for &predecessor in application.services[..position].iter().rev() {
        if let Some(host) = world.service(predecessor)?.data_center() {
            return Ok(world.data_center(host)?.region);
        }
    }
    Ok(user.region)
}

/// Delay of the shortest path between two regions, `None` if they are disconnected.
pub fn reachable_delay(world: &World, origin: RegionId, target: RegionId) -> Result<Option<u64>> {
    match world.topology().delay_between(origin, target) {
        Ok(delay) => Ok(Some(delay)),
        Err(TopologyError::NoPathFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// First data center of `candidates` that can take `service` without exceeding its capacity.
pub fn first_fitting(world: &World, service: ServiceId, candidates: &[DataCenterId]) -> Result<Option<DataCenterId>> {
    let demand = world.service(service)?.demand;
    for &candidate in candidates.iter() {
        if world.data_center(candidate)?.can_host(demand) {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// Provisions `service` on `host`, or logs that it stays unplaced.
pub fn place_or_skip(world: &mut World, strategy: &str, service: ServiceId, host: Option<DataCenterId>) -> Result<()> {
    match host {
        Some(data_center) => {
            let user = world.service_user(service)?;
            world.provision_service(user, service, data_center)
        }
        None => {
            debug!("{}: no data center can host service {}", strategy, service);
            Ok(())
        }
    }
}
