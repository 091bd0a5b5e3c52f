//! Placement as a black-box optimization problem.
//!
//! A candidate is an integer vector with one data center id per service (`solution[i]` hosts
//! service `i + 1`). [PlacementProblem::evaluate] maps it to two objectives and a penalty,
//! which is all a multi-objective evolutionary optimizer needs.

use std::ops::RangeInclusive;

use log::{debug, warn};
use rand_pcg::Pcg64;

use crate::{
    data_center::DataCenterId,
    error::Result,
    metrics::Evaluation,
    placement::Placement,
    placement_strategies::common::shuffle,
    world::World,
};

/// Exclusive view of a world that evaluates candidate placements against it.
///
/// Every method leaves the world reset, so consecutive trials are independent.
pub struct PlacementProblem<'w> {
    world: &'w mut World,
}

impl<'w> PlacementProblem<'w> {
    pub fn new(world: &'w mut World) -> Self {
        Self { world }
    }

    pub fn world(&self) -> &World {
        self.world
    }

    /// Number of decision variables, one per service.
    pub fn variables(&self) -> usize {
        self.world.services().count()
    }

    /// Inclusive range of every variable.
    pub fn bounds(&self) -> RangeInclusive<DataCenterId> {
        1..=self.world.data_centers().count()
    }

    pub fn objective_count(&self) -> usize {
        2
    }

    pub fn constraint_count(&self) -> usize {
        1
    }

    /// Applies `solution`, scores it and resets the scenario.
    pub fn evaluate(&mut self, solution: &[DataCenterId]) -> Result<Evaluation> {
        self.world.reset_scenario();
        let applied = self.world.apply_placement(solution);
        let evaluation = applied.and_then(|_| self.world.evaluate_placement());
        self.world.reset_scenario();
        evaluation
    }

    /// Builds one feasible candidate by placing services in random order on random data centers
    /// that still have room for them, then resets the scenario.
    ///
    /// A service that fits nowhere gets the data center with the most remaining capacity.
    pub fn sample(&mut self, rng: &mut Pcg64) -> Result<Placement> {
        self.world.reset_scenario();

        let mut services = self.world.services().ids().collect::<Vec<_>>();
        shuffle(rng, &mut services);

        for &service in services.iter() {
            let mut data_centers = self.world.data_centers().ids().collect::<Vec<_>>();
            shuffle(rng, &mut data_centers);

            let demand = self.world.service(service)?.demand;
            let mut host = None;
            for &data_center in data_centers.iter() {
                if self.world.data_center(data_center)?.can_host(demand) {
                    host = Some(data_center);
                    break;
                }
            }
            if let Some(data_center) = host {
                let user = self.world.service_user(service)?;
                self.world.provision_service(user, service, data_center)?;
            }
        }

        let fallback = self
            .world
            .data_centers()
            .iter()
            .max_by(|a, b| a.free_capacity().cmp(&b.free_capacity()).then(b.id.cmp(&a.id)))
            .map(|data_center| data_center.id)
            .unwrap_or(1);
        let placement = self
            .world
            .services()
            .iter()
            .map(|service| service.data_center().unwrap_or(fallback))
            .collect::<Placement>();

        self.world.reset_scenario();
        Ok(placement)
    }

    /// Draws up to `pop_size` distinct samples, giving up after `100 * pop_size` attempts.
    pub fn sample_population(&mut self, pop_size: usize, rng: &mut Pcg64) -> Result<Vec<Placement>> {
        let mut population: Vec<Placement> = Vec::with_capacity(pop_size);
        let max_attempts = 100 * pop_size;
        let mut attempts = 0;
        while population.len() < pop_size && attempts < max_attempts {
            attempts += 1;
            let placement = self.sample(rng)?;
            if !population.contains(&placement) {
                population.push(placement);
            }
        }
        if population.len() < pop_size {
            warn!(
                "only {} distinct placements found after {} attempts, wanted {}",
                population.len(),
                attempts,
                pop_size
            );
        } else {
            debug!("sampled {} placements in {} attempts", population.len(), attempts);
        }
        Ok(population)
    }
}
