//! Latency-aware and cost-efficient greedy placement.
//!
//! Applications are placed in order of scarcity: those whose user has little free capacity
//! within its delay SLA, or whose services have a large potential cost reduction, go first.
//! Each service then goes to the cheapest data center reachable within the SLA from the
//! previous hop of its chain, falling back to cheaper or farther ones when that one is full.

use std::cmp::Ordering;

use log::debug;

use crate::{
    application::ApplicationId,
    data_center::DataCenterId,
    error::{Error, Result},
    metrics::Bounds,
    placement_strategies::common::{first_fitting, place_or_skip, previous_hop_region, reachable_delay},
    placement_strategy::PlacementStrategy,
    service::ServiceId,
    world::World,
};

/// Delay score of an application whose user has no free capacity within its SLA.
const NO_COMPLIANT_CAPACITY_SCORE: f64 = 2.;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApplicationScore {
    pub application: ApplicationId,
    /// Inverse of the free capacity reachable within the user's delay SLA.
    pub delay_score: f64,
    /// Potential saving of placing every service on its cheapest data center.
    pub allocation_cost_score: f64,
    pub norm_delay_score: f64,
    pub norm_allocation_cost_score: f64,
}

impl ApplicationScore {
    pub fn priority(&self) -> f64 {
        self.norm_delay_score + self.norm_allocation_cost_score
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub data_center: DataCenterId,
    /// `None` when the data center is unreachable from the previous hop.
    pub delay: Option<u64>,
    pub respects_delay_sla: bool,
    pub allocation_cost_score: f64,
    pub norm_allocation_cost_score: f64,
}

impl CandidateScore {
    pub fn priority(&self) -> f64 {
        self.respects_delay_sla as u8 as f64 + self.norm_allocation_cost_score
    }
}

#[derive(Default)]
pub struct LatencyCostAwareStrategy {}

impl LatencyCostAwareStrategy {
    pub fn new() -> Self {
        Self {}
    }

    /// Scores of every application, in descending placement priority.
    pub fn application_scores(world: &World) -> Result<Vec<ApplicationScore>> {
        let mut scores = Vec::with_capacity(world.applications().count());
        for application in world.applications().iter() {
            let user = world.user(application.user)?;

            let mut compliant_free_capacity = 0;
            for data_center in world.data_centers().iter() {
                if let Some(delay) = reachable_delay(world, user.region, data_center.region)? {
                    if delay <= user.delay_sla {
                        compliant_free_capacity += data_center.free_capacity();
                    }
                }
            }
            let delay_score = if compliant_free_capacity > 0 {
                1. / compliant_free_capacity as f64
            } else {
                NO_COMPLIANT_CAPACITY_SCORE
            };

            let mut allocation_cost_score = 0.;
            for &service in application.services.iter() {
                let costs = service_costs(world, service)?;
                let (Some(&min_cost), Some(&max_cost)) = (costs.iter().min(), costs.iter().max()) else {
                    continue;
                };
                let cheapest = costs.iter().filter(|&&cost| cost == min_cost).count();
                let potential_cost_reduction = (max_cost - min_cost).max(1) as f64;
                allocation_cost_score += potential_cost_reduction / (cheapest as f64 * min_cost as f64);
            }

            scores.push(ApplicationScore {
                application: application.id,
                delay_score,
                allocation_cost_score,
                norm_delay_score: 0.,
                norm_allocation_cost_score: 0.,
            });
        }

        if let (Some(delay_bounds), Some(cost_bounds)) = (
            Bounds::of(scores.iter().map(|score| score.delay_score)),
            Bounds::of(scores.iter().map(|score| score.allocation_cost_score)),
        ) {
            for score in scores.iter_mut() {
                score.norm_delay_score = delay_bounds.normalize(score.delay_score);
                score.norm_allocation_cost_score = cost_bounds.normalize(score.allocation_cost_score);
            }
        }

        scores.sort_by(|a, b| descending(a.priority(), b.priority()));
        Ok(scores)
    }

    /// Scores of every data center as the host of `service`, in descending preference.
    pub fn candidate_scores(world: &World, service: ServiceId) -> Result<Vec<CandidateScore>> {
        let origin = previous_hop_region(world, service)?;
        let delay_sla = world.user(world.service_user(service)?)?.delay_sla;
        let label = &world.service(service)?.label;

        let mut candidates = Vec::with_capacity(world.data_centers().count());
        for data_center in world.data_centers().iter() {
            let delay = reachable_delay(world, origin, data_center.region)?;
            let cost = data_center.cost_of(label).ok_or_else(|| Error::MissingAllocationCost {
                data_center: data_center.id,
                label: label.clone(),
            })?;
            candidates.push(CandidateScore {
                data_center: data_center.id,
                delay,
                respects_delay_sla: delay.is_some_and(|delay| delay <= delay_sla),
                allocation_cost_score: 1. / cost as f64,
                norm_allocation_cost_score: 0.,
            });
        }

        if let Some(bounds) = Bounds::of(candidates.iter().map(|candidate| candidate.allocation_cost_score)) {
            for candidate in candidates.iter_mut() {
                candidate.norm_allocation_cost_score = bounds.normalize(candidate.allocation_cost_score);
            }
        }

        candidates.sort_by(|a, b| descending(a.priority(), b.priority()));
        Ok(candidates)
    }
}

fn service_costs(world: &World, service: ServiceId) -> Result<Vec<u64>> {
    let label = &world.service(service)?.label;
    world
        .data_centers()
        .iter()
        .map(|data_center| {
            data_center.cost_of(label).ok_or_else(|| Error::MissingAllocationCost {
                data_center: data_center.id,
                label: label.clone(),
            })
        })
        .collect()
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

impl PlacementStrategy for LatencyCostAwareStrategy {
    fn name(&self) -> &str {
        "latency_cost_aware"
    }

    fn place(&mut self, world: &mut World) -> Result<()> {
        for score in Self::application_scores(world)? {
            debug!(
                "application {}: delay score {:.4}, allocation cost score {:.4}, priority {:.4}",
                score.application,
                score.delay_score,
                score.allocation_cost_score,
                score.priority()
            );
            let chain = world.application(score.application)?.services.clone();
            for service in chain {
                let candidates = Self::candidate_scores(world, service)?
                    .into_iter()
                    .map(|candidate| candidate.data_center)
                    .collect::<Vec<_>>();
                let host = first_fitting(world, service, &candidates)?;
                place_or_skip(world, self.name(), service, host)?;
            }
        }
        Ok(())
    }
}
