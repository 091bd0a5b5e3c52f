use log::info;
use rand::SeedableRng;
use rand_pcg::Pcg64;

use crate::{
    error::{Error, Result},
    metrics::Evaluation,
    placement::Placement,
    placement_strategy::{PlacementStrategy, StrategyParameters},
    search::PlacementProblem,
    world::World,
};

/// Evaluates a population of random feasible placements and applies the best one.
///
/// Candidates are ranked by penalty first, then by the sum of both objectives.
pub struct RandomSearchStrategy {
    pop_size: usize,
    rng: Pcg64,
}

impl RandomSearchStrategy {
    pub fn new(pop_size: usize, seed: u64) -> Self {
        Self {
            pop_size,
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    pub fn from_parameters(parameters: &StrategyParameters) -> Result<Self> {
        let pop_size = parameters.get_or("pop_size", 50)?;
        if pop_size == 0 {
            return Err(Error::InvalidParameter {
                name: "pop_size".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(Self::new(pop_size, parameters.get_or("seed", 1)?))
    }
}

impl PlacementStrategy for RandomSearchStrategy {
    fn name(&self) -> &str {
        "random_search"
    }

    fn place(&mut self, world: &mut World) -> Result<()> {
        let mut problem = PlacementProblem::new(world);
        let population = problem.sample_population(self.pop_size, &mut self.rng)?;

        let mut best: Option<(Placement, Evaluation)> = None;
        for candidate in population {
            let evaluation = problem.evaluate(&candidate)?;
            let better = match &best {
                None => true,
                Some((_, current)) => {
                    (evaluation.penalty, evaluation.combined()) < (current.penalty, current.combined())
                }
            };
            if better {
                best = Some((candidate, evaluation));
            }
        }

        if let Some((placement, evaluation)) = best {
            info!(
                "random_search: best candidate has {:.2}% SLA violations, {:.2}% allocation cost, penalty {}",
                evaluation.sla_violation_pct, evaluation.allocation_cost_pct, evaluation.penalty
            );
            world.apply_placement(&placement)?;
        }
        Ok(())
    }
}
