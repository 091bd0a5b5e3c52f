use crate::{
    error::Result,
    placement_strategies::common::{first_fitting, place_or_skip},
    placement_strategy::PlacementStrategy,
    world::World,
};

/// Order in which data centers are tried for each service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitOrdering {
    /// Least free capacity first.
    Tightest,
    /// Most free capacity first.
    Loosest,
}

/// Places services one by one, application by application, on the first data center that
/// still fits them after ranking all data centers by free capacity.
pub struct FitStrategy {
    ordering: FitOrdering,
}

impl FitStrategy {
    pub fn new(ordering: FitOrdering) -> Self {
        Self { ordering }
    }

    pub fn best_fit() -> Self {
        Self::new(FitOrdering::Tightest)
    }

    pub fn worst_fit() -> Self {
        Self::new(FitOrdering::Loosest)
    }
}

impl PlacementStrategy for FitStrategy {
    fn name(&self) -> &str {
        match self.ordering {
            FitOrdering::Tightest => "best_fit",
            FitOrdering::Loosest => "worst_fit",
        }
    }

    fn place(&mut self, world: &mut World) -> Result<()> {
        let chains = world
            .applications()
            .iter()
            .map(|application| application.services.clone())
            .collect::<Vec<_>>();

        for service in chains.into_iter().flatten() {
            let mut data_centers = world
                .data_centers()
                .iter()
                .map(|data_center| (data_center.free_capacity(), data_center.id))
                .collect::<Vec<_>>();
            // stable, so equal free capacity keeps id order
            match self.ordering {
                FitOrdering::Tightest => data_centers.sort_by_key(|&(free, _)| free),
                FitOrdering::Loosest => data_centers.sort_by_key(|&(free, _)| std::cmp::Reverse(free)),
            }
            let candidates = data_centers.into_iter().map(|(_, id)| id).collect::<Vec<_>>();

            let host = first_fitting(world, service, &candidates)?;
            place_or_skip(world, self.name(), service, host)?;
        }
        Ok(())
    }
}
