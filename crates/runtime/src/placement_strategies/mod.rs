//! Implementations of placement strategies.

pub mod common;
pub mod fit;
pub mod latency_cost_aware;
pub mod random_search;

use crate::{
    error::{Error, Result},
    placement_strategy::{read_name, PlacementStrategy},
};

use self::{fit::FitStrategy, latency_cost_aware::LatencyCostAwareStrategy, random_search::RandomSearchStrategy};

/// Builds a strategy from its name with inline parameters, e.g. `random_search[pop_size=20]`.
///
/// `seed` is used by randomized strategies unless the name carries its own `seed` parameter.
pub fn resolve(name: &str, seed: u64) -> Result<Box<dyn PlacementStrategy>> {
    let (name, mut parameters) = read_name(name)?;
    if parameters.get("seed").is_none() {
        parameters.insert("seed", seed.to_string());
    }
    match name {
        "best_fit" => Ok(Box::new(FitStrategy::best_fit())),
        "worst_fit" => Ok(Box::new(FitStrategy::worst_fit())),
        "latency_cost_aware" | "proposed" => Ok(Box::new(LatencyCostAwareStrategy::new())),
        "random_search" => Ok(Box::new(RandomSearchStrategy::from_parameters(&parameters)?)),
        other => Err(Error::UnknownStrategy(other.to_string())),
    }
}
