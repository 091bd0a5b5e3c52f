//! Outcome of running one strategy on one dataset.

use std::{path::Path, time::Instant};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    metrics::{Evaluation, Metrics},
    placement_strategy::PlacementStrategy,
    world::World,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Dataset name.
    pub dataset: String,
    /// Strategy name as requested, including inline parameters.
    pub strategy: String,
    pub seed: u64,
    pub metrics: Metrics,
    pub evaluation: Evaluation,
    /// Services hosted on some data center after the strategy finished.
    pub placed_services: usize,
    /// Services the strategy could not fit anywhere.
    pub unplaced_services: usize,
    /// Wall time spent inside the strategy.
    pub elapsed_ms: f64,
}

/// One CSV row: a [RunResult] with its nested structs flattened.
#[derive(Serialize, Deserialize)]
struct CsvRow {
    dataset: String,
    strategy: String,
    seed: u64,
    sla_violations: usize,
    overall_allocation_cost: u128,
    overloaded_data_centers: usize,
    sla_violation_pct: f64,
    allocation_cost_pct: f64,
    penalty: usize,
    placed_services: usize,
    unplaced_services: usize,
    elapsed_ms: f64,
}

impl From<&RunResult> for CsvRow {
    fn from(result: &RunResult) -> Self {
        Self {
            dataset: result.dataset.clone(),
            strategy: result.strategy.clone(),
            seed: result.seed,
            sla_violations: result.metrics.sla_violations,
            overall_allocation_cost: result.metrics.overall_allocation_cost,
            overloaded_data_centers: result.metrics.overloaded_data_centers,
            sla_violation_pct: result.evaluation.sla_violation_pct,
            allocation_cost_pct: result.evaluation.allocation_cost_pct,
            penalty: result.evaluation.penalty,
            placed_services: result.placed_services,
            unplaced_services: result.unplaced_services,
            elapsed_ms: result.elapsed_ms,
        }
    }
}

/// Runs `strategy` on a freshly reset `world` and scores the placement it leaves behind.
pub fn run_strategy(
    dataset: &str,
    strategy_name: &str,
    seed: u64,
    strategy: &mut dyn PlacementStrategy,
    world: &mut World,
) -> Result<RunResult> {
    world.reset_scenario();
    info!("{}: running {} (seed {})", dataset, strategy.name(), seed);

    let start_time = Instant::now();
    strategy.place(world)?;
    let elapsed = start_time.elapsed();

    let metrics = world.compute_metrics()?;
    let evaluation = world.evaluation_of(&metrics);
    let placed_services = world.placed_service_count();
    info!(
        "{}: {} finished in {:.2?}: {} SLA violations, allocation cost {}, {} overloaded data centers",
        dataset,
        strategy.name(),
        elapsed,
        metrics.sla_violations,
        metrics.overall_allocation_cost,
        metrics.overloaded_data_centers
    );

    Ok(RunResult {
        dataset: dataset.to_string(),
        strategy: strategy_name.to_string(),
        seed,
        metrics,
        evaluation,
        placed_services,
        unplaced_services: world.services().count() - placed_services,
        elapsed_ms: elapsed.as_secs_f64() * 1000.,
    })
}

pub fn write_json(results: &[RunResult], path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(results)?)?;
    Ok(())
}

pub fn read_json(path: impl AsRef<Path>) -> Result<Vec<RunResult>> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

pub fn write_csv(results: &[RunResult], path: impl AsRef<Path>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for result in results.iter() {
        writer.serialize(CsvRow::from(result))?;
    }
    writer.flush()?;
    Ok(())
}
