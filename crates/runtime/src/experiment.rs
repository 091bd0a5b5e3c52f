use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use itertools::Itertools;
use log::info;
use serde::Deserialize;
use threadpool::ThreadPool;

use crate::{
    error::{Error, Result},
    placement_strategy::PlacementStrategy,
    run_result::{run_strategy, RunResult},
    world::World,
};

pub type StrategyResolver = fn(&str, u64) -> Result<Box<dyn PlacementStrategy>>;

#[derive(Clone, Debug)]
pub struct Dataset {
    pub name: String,
    pub path: PathBuf,
}

fn default_seeds() -> Vec<u64> {
    vec![1]
}

/// Batch description read from YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    pub datasets: Vec<PathBuf>,
    pub strategies: Vec<String>,
    #[serde(default = "default_seeds")]
    pub seeds: Vec<u64>,
}

impl ExperimentConfig {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        Ok(serde_yaml::from_str(&std::fs::read_to_string(path)?)?)
    }

    /// Names datasets `<index>_<file stem>` so that equal file names stay distinct.
    pub fn into_experiment(self, strategy_resolver: StrategyResolver) -> Experiment {
        let datasets = self
            .datasets
            .into_iter()
            .enumerate()
            .map(|(i, path)| Dataset {
                name: format!("{}_{}", i, dataset_name(&path)),
                path,
            })
            .collect();
        Experiment::new(datasets, self.strategies, self.seeds, strategy_resolver)
    }
}

/// File stem of a dataset path.
pub fn dataset_name(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("dataset")
        .to_string()
}

struct Run {
    dataset: Dataset,
    strategy: String,
    seed: u64,
}

/// Every combination of dataset, strategy and seed, each run on its own freshly loaded world.
pub struct Experiment {
    datasets: Vec<Dataset>,
    strategies: Vec<String>,
    seeds: Vec<u64>,
    strategy_resolver: StrategyResolver,
}

impl Experiment {
    pub fn new(
        datasets: Vec<Dataset>,
        strategies: Vec<String>,
        seeds: Vec<u64>,
        strategy_resolver: StrategyResolver,
    ) -> Self {
        Self {
            datasets,
            strategies,
            seeds,
            strategy_resolver,
        }
    }

    fn execute(run: &Run, strategy_resolver: StrategyResolver) -> Result<RunResult> {
        let mut world = World::from_json_file(&run.dataset.path)?;
        let mut strategy = strategy_resolver(&run.strategy, run.seed)?;
        run_strategy(&run.dataset.name, &run.strategy, run.seed, strategy.as_mut(), &mut world)
    }

    pub fn run(self, threads: usize) -> Result<Vec<RunResult>> {
        let runs = self
            .datasets
            .into_iter()
            .cartesian_product(self.strategies)
            .cartesian_product(self.seeds)
            .map(|((dataset, strategy), seed)| Run { dataset, strategy, seed })
            .collect::<Vec<_>>();

        let total_runs = runs.len();

        let finished_run_atomic = Arc::new(AtomicUsize::new(0));
        let results = Arc::new(Mutex::new(Vec::new()));

        let pool = ThreadPool::new(threads.max(1));
        let start_time = Instant::now();
        for run in runs.into_iter() {
            let finished_run_atomic = finished_run_atomic.clone();
            let results = results.clone();
            let strategy_resolver = self.strategy_resolver;
            pool.execute(move || {
                let result = Self::execute(&run, strategy_resolver).map_err(|e| {
                    Error::Experiment(format!("{} / {} / seed {}: {}", run.dataset.name, run.strategy, run.seed, e))
                });
                if let Ok(mut results) = results.lock() {
                    results.push(result);
                }

                let finished_runs = finished_run_atomic.fetch_add(1, Ordering::SeqCst) + 1;
                let elapsed = start_time.elapsed();
                let remaining = Duration::from_secs_f64(
                    elapsed.as_secs_f64() / finished_runs as f64 * (total_runs - finished_runs) as f64,
                );
                info!(
                    "Finished {}/{} [{}%] runs in {:.2?}, remaining time: {:.2?}",
                    finished_runs,
                    total_runs,
                    (finished_runs as f64 * 100. / total_runs as f64).round() as i32,
                    elapsed,
                    remaining
                );
            });
        }

        pool.join();
        if pool.panic_count() > 0 {
            return Err(Error::Experiment(format!("{} runs panicked", pool.panic_count())));
        }
        info!("Finished {} runs in {:.2?}", total_runs, start_time.elapsed());

        let results = std::mem::take(
            &mut *results
                .lock()
                .map_err(|_| Error::Experiment("result list is poisoned".to_string()))?,
        );
        let mut results = results.into_iter().collect::<Result<Vec<_>>>()?;
        results.sort_by_cached_key(|run| (run.dataset.clone(), run.strategy.clone(), run.seed));
        Ok(results)
    }
}
