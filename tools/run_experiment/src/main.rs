use std::{
    collections::BTreeMap,
    io::Write,
    path::{Path, PathBuf},
};

use clap::Parser;
use env_logger::Builder;
use geoplace::{
    experiment::{dataset_name, ExperimentConfig},
    placement_strategies,
    run_result::{read_json, run_strategy, write_csv, write_json, RunResult},
    World,
};

/// Runs placement strategies on geo-distributed application datasets.
#[derive(Parser, Debug)]
struct Args {
    /// Path to a YAML batch config with datasets, strategies and seeds.
    #[arg(short, long, conflicts_with = "dataset")]
    config: Option<PathBuf>,

    /// Path to a single JSON dataset.
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Strategy for a single run, with optional parameters: `name[key=value,...]`.
    #[arg(short, long, default_value = "best_fit")]
    algorithm: String,

    /// Seed for a single run.
    #[arg(short, long, default_value_t = 1)]
    seed: u64,

    /// Path to JSON file with results.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to CSV file with results.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the dataset with the resulting placement here (single run only).
    #[arg(long, requires = "dataset")]
    export: Option<PathBuf>,

    /// Do not run experiments, just read results from --output.
    #[arg(long, requires = "output")]
    precalculated: bool,

    /// Number of threads.
    #[arg(long, default_value_t = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))]
    threads: usize,
}

fn single_run(args: &Args, path: &Path) -> RunResult {
    let mut world = World::from_json_file(path).expect("Can't load dataset");
    let mut strategy = placement_strategies::resolve(&args.algorithm, args.seed).expect("Can't create strategy");
    let result = run_strategy(&dataset_name(path), &args.algorithm, args.seed, strategy.as_mut(), &mut world)
        .expect("Strategy failed");
    if let Some(export) = &args.export {
        world.write_json_file(export).expect("Can't write placement");
    }
    result
}

struct ResultRow {
    name: String,
    runs: usize,
    sla_violation_pct: f64,
    allocation_cost_pct: f64,
    penalty: f64,
    unplaced_services: f64,
    elapsed_ms: f64,
}

fn print_table(results: &[RunResult]) {
    let mut by_strategy: BTreeMap<&str, Vec<&RunResult>> = BTreeMap::new();
    for run in results.iter() {
        by_strategy.entry(run.strategy.as_str()).or_default().push(run);
    }
    fn average(runs: &[&RunResult], f: fn(&RunResult) -> f64) -> f64 {
        runs.iter().map(|&run| f(run)).sum::<f64>() / runs.len() as f64
    }

    let mut rows = by_strategy
        .into_iter()
        .map(|(name, runs)| ResultRow {
            name: name.to_string(),
            runs: runs.len(),
            sla_violation_pct: average(&runs, |run| run.evaluation.sla_violation_pct),
            allocation_cost_pct: average(&runs, |run| run.evaluation.allocation_cost_pct),
            penalty: average(&runs, |run| run.evaluation.penalty as f64),
            unplaced_services: average(&runs, |run| run.unplaced_services as f64),
            elapsed_ms: average(&runs, |run| run.elapsed_ms),
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| {
        a.penalty
            .total_cmp(&b.penalty)
            .then(
                (a.sla_violation_pct + a.allocation_cost_pct)
                    .total_cmp(&(b.sla_violation_pct + b.allocation_cost_pct)),
            )
            .then(a.name.cmp(&b.name))
    });

    let width = rows.iter().map(|row| row.name.len()).max().unwrap_or(0).max("algorithm".len());
    println!(
        "| {: <width$} | runs |   SLAV |   cost | overloaded | unplaced |   time, ms |",
        "algorithm",
        width = width
    );
    println!(
        "|-{:-<width$}-|------|--------|--------|------------|----------|------------|",
        "",
        width = width
    );
    for row in rows.into_iter() {
        println!(
            "| {: <width$} | {: >4} | {: >5.2}% | {: >5.2}% | {: >10.2} | {: >8.2} | {: >10.3} |",
            row.name,
            row.runs,
            row.sla_violation_pct,
            row.allocation_cost_pct,
            row.penalty,
            row.unplaced_services,
            row.elapsed_ms,
            width = width
        );
    }
}

fn main() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();

    let results: Vec<RunResult> = if args.precalculated {
        read_json(args.output.as_ref().expect("--output is required")).expect("Can't read file with result")
    } else {
        let results = match (&args.config, &args.dataset) {
            (Some(config), _) => ExperimentConfig::from_yaml(config)
                .expect("Can't read config file")
                .into_experiment(placement_strategies::resolve)
                .run(args.threads)
                .expect("Experiment failed"),
            (None, Some(dataset)) => vec![single_run(&args, dataset)],
            (None, None) => panic!("Either --config or --dataset must be given"),
        };
        if let Some(output) = &args.output {
            write_json(&results, output).expect("Can't write output file");
        }
        results
    };

    if let Some(csv) = &args.csv {
        write_csv(&results, csv).expect("Can't write csv file");
    }
    print_table(&results);
}
