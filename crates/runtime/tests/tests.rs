use std::collections::BTreeMap;

use geoplace::{
    entity::EntityKind,
    experiment::{dataset_name, Dataset, Experiment, ExperimentConfig},
    metrics::{min_max_norm, Bounds},
    placement_strategies::{
        self,
        fit::FitStrategy,
        latency_cost_aware::LatencyCostAwareStrategy,
        random_search::RandomSearchStrategy,
    },
    placement_strategy::{read_name, PlacementStrategy},
    run_result::{read_json, run_strategy, write_csv, write_json},
    search::PlacementProblem,
    Error, World,
};
use rand::SeedableRng;
use rand_pcg::Pcg64;

const SMALL: &str = include_str!("data/small.json");

fn small_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/small.json")
}

fn costs(entries: &[(&str, u64)]) -> BTreeMap<String, u64> {
    entries.iter().map(|&(label, cost)| (label.to_string(), cost)).collect()
}

/// Two regions joined by one link, one data center and one single-service application.
fn two_regions(link_delay: u64, data_center_region: usize) -> World {
    let mut world = World::new();
    let a = world.add_region("a", None).unwrap();
    let b = world.add_region("b", None).unwrap();
    world.add_link(a, b, link_delay).unwrap();
    let provider = world.add_provider();
    let region = if data_center_region == 1 { a } else { b };
    world.add_data_center(region, provider, 10, costs(&[("X", 1)])).unwrap();
    let user = world.add_user(a, 100).unwrap();
    let application = world.add_application(user).unwrap();
    world.add_service(application, "X", 5).unwrap();
    world
}

fn loaded() -> World {
    let mut world = World::from_json_str(SMALL).unwrap();
    world.reset_scenario();
    world
}

fn assert_reset(world: &World) {
    for service in world.services().iter() {
        assert_eq!(service.data_center(), None);
    }
    for data_center in world.data_centers().iter() {
        assert_eq!(data_center.demand(), 0);
        assert!(data_center.services().is_empty());
    }
    for user in world.users().iter() {
        assert_eq!(user.delay(), f64::INFINITY);
        assert!(user.communication_path().is_empty());
    }
}

#[test]
fn best_fit_places_nearby_service() {
    let mut world = two_regions(50, 1);
    FitStrategy::best_fit().place(&mut world).unwrap();

    assert_eq!(world.service(1).unwrap().data_center(), Some(1));
    let metrics = world.compute_metrics().unwrap();
    assert_eq!(metrics.sla_violations, 0);
    assert_eq!(metrics.overall_allocation_cost, 5);
    assert_eq!(metrics.overloaded_data_centers, 0);
}

#[test]
fn best_fit_on_distant_host_violates_sla() {
    let mut world = two_regions(150, 2);
    FitStrategy::best_fit().place(&mut world).unwrap();

    assert_eq!(world.service(1).unwrap().data_center(), Some(1));
    assert_eq!(world.user(1).unwrap().delay(), 150.);
    assert_eq!(world.user(1).unwrap().communication_path(), &[vec![1, 2]]);
    let metrics = world.compute_metrics().unwrap();
    assert_eq!(metrics.sla_violations, 1);
    assert_eq!(metrics.overloaded_data_centers, 0);
}

#[test]
fn best_fit_leaves_service_unplaced_when_nothing_fits() {
    let mut world = World::new();
    let region = world.add_region("only", None).unwrap();
    let provider = world.add_provider();
    world.add_data_center(region, provider, 5, costs(&[("X", 1)])).unwrap();
    for _ in 0..2 {
        let user = world.add_user(region, 10).unwrap();
        let application = world.add_application(user).unwrap();
        world.add_service(application, "X", 5).unwrap();
    }

    FitStrategy::best_fit().place(&mut world).unwrap();

    assert_eq!(world.service(1).unwrap().data_center(), Some(1));
    assert_eq!(world.service(2).unwrap().data_center(), None);
    assert_eq!(world.user(1).unwrap().delay(), 0.);
    assert_eq!(world.user(2).unwrap().delay(), f64::INFINITY);
    let metrics = world.compute_metrics().unwrap();
    assert_eq!(metrics.overloaded_data_centers, 0);
    assert_eq!(metrics.sla_violations, 1);
}

#[test]
fn best_fit_never_exceeds_capacity() {
    let mut world = loaded();
    FitStrategy::best_fit().place(&mut world).unwrap();

    assert_eq!(world.current_placement(), vec![Some(1), Some(1), Some(2)]);
    for data_center in world.data_centers().iter() {
        assert!(data_center.demand() <= data_center.capacity);
    }
    world.check_invariants().unwrap();

    let metrics = world.compute_metrics().unwrap();
    assert_eq!(metrics.sla_violations, 0);
    assert_eq!(metrics.overall_allocation_cost, 26);
    let evaluation = world.evaluation_of(&metrics);
    assert_eq!(evaluation.sla_violation_pct, 0.);
    assert!((evaluation.allocation_cost_pct - 52.).abs() < 1e-9);
    assert_eq!(evaluation.penalty, 0);
}

#[test]
fn worst_fit_prefers_most_free_capacity() {
    let mut world = loaded();
    FitStrategy::worst_fit().place(&mut world).unwrap();

    assert_eq!(world.current_placement(), vec![Some(2), Some(2), Some(2)]);
    assert_eq!(world.data_center(2).unwrap().demand(), 14);
    assert_eq!(world.user(1).unwrap().delay(), 30.);
    let metrics = world.compute_metrics().unwrap();
    assert_eq!(metrics.sla_violations, 0);
    assert_eq!(metrics.overall_allocation_cost, 14);
}

#[test]
fn latency_cost_aware_places_scarce_applications_first() {
    let mut world = World::new();
    let near = world.add_region("near", None).unwrap();
    let far = world.add_region("far", None).unwrap();
    world.add_link(near, far, 100).unwrap();
    let provider = world.add_provider();
    world.add_data_center(near, provider, 10, costs(&[("x", 1)])).unwrap();
    for region in [near, far] {
        let user = world.add_user(region, 10).unwrap();
        let application = world.add_application(user).unwrap();
        world.add_service(application, "x", 6).unwrap();
    }

    let scores = LatencyCostAwareStrategy::application_scores(&world).unwrap();
    assert_eq!(scores.iter().map(|score| score.application).collect::<Vec<_>>(), vec![2, 1]);
    assert_eq!(scores[0].delay_score, 2.);
    assert_eq!(scores[1].delay_score, 0.1);
    assert_eq!(scores[0].norm_allocation_cost_score, 1.);

    LatencyCostAwareStrategy::new().place(&mut world).unwrap();
    assert_eq!(world.service(2).unwrap().data_center(), Some(1));
    assert_eq!(world.service(1).unwrap().data_center(), None);
    assert_eq!(world.compute_metrics().unwrap().sla_violations, 2);
}

#[test]
fn latency_cost_aware_prefers_cheap_hosts_within_sla() {
    let mut world = loaded();
    let candidates = LatencyCostAwareStrategy::candidate_scores(&world, 1).unwrap();
    assert_eq!(candidates[0].data_center, 2);
    assert!(candidates.iter().all(|candidate| candidate.respects_delay_sla));

    LatencyCostAwareStrategy::new().place(&mut world).unwrap();
    assert_eq!(world.current_placement(), vec![Some(2), Some(2), Some(2)]);
    let metrics = world.compute_metrics().unwrap();
    assert_eq!(metrics.sla_violations, 0);
    assert_eq!(metrics.overloaded_data_centers, 0);
}

#[test]
fn chain_stops_at_first_unplaced_service() {
    let mut world = World::new();
    let a = world.add_region("a", None).unwrap();
    let b = world.add_region("b", None).unwrap();
    world.add_link(a, b, 7).unwrap();
    let provider = world.add_provider();
    let dc_a = world.add_data_center(a, provider, 100, costs(&[("s", 1)])).unwrap();
    let dc_b = world.add_data_center(b, provider, 100, costs(&[("s", 1)])).unwrap();
    let user = world.add_user(a, 1000).unwrap();
    let application = world.add_application(user).unwrap();
    let first = world.add_service(application, "s", 1).unwrap();
    let second = world.add_service(application, "s", 1).unwrap();
    let third = world.add_service(application, "s", 1).unwrap();

    world.provision_service(user, first, dc_b).unwrap();
    world.provision_service(user, third, dc_a).unwrap();
    assert_eq!(world.user(user).unwrap().communication_path(), &[vec![a, b]]);
    assert_eq!(world.user(user).unwrap().delay(), f64::INFINITY);

    world.provision_service(user, second, dc_b).unwrap();
    assert_eq!(
        world.user(user).unwrap().communication_path(),
        &[vec![a, b], vec![], vec![b, a]]
    );
    assert_eq!(world.user(user).unwrap().delay(), 14.);

    world.unprovision_service(second).unwrap();
    assert_eq!(world.user(user).unwrap().communication_path().len(), 1);
    assert_eq!(world.data_center(dc_b).unwrap().demand(), 1);
}

#[test]
fn unreachable_host_counts_as_violation() {
    let mut world = World::new();
    let home = world.add_region("home", None).unwrap();
    let island = world.add_region("island", None).unwrap();
    let provider = world.add_provider();
    let data_center = world.add_data_center(island, provider, 10, costs(&[("s", 1)])).unwrap();
    let user = world.add_user(home, 1000).unwrap();
    let application = world.add_application(user).unwrap();
    let service = world.add_service(application, "s", 1).unwrap();

    world.provision_service(user, service, data_center).unwrap();
    assert!(world.user(user).unwrap().communication_path().is_empty());
    assert_eq!(world.user(user).unwrap().delay(), f64::INFINITY);
    assert_eq!(world.compute_metrics().unwrap().sla_violations, 1);
}

#[test]
fn provisioning_keeps_demand_consistent() {
    let mut world = loaded();
    world.provision_service(1, 1, 1).unwrap();
    world.provision_service(1, 2, 1).unwrap();
    world.provision_service(1, 1, 2).unwrap();
    world.provision_service(2, 3, 1).unwrap();
    world.check_invariants().unwrap();
    assert_eq!(world.data_center(1).unwrap().demand(), 10);
    assert_eq!(world.data_center(1).unwrap().services(), &[2, 3]);
    assert_eq!(world.data_center(2).unwrap().demand(), 4);

    world.provision_service(2, 3, 1).unwrap();
    assert_eq!(world.data_center(1).unwrap().demand(), 10);

    assert!(matches!(
        world.provision_service(2, 1, 1),
        Err(Error::InvalidRelationship { kind: EntityKind::Service, id: 1, .. })
    ));
}

#[test]
fn overload_is_scored_not_rejected() {
    let mut world = loaded();
    world.apply_placement(&[1, 1, 1]).unwrap();
    assert_eq!(world.data_center(1).unwrap().demand(), 14);
    let evaluation = world.evaluate_placement().unwrap();
    assert_eq!(evaluation.penalty, 1);
}

#[test]
fn reset_is_idempotent() {
    let mut world = loaded();
    FitStrategy::worst_fit().place(&mut world).unwrap();
    world.reset_scenario();
    assert_reset(&world);
    world.reset_scenario();
    assert_reset(&world);
    world.check_invariants().unwrap();
}

#[test]
fn apply_placement_checks_length() {
    let mut world = loaded();
    assert!(matches!(world.apply_placement(&[1, 2]), Err(Error::InvalidPlacement(_))));
    assert!(matches!(
        world.apply_placement(&[1, 2, 7]),
        Err(Error::EntityNotFound {
            kind: EntityKind::DataCenter,
            id: 7
        })
    ));
}

#[test]
fn registry_lookup() {
    let world = loaded();
    assert_eq!(world.data_centers().count(), 2);
    assert_eq!(world.data_center(2).unwrap().alias, "dc-south");
    assert_eq!(world.data_centers().ids().collect::<Vec<_>>(), vec![1, 2]);
    assert!(matches!(
        world.user(3),
        Err(Error::EntityNotFound { kind: EntityKind::User, id: 3 })
    ));
    assert!(matches!(
        world.service(0),
        Err(Error::EntityNotFound {
            kind: EntityKind::Service,
            id: 0
        })
    ));
}

#[test]
fn normalization_bounds() {
    assert_eq!(min_max_norm(3., 3., 3.), 1.);
    assert_eq!(min_max_norm(-2., -2., -2.), 1.);
    assert_eq!(min_max_norm(1., 1., 5.), 0.);
    assert_eq!(min_max_norm(5., 1., 5.), 1.);
    assert_eq!(min_max_norm(2., 1., 5.), 0.25);
    for x in [0., 0.5, 3.3, 9.9, 10.] {
        let norm = min_max_norm(x, 0., 10.);
        assert!((0. ..=1.).contains(&norm));
    }

    let bounds = Bounds::of([4., -1., 2.]).unwrap();
    assert_eq!((bounds.min, bounds.max), (-1., 4.));
    assert_eq!(bounds.normalize(4.), 1.);
    assert!(Bounds::of(Vec::new()).is_none());
}

#[test]
fn evaluation_of_empty_world() {
    let mut world = World::new();
    let evaluation = world.evaluate_placement().unwrap();
    assert_eq!(evaluation.objectives(), [0., 0.]);
    assert_eq!(evaluation.penalty, 0);
}

#[test]
fn problem_evaluates_and_resets() {
    let mut world = loaded();
    let mut problem = PlacementProblem::new(&mut world);
    assert_eq!(problem.variables(), 3);
    assert_eq!(problem.bounds(), 1..=2);
    assert_eq!(problem.objective_count(), 2);
    assert_eq!(problem.constraint_count(), 1);

    let evaluation = problem.evaluate(&[1, 1, 2]).unwrap();
    assert_eq!(evaluation.sla_violation_pct, 0.);
    assert!((evaluation.allocation_cost_pct - 52.).abs() < 1e-9);
    assert_eq!(evaluation.penalty, 0);
    assert_reset(problem.world());

    assert!(problem.evaluate(&[1]).is_err());
    assert_reset(problem.world());
}

#[test]
fn sampler_produces_feasible_placements() {
    let mut world = loaded();
    let mut problem = PlacementProblem::new(&mut world);
    let mut rng = Pcg64::seed_from_u64(7);

    for _ in 0..20 {
        let placement = problem.sample(&mut rng).unwrap();
        assert_eq!(placement.len(), 3);
        assert!(placement.iter().all(|id| problem.bounds().contains(id)));
        assert_reset(problem.world());
        assert_eq!(problem.evaluate(&placement).unwrap().penalty, 0);
    }

    let population = problem.sample_population(3, &mut rng).unwrap();
    assert!(!population.is_empty() && population.len() <= 3);
    for (i, a) in population.iter().enumerate() {
        for b in population[i + 1..].iter() {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn sampler_falls_back_to_roomiest_data_center() {
    let mut world = World::new();
    let region = world.add_region("r", None).unwrap();
    let provider = world.add_provider();
    world.add_data_center(region, provider, 2, costs(&[("s", 1)])).unwrap();
    world.add_data_center(region, provider, 3, costs(&[("s", 1)])).unwrap();
    let user = world.add_user(region, 10).unwrap();
    let application = world.add_application(user).unwrap();
    world.add_service(application, "s", 50).unwrap();

    let mut problem = PlacementProblem::new(&mut world);
    let placement = problem.sample(&mut Pcg64::seed_from_u64(1)).unwrap();
    assert_eq!(placement, vec![2]);
}

#[test]
fn random_search_is_reproducible() {
    let mut first = loaded();
    RandomSearchStrategy::new(10, 42).place(&mut first).unwrap();
    let mut second = loaded();
    RandomSearchStrategy::new(10, 42).place(&mut second).unwrap();

    assert_eq!(first.current_placement(), second.current_placement());
    assert_eq!(first.placed_service_count(), 3);
    assert_eq!(first.evaluate_placement().unwrap().penalty, 0);
    first.check_invariants().unwrap();
}

#[test]
fn strategy_names_with_parameters() {
    let (name, parameters) = read_name("random_search[pop_size=20,seed=3]").unwrap();
    assert_eq!(name, "random_search");
    assert_eq!(parameters.get("pop_size"), Some("20"));
    assert_eq!(parameters.get_or("seed", 0u64).unwrap(), 3);
    assert_eq!(parameters.get_or("missing", 5usize).unwrap(), 5);

    let (name, parameters) = read_name("best_fit").unwrap();
    assert_eq!(name, "best_fit");
    assert!(parameters.is_empty());

    assert!(read_name("random_search[pop_size=2").is_err());
    assert!(matches!(
        placement_strategies::resolve("random_search[pop_size=many]", 1),
        Err(Error::InvalidParameter { .. })
    ));
    assert!(matches!(
        placement_strategies::resolve("first_fit", 1),
        Err(Error::UnknownStrategy(name)) if name == "first_fit"
    ));
    assert_eq!(placement_strategies::resolve("proposed", 1).unwrap().name(), "latency_cost_aware");
    assert_eq!(placement_strategies::resolve("worst_fit", 1).unwrap().name(), "worst_fit");
}

#[test]
fn dataset_is_loaded_with_hosted_services() {
    let world = World::from_json_str(SMALL).unwrap();
    let summary = world.summary();
    assert_eq!(summary.counts[&EntityKind::Region], 3);
    assert_eq!(summary.counts[&EntityKind::NetworkLink], 2);
    assert_eq!(summary.counts[&EntityKind::Service], 3);
    assert_eq!(summary.data_centers_per_provider[&1], 2);
    assert_eq!(summary.data_centers_per_region[&2], 0);

    assert_eq!(world.region(1).unwrap().coordinates, Some((0., 0.)));
    assert_eq!(world.application(1).unwrap().services, vec![1, 2]);
    assert_eq!(world.service(3).unwrap().data_center(), Some(2));
    assert_eq!(world.data_center(2).unwrap().demand(), 6);
    assert_eq!(world.user(2).unwrap().delay(), 0.);
    assert_eq!(world.user(1).unwrap().delay(), f64::INFINITY);
    assert_eq!(world.topology().delay_between(1, 3).unwrap(), 30);
    world.check_invariants().unwrap();
}

#[test]
fn dataset_round_trip() {
    let mut world = World::from_json_str(SMALL).unwrap();
    FitStrategy::best_fit().place(&mut world).unwrap();

    let reloaded = World::from_json_str(&world.to_json_string().unwrap()).unwrap();
    assert_eq!(reloaded.summary(), world.summary());
    assert_eq!(reloaded.current_placement(), world.current_placement());
    for (a, b) in reloaded.users().iter().zip(world.users().iter()) {
        assert_eq!(a.delay(), b.delay());
        assert_eq!(a.communication_path(), b.communication_path());
    }
    for (a, b) in reloaded.data_centers().iter().zip(world.data_centers().iter()) {
        assert_eq!(a.demand(), b.demand());
        assert_eq!(a.allocation_cost, b.allocation_cost);
    }
}

#[test]
fn dataset_errors() {
    let unknown_class = r#"{"Region": [], "Satellite": []}"#;
    assert!(matches!(
        World::from_json_str(unknown_class),
        Err(Error::UnknownComponentClass(class)) if class == "Satellite"
    ));

    let dangling = SMALL.replacen(
        r#""region": {"class": "Region", "id": 3}"#,
        r#""region": {"class": "Region", "id": 9}"#,
        1,
    );
    assert!(matches!(
        World::from_json_str(&dangling),
        Err(Error::InvalidRelationship {
            kind: EntityKind::DataCenter,
            id: 2,
            ..
        })
    ));

    let wrong_class = SMALL.replacen(
        r#""provider": {"class": "Provider", "id": 1}"#,
        r#""provider": {"class": "Region", "id": 1}"#,
        1,
    );
    assert!(matches!(
        World::from_json_str(&wrong_class),
        Err(Error::InvalidRelationship { .. })
    ));

    let missing_cost = SMALL.replacen(
        r#""allocation_cost": {"web": 2, "db": 3}"#,
        r#""allocation_cost": {"web": 2}"#,
        1,
    );
    assert!(matches!(
        World::from_json_str(&missing_cost),
        Err(Error::MissingAllocationCost { data_center: 1, label }) if label == "db"
    ));

    let shifted_id = SMALL.replacen(r#"{"id": 2, "label": "middle""#, r#"{"id": 5, "label": "middle""#, 1);
    assert!(matches!(
        World::from_json_str(&shifted_id),
        Err(Error::InvalidAttribute {
            kind: EntityKind::Region,
            ..
        })
    ));

    let inconsistent_host = SMALL.replacen(r#""services": [{"class": "Service", "id": 3}]"#, r#""services": []"#, 1);
    assert!(matches!(
        World::from_json_str(&inconsistent_host),
        Err(Error::InvalidRelationship {
            kind: EntityKind::DataCenter,
            id: 2,
            ..
        })
    ));
}

#[test]
fn run_result_files() {
    let mut world = loaded();
    let mut strategy = placement_strategies::resolve("best_fit", 1).unwrap();
    let result = run_strategy("small", "best_fit", 1, strategy.as_mut(), &mut world).unwrap();
    assert_eq!(result.placed_services, 3);
    assert_eq!(result.unplaced_services, 0);
    assert_eq!(result.metrics.overall_allocation_cost, 26);

    let dir = std::env::temp_dir().join(format!("geoplace-run-result-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    write_json(&[result.clone()], dir.join("results.json")).unwrap();
    let read = read_json(dir.join("results.json")).unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].dataset, "small");
    assert_eq!(read[0].metrics, result.metrics);

    write_csv(&[result.clone(), result], dir.join("results.csv")).unwrap();
    let csv = std::fs::read_to_string(dir.join("results.csv")).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.lines().next().unwrap().starts_with("dataset,strategy,seed,sla_violations"));
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn experiment_runs_every_combination() {
    let datasets = vec![Dataset {
        name: "small".to_string(),
        path: small_path(),
    }];
    let strategies = vec!["worst_fit".to_string(), "best_fit".to_string()];
    let experiment = Experiment::new(datasets, strategies, vec![2, 1], placement_strategies::resolve);

    let results = experiment.run(2).unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(
        results
            .iter()
            .map(|run| (run.strategy.as_str(), run.seed))
            .collect::<Vec<_>>(),
        vec![("best_fit", 1), ("best_fit", 2), ("worst_fit", 1), ("worst_fit", 2)]
    );
    assert!(results.iter().all(|run| run.metrics.sla_violations == 0));
}

#[test]
fn experiment_reports_missing_dataset() {
    let datasets = vec![Dataset {
        name: "missing".to_string(),
        path: small_path().with_file_name("does_not_exist.json"),
    }];
    let experiment = Experiment::new(datasets, vec!["best_fit".to_string()], vec![1], placement_strategies::resolve);
    assert!(matches!(experiment.run(1), Err(Error::Experiment(_))));
}

#[test]
fn experiment_config_from_yaml() {
    let dir = std::env::temp_dir().join(format!("geoplace-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("experiment.yaml");
    std::fs::write(
        &path,
        format!(
            "datasets:\n  - {}\n  - {}\nstrategies:\n  - best_fit\n",
            small_path().display(),
            small_path().display()
        ),
    )
    .unwrap();

    let config = ExperimentConfig::from_yaml(&path).unwrap();
    assert_eq!(config.seeds, vec![1]);
    assert_eq!(dataset_name(&config.datasets[0]), "small");

    let results = config.into_experiment(placement_strategies::resolve).run(1).unwrap();
    assert_eq!(
        results.iter().map(|run| run.dataset.as_str()).collect::<Vec<_>>(),
        vec!["0_small", "1_small"]
    );
    assert_eq!(results[0].metrics, results[1].metrics);

    std::fs::write(&path, "strategies: [best_fit]\n").unwrap();
    assert!(matches!(ExperimentConfig::from_yaml(&path), Err(Error::Yaml(_))));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn huge_capacities_and_costs_do_not_overflow() {
    let mut world = World::new();
    let region = world.add_region("a", None).unwrap();
    let provider = world.add_provider();
    let big = 10_000_000_000;
    world.add_data_center(region, provider, big, costs(&[("X", big)])).unwrap();
    let user = world.add_user(region, 1).unwrap();
    let application = world.add_application(user).unwrap();
    world.add_service(application, "X", big).unwrap();

    FitStrategy::best_fit().place(&mut world).unwrap();
    assert_eq!(world.service(1).unwrap().data_center(), Some(1));
    assert_eq!(world.max_allocation_cost(), 100_000_000_000_000_000_000);
    let metrics = world.compute_metrics().unwrap();
    assert_eq!(metrics.overall_allocation_cost, 100_000_000_000_000_000_000);
    let evaluation = world.evaluate_placement().unwrap();
    assert_eq!(evaluation.allocation_cost_pct, 100.);
    assert_eq!(evaluation.penalty, 0);
}

#[test]
fn capacity_checks_near_u64_limits() {
    let mut world = World::new();
    let region = world.add_region("a", None).unwrap();
    let provider = world.add_provider();
    world.add_data_center(region, provider, u64::MAX, costs(&[("X", 1)])).unwrap();
    let user = world.add_user(region, 1).unwrap();
    let application = world.add_application(user).unwrap();
    world.add_service(application, "X", u64::MAX - 1).unwrap();
    world.add_service(application, "X", 2).unwrap();

    assert_eq!(world.data_center(1).unwrap().free_capacity(), u64::MAX as i128);
    world.provision_service(user, 1, 1).unwrap();
    assert_eq!(world.data_center(1).unwrap().free_capacity(), 1);
    assert!(world.data_center(1).unwrap().can_host(1));
    assert!(!world.data_center(1).unwrap().can_host(2));
    assert!(!world.data_center(1).unwrap().can_host(u64::MAX));

    assert!(matches!(
        world.provision_service(user, 2, 1),
        Err(Error::InvalidAttribute {
            kind: EntityKind::DataCenter,
            id: 1,
            ..
        })
    ));
    world.check_invariants().unwrap();

    let mut world = two_regions(10, 1);
    world.provision_service(1, 1, 1).unwrap();
    world.provision_service(1, 1, 1).unwrap();
    assert_eq!(world.data_center(1).unwrap().free_capacity(), 5);
}

#[test]
fn cleared_world_starts_over() {
    let mut world = loaded();
    FitStrategy::worst_fit().place(&mut world).unwrap();
    assert!(world.topology().cached_paths() > 0);

    world.clear();
    for kind in EntityKind::ALL {
        assert_eq!(world.count(kind), 0, "{}", kind);
    }
    assert_eq!(world.topology().region_count(), 0);
    assert!(world.topology().links().is_empty());
    assert_eq!(world.topology().cached_paths(), 0);
    assert!(matches!(
        world.region(1),
        Err(Error::EntityNotFound {
            kind: EntityKind::Region,
            id: 1
        })
    ));

    let a = world.add_region("a", None).unwrap();
    let b = world.add_region("b", None).unwrap();
    assert_eq!((a, b), (1, 2));
    assert_eq!(world.add_link(a, b, 5).unwrap(), 1);
    assert_eq!(world.add_provider(), 1);
    assert_eq!(world.add_data_center(b, 1, 10, costs(&[("X", 1)])).unwrap(), 1);
    let user = world.add_user(a, 5).unwrap();
    assert_eq!(user, 1);
    let application = world.add_application(user).unwrap();
    assert_eq!(world.add_service(application, "X", 1).unwrap(), 1);

    world.apply_placement(&[1]).unwrap();
    assert_eq!(world.user(1).unwrap().delay(), 5.);
}

#[test]
fn scenario_reset_keeps_path_cache() {
    let mut world = loaded();
    LatencyCostAwareStrategy::new().place(&mut world).unwrap();
    world.compute_metrics().unwrap();
    let cached = world.topology().cached_paths();
    assert!(cached > 0);

    world.reset_scenario();
    assert_eq!(world.topology().cached_paths(), cached);
    world.reset_scenario();
    assert_eq!(world.topology().cached_paths(), cached);

    let mut problem = PlacementProblem::new(&mut world);
    problem.evaluate(&[1, 1, 2]).unwrap();
    assert!(problem.world().topology().cached_paths() >= cached);
}

#[test]
fn relationship_shapes() {
    let keyed_hosting = SMALL.replacen(
        r#""services": [{"class": "Service", "id": 3}]"#,
        r#""services": {"front": {"class": "Service", "id": 3}}"#,
        1,
    );
    let world = World::from_json_str(&keyed_hosting).unwrap();
    assert_eq!(world.data_center(2).unwrap().services(), &[3]);

    let single_for_list = SMALL.replacen(
        r#""services": [{"class": "Service", "id": 3}]"#,
        r#""services": {"class": "Service", "id": 3}"#,
        1,
    );
    assert!(matches!(
        World::from_json_str(&single_for_list),
        Err(Error::InvalidRelationship {
            kind: EntityKind::DataCenter,
            id: 2,
            ..
        })
    ));

    let list_for_single = SMALL.replacen(
        r#""provider": {"class": "Provider", "id": 1}"#,
        r#""provider": [{"class": "Provider", "id": 1}]"#,
        1,
    );
    assert!(matches!(
        World::from_json_str(&list_for_single),
        Err(Error::InvalidRelationship { .. })
    ));

    let malformed = SMALL.replacen(r#""provider": {"class": "Provider", "id": 1}"#, r#""provider": 7"#, 1);
    assert!(matches!(
        World::from_json_str(&malformed),
        Err(Error::InvalidRelationship { .. })
    ));
}

#[test]
fn chain_delay_sums_past_u64() {
    let mut world = World::new();
    let a = world.add_region("a", None).unwrap();
    let b = world.add_region("b", None).unwrap();
    world.add_link(a, b, u64::MAX).unwrap();
    let provider = world.add_provider();
    world.add_data_center(a, provider, 10, costs(&[("X", 1)])).unwrap();
    world.add_data_center(b, provider, 10, costs(&[("X", 1)])).unwrap();
    let user = world.add_user(a, u64::MAX).unwrap();
    let application = world.add_application(user).unwrap();
    world.add_service(application, "X", 1).unwrap();
    world.add_service(application, "X", 1).unwrap();

    world.apply_placement(&[2, 1]).unwrap();
    assert_eq!(world.user(user).unwrap().delay(), 2. * u64::MAX as f64);
    assert_eq!(world.compute_metrics().unwrap().sla_violations, 1);
}
