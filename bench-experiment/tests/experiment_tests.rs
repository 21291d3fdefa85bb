//! End-to-end runs of the experiment driver from configuration files.

use approx::assert_relative_eq;
use optbench_core::{Firing, MemorySink, Observation, RecordSink, RunKey};
use optbench_experiment::{
    ConfigFormat, CountingSink, Experiment, ExperimentConfig, Report, SolverKind, load_config,
    parse_config, serialize_config,
};
use std::fs;

const SMALL: &str = r#"
[suite]
name = "small"
functions = ["sphere", "ellipsoid", "rastrigin", "rosenbrock", "ackley"]
dimensions = [2, 4]
instances = [1, 2]

[triggers]
interval = 50
time_points = [1, 2, 5]
per_decade = 3

[ecdf.error]
min = 0.0
max = 1e10
buckets = 25
scale = "log10"

[ecdf.evaluations]
min = 1
max = 300
buckets = 12
scale = "log10"

[experiment]
runs = 3
budget = 300
seed = 11
parallel = true
threads = 2
"#;

fn small_config() -> ExperimentConfig {
    parse_config(SMALL, ConfigFormat::Toml).unwrap()
}

#[test]
fn test_config_file_round_trip() {
    let config = small_config();
    let dir = tempfile::tempdir().unwrap();

    let toml_path = dir.path().join("small.toml");
    fs::write(&toml_path, SMALL).unwrap();
    assert_eq!(load_config(&toml_path).unwrap(), config);

    let json_path = dir.path().join("small.json");
    fs::write(&json_path, serialize_config(&config, ConfigFormat::Json).unwrap()).unwrap();
    assert_eq!(load_config(&json_path).unwrap(), config);
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(dir.path().join("absent.toml")).unwrap_err();
    assert!(!err.is_config_error());
}

#[test]
fn test_sequential_and_parallel_agree() {
    let config = small_config();

    let mut sequential = Experiment::from_config(&config).unwrap();
    let mut seq_counts = CountingSink::new();
    let seq_summary = sequential.run(&mut seq_counts).unwrap();

    let parallel = Experiment::from_config(&config).unwrap();
    let (par_summary, sinks) = parallel.run_parallel(CountingSink::new).unwrap();
    let par_counts: CountingSink = sinks.iter().sum();

    assert_eq!(seq_summary.problems, 20);
    assert_eq!(seq_summary.runs, 60);
    assert_eq!(seq_summary.evaluations, 60 * 300);
    assert_eq!(seq_summary, par_summary);
    assert_eq!(seq_counts, par_counts);
    assert_eq!(seq_counts.runs, 60);

    let seq_histogram = sequential.engine().histogram().unwrap();
    assert_eq!(seq_histogram, parallel.engine().histogram().unwrap());
    assert_eq!(sequential.engine().discarded(), 0);
    assert_relative_eq!(
        sequential.engine().volume_under_curve().unwrap(),
        parallel.engine().volume_under_curve().unwrap()
    );
}

#[test]
fn test_records_follow_triggers() {
    let mut config = small_config();
    config.experiment.parallel = false;
    config.experiment.runs = 1;
    let mut experiment = Experiment::from_config(&config).unwrap();

    struct Check(MemorySink);
    impl RecordSink for Check {
        fn start_run(&mut self, key: RunKey) {
            self.0.start_run(key);
        }

        fn record(&mut self, key: RunKey, observation: &Observation, firing: &Firing) {
            assert!(firing.any());
            if firing.interval {
                let e = observation.evaluations;
                assert!(e == 1 || e % 50 == 0);
            }
            self.0.record(key, observation, firing);
        }
    }

    let mut check = Check(MemorySink::new());
    experiment.run(&mut check).unwrap();
    let sink = check.0;
    assert_eq!(sink.runs().len(), 20);

    for key in sink.runs() {
        let evaluations: Vec<u64> = sink
            .records_of(*key)
            .map(|record| record.observation.evaluations)
            .collect();
        // 1, 50, .., 300 from the interval policy at least
        for e in [1, 50, 100, 150, 200, 250, 300] {
            assert!(evaluations.contains(&e), "{key}: missing {e}");
        }
        assert!(evaluations.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn test_local_search_dominates_random_search() {
    let mut config = small_config();
    config.experiment.parallel = false;

    let volume = |solver: SolverKind| {
        let mut config = config.clone();
        config.experiment.solver = solver;
        let mut experiment = Experiment::from_config(&config).unwrap();
        experiment.run(&mut CountingSink::new()).unwrap();
        experiment.engine().volume_under_curve().unwrap()
    };
    assert!(volume(SolverKind::OnePlusOne) > volume(SolverKind::RandomSearch));
}

#[test]
fn test_report_written_to_disk() {
    let mut config = small_config();
    config.suite.dimension_filter = vec![2];
    let mut experiment = Experiment::from_config(&config).unwrap();
    let mut counts = CountingSink::new();
    let summary = experiment.run(&mut counts).unwrap();
    assert_eq!(summary.problems, 10);

    let report = Report::new(&experiment, summary, counts).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    report.save_json(&path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["suite"], "small");
    assert_eq!(json["solver"], "one-plus-one");
    assert_eq!(json["summary"]["runs"], 30);
    assert_eq!(json["histogram"].as_array().unwrap().len(), 25);
    assert_eq!(json["distribution"][0].as_array().unwrap().len(), 12);
}

#[test]
fn test_invalid_overrides_are_rejected() {
    let mut config = small_config();
    config.experiment.budget = 0;
    assert!(Experiment::from_config(&config).unwrap_err().is_config_error());

    let mut config = small_config();
    config.suite.dimension_filter = vec![3];
    assert!(Experiment::from_config(&config).unwrap_err().is_config_error());
}
