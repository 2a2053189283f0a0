use anyhow::Context;
use bench_collector::config::CollectorConfig;
use bench_collector::test_data::{file_name_from_range, RecordedStore, Scenario};
use bench_collector::{collect_results, model::TimeRange};
use bench_results_model::ResultAccumulator;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

macro_rules! run_snapshot_test {
    ($lower:literal, $upper:expr) => {
        env_logger::try_init().ok();

        let range = TimeRange {
            lower: $lower,
            upper: $upper,
        };
        let name = file_name_from_range(range);

        let scenario = find_test_data_file(&name, "1_scenarios")
            .with_context(|| format!("Scenario not found: {name}"))?;
        let scenario: Scenario = load_json(scenario.path().into())?;
        assert_eq!(
            range, scenario.range,
            "Scenario file does not match its name"
        );

        let expected = find_test_data_file(&name, "3_expected_results")
            .context("Expected results not found")?;
        let expected: ResultAccumulator = load_json(expected.path().into())?;

        let output = collect_results(
            &RecordedStore,
            &CollectorConfig::default(),
            scenario.range,
            scenario.initial,
        )
        .await;

        if option_env!("UPDATE_SNAPSHOTS") == Some("1") {
            bench_collector::test_data::insert_expected_results(range, &output, true)?;
        } else {
            pretty_assertions::assert_eq!(expected, output, "Snapshot mismatch, run with `UPDATE_SNAPSHOTS=1 cargo test --test snapshot` to update");
        }
    };
}

#[tokio::test]
async fn bounded_range_with_failed_telemetry_query() -> anyhow::Result<()> {
    run_snapshot_test!(1600000000, Some(1600100000));
    Ok(())
}

#[test]
fn every_scenario_has_expected_results() {
    let stage_dir = |stage: &str| {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join(stage)
    };

    for entry in WalkDir::new(stage_dir("1_scenarios")) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let scenario: Scenario = load_json(entry.path().into()).unwrap();
            assert_eq!(
                entry.file_name().to_str(),
                Some(file_name_from_range(scenario.range).as_str()),
                "Scenario file name does not match its range"
            );
            assert!(
                stage_dir("3_expected_results")
                    .join(entry.file_name())
                    .is_file(),
                "No expected results for {:?}",
                entry.file_name()
            );
        }
    }
}

fn find_test_data_file(name: &str, stage: &str) -> Option<DirEntry> {
    WalkDir::new(
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join(stage),
    )
    .into_iter()
    .filter_map(|entry| entry.ok())
    .find(|entry| entry.file_name().to_str() == Some(name))
}

fn load_json<T: serde::de::DeserializeOwned>(path: PathBuf) -> anyhow::Result<T> {
    let file = std::fs::File::open(&path)?;
    let reader = std::io::BufReader::new(file);
    serde_json::from_reader(reader).with_context(|| format!("Failed to load {path:?}"))
}
