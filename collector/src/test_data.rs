use crate::model::TimeRange;
use anyhow::Context;
use bench_results_model::ResultAccumulator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha3::Digest;

/// The inputs of one collection pass: the range that was requested and the accumulator it
/// started from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub range: TimeRange,
    pub initial: ResultAccumulator,
}

#[cfg(feature = "test_data")]
pub fn insert_scenario(range: TimeRange, initial: &ResultAccumulator) -> anyhow::Result<()> {
    let out_file = match open_output_path("1_scenarios", &file_name_from_range(range), false)? {
        Some(f) => f,
        None => {
            log::info!("Not creating scenario file as it already exists");
            return Ok(());
        }
    };

    log::debug!("Writing scenario to {:?}", out_file);

    let scenario = Scenario {
        range,
        initial: initial.clone(),
    };
    serde_json::to_writer_pretty(out_file, &scenario).context("Failed to write scenario")?;

    Ok(())
}

#[cfg(feature = "test_data")]
pub fn insert_query_result(index: &str, query: &Value, body: &Value) -> anyhow::Result<()> {
    let file_name = file_name_from_query(index, query);
    let out_file = match open_output_path("2_query_results", &file_name, false)? {
        Some(f) => f,
        None => {
            log::info!(
                "Not creating query result file as it already exists for query on {index} {query}: {file_name:?}"
            );
            return Ok(());
        }
    };

    log::debug!("Writing query result to {:?}", out_file);

    serde_json::to_writer_pretty(out_file, body).context("Failed to write query result")?;

    Ok(())
}

#[cfg(feature = "query_test_data")]
pub fn load_query_result(index: &str, query: &Value) -> anyhow::Result<Value> {
    let in_file = open_input_path("2_query_results", file_name_from_query(index, query))
        .with_context(|| format!("For query on {index}: {query}"))?;

    serde_json::from_reader(std::io::BufReader::new(in_file))
        .context("Failed to load query result")
}

/// A [SearchStore](crate::store::SearchStore) that answers from recorded query results.
///
/// A query that was never recorded makes the store unavailable.
#[cfg(feature = "query_test_data")]
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordedStore;

#[cfg(feature = "query_test_data")]
impl crate::store::SearchStore for RecordedStore {
    fn search<'a>(
        &'a self,
        index: &'a str,
        query: &'a Value,
    ) -> futures::future::BoxFuture<'a, Result<Value, crate::store::StoreError>> {
        use futures::FutureExt;

        let result = load_query_result(index, query)
            .map_err(|e| crate::store::StoreError::Unavailable(format!("{e:#}")));

        futures::future::ready(result).boxed()
    }
}

#[cfg(any(feature = "test_data", feature = "query_test_data"))]
pub fn insert_expected_results(
    range: TimeRange,
    results: &ResultAccumulator,
    overwrite: bool,
) -> anyhow::Result<()> {
    let file_name = file_name_from_range(range);
    let out_file = match open_output_path("3_expected_results", &file_name, overwrite)? {
        Some(f) => f,
        None => {
            log::info!("Not creating expected results file as it already exists");
            return Ok(());
        }
    };

    log::debug!("Writing expected results to {:?}", out_file);

    serde_json::to_writer_pretty(out_file, results).context("Failed to write expected results")?;

    Ok(())
}

#[cfg(any(feature = "test_data", feature = "query_test_data"))]
fn open_output_path(
    stage: &str,
    file_name: &str,
    overwrite: bool,
) -> anyhow::Result<Option<std::fs::File>> {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join(stage);
    std::fs::create_dir_all(&dir).context("Failed to create test data directory")?;

    match std::fs::OpenOptions::new()
        .create_new(!overwrite)
        .create(overwrite)
        .write(true)
        .truncate(overwrite)
        .open(dir.join(file_name))
    {
        Ok(f) => Ok(Some(f)),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            // No need to error if this has already been created
            Ok(None)
        }
        Err(e) => Err(e).context("Failed to open file for writing"),
    }
}

#[cfg(feature = "query_test_data")]
fn open_input_path(stage: &str, file_name: String) -> anyhow::Result<std::fs::File> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join(stage)
        .join(file_name);

    std::fs::File::open(&path).with_context(|| format!("Failed to open input file: {:?}", path))
}

/// Name of the scenario and expected results files for a requested range.
pub fn file_name_from_range(range: TimeRange) -> String {
    match range.upper {
        Some(upper) => format!("runs-{}-{upper}.json", range.lower),
        None => format!("runs-{}-open.json", range.lower),
    }
}

/// Recorded query results are keyed by the SHA3-256 of `<index>:<compact query body>`.
pub fn file_name_from_query(index: &str, query: &Value) -> String {
    let mut hasher = sha3::Sha3_256::new();
    Digest::update(&mut hasher, format!("{index}:{query}").as_bytes());

    format!("{:x}.json", hasher.finalize())
}
