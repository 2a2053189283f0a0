use crate::config::CollectorConfig;
use crate::model::{PodResult, RunDescriptor, RunDocument, TimeRange};
use crate::query::{epoch_second_range, sort_ascending};
use crate::store::{search_hits, SearchStore, StoreError};
use itertools::Itertools;
use serde_json::{json, Value};

/// Search body for runs whose completion time falls in `range`, oldest first.
pub fn run_results_query(range: TimeRange, page_size: usize) -> Value {
    json!({
        "from": 0,
        "query": epoch_second_range("CompletionTime", range.lower, range.upper),
        "size": page_size,
        "sort": sort_ascending("CompletionTime"),
    })
}

/// Query the run results index for runs completed in `range`.
///
/// Only a single page is requested; runs beyond the page size are not returned. Runs come back
/// ordered by completion time regardless of the order the store answered in.
pub async fn discover_runs<S>(
    store: &S,
    config: &CollectorConfig,
    range: TimeRange,
) -> Result<Vec<RunDescriptor>, StoreError>
where
    S: SearchStore + ?Sized,
{
    let query = run_results_query(range, config.page_size);
    let hits = search_hits(store, &config.runs_index, &query).await?;

    if hits.len() >= config.page_size {
        log::warn!(
            "Run discovery returned a full page of {} runs, later runs are not included",
            hits.len()
        );
    }

    let documents = hits
        .into_iter()
        .filter_map(|hit| match serde_json::from_value::<RunDocument>(hit.source) {
            Ok(document) => Some(document),
            Err(e) => {
                log::warn!("Skipping malformed run document: {e}");
                None
            }
        })
        .collect::<Vec<_>>();

    Ok(select_runs(documents, config.min_runtime))
}

/// Order run documents by completion time and keep those that ran for at least `min_runtime`.
pub fn select_runs(documents: Vec<RunDocument>, min_runtime: i64) -> Vec<RunDescriptor> {
    documents
        .into_iter()
        .sorted_by_key(|document| document.completion_time)
        .filter_map(|document| {
            let runtime = document.runtime();
            if runtime < min_runtime {
                log::debug!(
                    "Skipping run {:?} completed at {}, runtime {runtime} is below {min_runtime}",
                    document.name,
                    document.completion_time
                );
                return None;
            }

            let Some(name) = document.workload_name() else {
                log::warn!(
                    "Skipping run {:?} completed at {}, no workload identity",
                    document.name,
                    document.completion_time
                );
                return None;
            };

            Some(RunDescriptor {
                name,
                start_time: document.start_time,
                completion_time: document.completion_time,
                pod_results: document
                    .results
                    .workload_results
                    .into_iter()
                    .map(PodResult::from)
                    .collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::scripted::{hits, ScriptedStore};
    use pretty_assertions::assert_eq;

    fn run(name: &str, start: i64, completion: i64) -> Value {
        json!({
            "Name": name,
            "Spec": {"actions": [{"createObjSpec": {"workload": name, "storageClass": "ssd"}}]},
            "StartTime": start,
            "CompletionTime": completion,
        })
    }

    fn documents(values: Vec<Value>) -> Vec<RunDocument> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }

    #[test]
    fn query_body_with_both_bounds() {
        let query = run_results_query(
            TimeRange {
                lower: 1600000000,
                upper: Some(1600100000),
            },
            10_000,
        );

        assert_eq!(
            r#"{"from":0,"query":{"range":{"CompletionTime":{"format":"epoch_second","gte":1600000000,"lte":1600100000}}},"size":10000,"sort":[{"CompletionTime":{"order":"asc"}}]}"#,
            query.to_string()
        );
    }

    #[test]
    fn query_body_without_upper_bound() {
        let query = run_results_query(
            TimeRange {
                lower: 5,
                upper: None,
            },
            10,
        );

        assert_eq!(
            json!({"format": "epoch_second", "gte": 5}),
            query["query"]["range"]["CompletionTime"]
        );
    }

    #[test]
    fn runtime_boundary() {
        let runs = select_runs(
            documents(vec![
                run("short", 0, 999),
                run("exact", 10_000, 11_000),
                run("long", 20_000, 25_000),
            ]),
            1000,
        );

        let names = runs.iter().map(|r| r.name.as_str()).collect::<Vec<_>>();
        assert_eq!(vec!["exact-ssd", "long-ssd"], names);
    }

    #[test]
    fn runs_are_ordered_by_completion_time() {
        let runs = select_runs(
            documents(vec![
                run("c", 0, 30_000),
                run("a", 0, 10_000),
                run("b", 0, 20_000),
            ]),
            1000,
        );

        let names = runs.iter().map(|r| r.name.as_str()).collect::<Vec<_>>();
        assert_eq!(vec!["a-ssd", "b-ssd", "c-ssd"], names);
        assert_eq!(
            vec![10_000, 20_000, 30_000],
            runs.iter().map(|r| r.completion_time).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn discover_skips_malformed_documents() {
        let store = ScriptedStore::default().respond(
            "fiotest",
            hits(vec![
                run("b", 0, 20_000),
                json!({"Name": "broken"}),
                run("a", 0, 10_000),
            ]),
        );
        let config = CollectorConfig::default();

        let runs = discover_runs(
            &store,
            &config,
            TimeRange {
                lower: 0,
                upper: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(2, runs.len());
        assert_eq!("a-ssd", runs[0].name);
        assert_eq!(1, store.requests("fiotest").len());
    }

    #[tokio::test]
    async fn discover_reports_store_errors() {
        let store = ScriptedStore::default()
            .respond("fiotest", json!({"error": {"reason": "no such index"}}));

        let result = discover_runs(
            &store,
            &CollectorConfig::default(),
            TimeRange {
                lower: 0,
                upper: None,
            },
        )
        .await;

        assert!(matches!(result, Err(StoreError::Query { .. })));
    }
}
