use crate::aggregator::TelemetryAggregator;
use crate::config::CollectorConfig;
use crate::filter::usable_metrics;
use crate::model::{RunDescriptor, TimeRange};
use crate::query::discover_runs;
use crate::store::SearchStore;
use bench_results_model::{Direction, ResultAccumulator};

pub mod aggregator;
pub mod analyze;
pub mod config;
pub mod extract;
pub mod filter;
pub mod model;
pub mod query;
pub mod store;
pub mod window;

#[cfg(any(feature = "test_data", feature = "query_test_data"))]
pub mod test_data;

/// Record every qualifying run completed in `range` into the accumulator.
///
/// Runs are processed one at a time in completion order. If discovery fails the error is logged
/// and the accumulator is returned unchanged.
pub async fn collect_results<S>(
    store: &S,
    config: &CollectorConfig,
    range: TimeRange,
    mut accumulator: ResultAccumulator,
) -> ResultAccumulator
where
    S: SearchStore + ?Sized,
{
    let runs = match discover_runs(store, config, range).await {
        Ok(runs) => runs,
        Err(e) => {
            log::error!("Failed to discover runs: {e}");
            return accumulator;
        }
    };
    log::info!("Found {} runs to record", runs.len());

    let aggregator = TelemetryAggregator::new(store, config);
    for run in &runs {
        accumulator = record_io_metrics(accumulator, run);

        if let Some(aggregate) = aggregator.try_aggregate(run).await {
            accumulator.append_telemetry(&run.name, &aggregate.usage, &aggregate.network);
        }
    }

    accumulator
}

/// Append the usable per-pod I/O metrics of `run` to its workload entry.
///
/// The entry is created even when no pod produced usable metrics.
pub fn record_io_metrics(
    mut accumulator: ResultAccumulator,
    run: &RunDescriptor,
) -> ResultAccumulator {
    accumulator.ensure(&run.name);
    log::info!("{}", run.name);

    for pod in &run.pod_results {
        log::info!("{} {}", pod.pod_name, pod.node_name);

        for direction in [Direction::Write, Direction::Read] {
            if let Some(metrics) = usable_metrics(&pod.metrics, direction) {
                accumulator.append_run(&run.name, direction, metrics);
            }
        }
    }

    accumulator
}
