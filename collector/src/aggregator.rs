use crate::analyze::{aggregate_window, AggregateError, WindowAggregate};
use crate::config::CollectorConfig;
use crate::model::RunDescriptor;
use crate::store::SearchStore;
use crate::window::collect_window;

/// The telemetry aggregator takes care of collecting a run's host telemetry and reducing it to a
/// [`WindowAggregate`].
///
/// It is a helper around the telemetry query and the analyze module, reporting problems in the
/// logs instead of failing the run.
pub struct TelemetryAggregator<'a, S: ?Sized> {
    store: &'a S,
    config: &'a CollectorConfig,
}

impl<'a, S: ?Sized> TelemetryAggregator<'a, S> {
    pub fn new(store: &'a S, config: &'a CollectorConfig) -> Self {
        Self { store, config }
    }
}

impl<S> TelemetryAggregator<'_, S>
where
    S: SearchStore + ?Sized,
{
    /// Try to aggregate the run's telemetry.
    ///
    /// Returns [`None`] when no aggregate could be produced, with the reason in the logs.
    pub async fn try_aggregate(&self, run: &RunDescriptor) -> Option<WindowAggregate> {
        match self.aggregate(run).await {
            Ok(aggregate) => {
                log::info!("{} coverage samples", aggregate.coverage_samples);
                for anomaly in &aggregate.anomalies {
                    log::warn!(
                        "Negative {} delta of {} on host {} for run {} (start {}, last {})",
                        anomaly.counter,
                        anomaly.delta(),
                        anomaly.host,
                        run.name,
                        anomaly.start,
                        anomaly.last
                    );
                }
                Some(aggregate)
            }
            Err(e) => {
                log::warn!("No telemetry aggregate for run {}: {e}", run.name);
                None
            }
        }
    }

    /// Collect the run window's telemetry and aggregate it.
    ///
    /// A store failure part way through is logged and whatever was collected up to then is used.
    pub async fn aggregate(&self, run: &RunDescriptor) -> Result<WindowAggregate, AggregateError> {
        let window = run.window();
        log::debug!(
            "Collecting telemetry for run {} in [{}, {}]",
            run.name,
            window.start,
            window.end
        );

        let collection = collect_window(
            self.store,
            &self.config.telemetry_index,
            window,
            self.config.page_size,
        )
        .await;
        if let Some(e) = &collection.error {
            log::warn!(
                "Telemetry query for run {} stopped after {} pages: {e}",
                run.name,
                collection.pages
            );
        }

        aggregate_window(&collection.window)
    }
}
