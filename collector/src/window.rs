//! Per-host state built up while paging through a run window's telemetry.
//!
//! Node samples are kept as an event log: every update appends a copy of the whole per-host map,
//! so moments where only some hosts had reported yet stay visible to the aggregation.

use crate::model::{HostSample, NetworkSample, NodeSample, RunWindow, SampleKind};
use crate::query::{PageOutcome, TelemetryPages};
use crate::store::{SearchStore, StoreError};
use std::collections::BTreeMap;

/// Latest node sample per host at one update instant.
pub type Coverage = BTreeMap<String, NodeSample>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageLog {
    latest: Coverage,
    history: Vec<Coverage>,
}

impl CoverageLog {
    /// Overwrite the host's latest sample and append a snapshot of all hosts.
    pub fn record(&mut self, host: &str, sample: NodeSample) {
        self.latest.insert(host.to_string(), sample);
        self.history.push(self.latest.clone());
    }

    pub fn history(&self) -> &[Coverage] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// First and latest network counters seen per host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkCounters {
    start: BTreeMap<String, NetworkSample>,
    last: BTreeMap<String, NetworkSample>,
}

impl NetworkCounters {
    /// Overwrite the host's latest counters. The first sample of a host is kept as its start.
    pub fn record(&mut self, host: &str, sample: NetworkSample) {
        self.last.insert(host.to_string(), sample);
        self.start.entry(host.to_string()).or_insert(sample);
    }

    pub fn start(&self) -> &BTreeMap<String, NetworkSample> {
        &self.start
    }

    pub fn last(&self) -> &BTreeMap<String, NetworkSample> {
        &self.last
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryWindow {
    pub coverage: CoverageLog,
    pub network: NetworkCounters,
}

impl TelemetryWindow {
    pub fn apply(&mut self, sample: HostSample) {
        match sample.kind {
            SampleKind::Node(node) => self.coverage.record(&sample.host, node),
            SampleKind::Network(network) => self.network.record(&sample.host, network),
        }
    }
}

/// Result of paging through a window. `error` is set if the store failed part way, in which case
/// `window` holds what was gathered up to that point.
#[derive(Debug)]
pub struct WindowCollection {
    pub window: TelemetryWindow,
    pub pages: usize,
    pub error: Option<StoreError>,
}

/// Page through all telemetry recorded in `window` and fold it into a [TelemetryWindow].
pub async fn collect_window<S>(
    store: &S,
    index: &str,
    window: RunWindow,
    page_size: usize,
) -> WindowCollection
where
    S: SearchStore + ?Sized,
{
    let mut pages = TelemetryPages::new(store, index, window, page_size);
    let mut collection = WindowCollection {
        window: TelemetryWindow::default(),
        pages: 0,
        error: None,
    };

    loop {
        match pages.next_page().await {
            PageOutcome::Page(samples) => {
                collection.pages += 1;
                for sample in samples {
                    collection.window.apply(sample);
                }
            }
            PageOutcome::Done => break,
            PageOutcome::Failed(e) => {
                collection.error = Some(e);
                break;
            }
        }
    }

    collection
}
