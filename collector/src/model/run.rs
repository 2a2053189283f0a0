use bench_results_model::IoMetrics;
use serde::{Deserialize, Serialize};

/// Completion time bounds for run discovery, in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub lower: i64,
    #[serde(default)]
    pub upper: Option<i64>,
}

/// The `[start, end]` interval of a run over which host telemetry is collected, in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunWindow {
    pub start: i64,
    pub end: i64,
}

/// A run results document as published by the benchmark controller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub spec: Option<RunSpec>,
    pub start_time: i64,
    pub completion_time: i64,
    #[serde(default)]
    pub results: RunResults,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunSpec {
    #[serde(default)]
    pub actions: Vec<RunAction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunAction {
    #[serde(rename = "createObjSpec", default)]
    pub create_obj_spec: Option<CreateObjSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateObjSpec {
    pub workload: String,
    pub storage_class: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunResults {
    #[serde(default)]
    pub workload_results: Vec<WorkloadResult>,
}

/// Output of one benchmark pod.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkloadResult {
    pub pod_name: String,
    pub node_name: String,
    #[serde(default)]
    pub results: IoMetrics,
}

impl RunDocument {
    /// Workload identity the run's results are accumulated under.
    ///
    /// Baseline runs are tagged through their name. Every other run is identified by the first
    /// action's `<workload>-<storageClass>`.
    pub fn workload_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_ref().filter(|n| n.contains("baseline")) {
            return Some(name.clone());
        }

        let spec = self
            .spec
            .as_ref()?
            .actions
            .first()?
            .create_obj_spec
            .as_ref()?;
        Some(format!("{}-{}", spec.workload, spec.storage_class))
    }

    pub fn runtime(&self) -> i64 {
        self.completion_time - self.start_time
    }
}

/// A discovered, completed run that is long enough to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct RunDescriptor {
    pub name: String,
    pub start_time: i64,
    pub completion_time: i64,
    pub pod_results: Vec<PodResult>,
}

impl RunDescriptor {
    pub fn window(&self) -> RunWindow {
        RunWindow {
            start: self.start_time,
            end: self.completion_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PodResult {
    pub pod_name: String,
    pub node_name: String,
    pub metrics: IoMetrics,
}

impl From<WorkloadResult> for PodResult {
    fn from(result: WorkloadResult) -> Self {
        Self {
            pod_name: result.pod_name,
            node_name: result.node_name,
            metrics: result.results,
        }
    }
}
