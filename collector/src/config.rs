use std::path::PathBuf;

/// Environment variable name to set a custom results file path
pub const RESULTS_PATH_ENV: &str = "RESULTS_PATH";
/// Default path for the results file
pub const DEFAULT_RESULTS_PATH: &str = "results";
/// Environment variable name to set the index prefix that benchmark runs are published to
pub const RUNS_INDEX_ENV: &str = "RUNS_INDEX";
pub const DEFAULT_RUNS_INDEX: &str = "fiotest";
/// Environment variable name to set the index prefix that host telemetry is shipped to
pub const TELEMETRY_INDEX_ENV: &str = "TELEMETRY_INDEX";
pub const DEFAULT_TELEMETRY_INDEX: &str = "metricbeat";

/// Maximum number of hits requested per search.
pub const PAGE_SIZE: usize = 10_000;
/// Runs shorter than this, in seconds, are ignored.
pub const MIN_RUNTIME: i64 = 1000;

/// Settings for one collection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    pub results_path: PathBuf,
    pub runs_index: String,
    pub telemetry_index: String,
    pub page_size: usize,
    pub min_runtime: i64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            results_path: PathBuf::from(DEFAULT_RESULTS_PATH),
            runs_index: DEFAULT_RUNS_INDEX.to_string(),
            telemetry_index: DEFAULT_TELEMETRY_INDEX.to_string(),
            page_size: PAGE_SIZE,
            min_runtime: MIN_RUNTIME,
        }
    }
}

impl CollectorConfig {
    /// Build the config from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            results_path: lookup(RESULTS_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.results_path),
            runs_index: lookup(RUNS_INDEX_ENV).unwrap_or(defaults.runs_index),
            telemetry_index: lookup(TELEMETRY_INDEX_ENV).unwrap_or(defaults.telemetry_index),
            ..defaults
        }
    }
}
