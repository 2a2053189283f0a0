//! Extraction of fio's JSON output into the canonical [IoMetrics] record.

use bench_results_model::{DirectionMetrics, IoMetrics, LatencyStats, MaxMean, Percentile};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to parse fio output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("fio output contains no jobs")]
    NoJobs,
}

#[derive(Debug, Deserialize)]
struct FioOutput {
    jobs: Vec<FioJob>,
}

#[derive(Debug, Deserialize)]
struct FioJob {
    read: FioDirection,
    write: FioDirection,
}

#[derive(Debug, Deserialize)]
struct FioDirection {
    total_ios: u64,
    bw_max: f64,
    bw_mean: f64,
    iops_max: f64,
    iops_mean: f64,
    lat_ns: FioLatency,
}

#[derive(Debug, Deserialize)]
struct FioLatency {
    max: f64,
    mean: f64,
    #[serde(default)]
    percentile: BTreeMap<String, f64>,
}

impl From<FioDirection> for DirectionMetrics {
    fn from(direction: FioDirection) -> Self {
        let percentiles = direction
            .lat_ns
            .percentile
            .into_iter()
            .filter_map(|(label, value)| match label.parse::<Percentile>() {
                Ok(percentile) => Some((percentile, value)),
                Err(_) => {
                    log::debug!("Dropping unknown latency percentile {label}");
                    None
                }
            })
            .collect();

        Self {
            bandwidth: MaxMean {
                max: direction.bw_max,
                mean: direction.bw_mean,
            },
            iops: MaxMean {
                max: direction.iops_max,
                mean: direction.iops_mean,
            },
            latency: LatencyStats {
                max: direction.lat_ns.max,
                mean: direction.lat_ns.mean,
                percentiles,
            },
        }
    }
}

fn recorded(direction: FioDirection) -> Option<DirectionMetrics> {
    (direction.total_ios > 0).then(|| direction.into())
}

/// Extract the metrics of the first job in a fio JSON report.
///
/// A direction is only present when fio recorded at least one I/O for it.
pub fn extract_fio<R: Read>(reader: R) -> Result<IoMetrics, ExtractError> {
    let output: FioOutput = serde_json::from_reader(reader)?;
    let job = output.jobs.into_iter().next().ok_or(ExtractError::NoJobs)?;

    Ok(IoMetrics {
        read: recorded(job.read),
        write: recorded(job.write),
    })
}
