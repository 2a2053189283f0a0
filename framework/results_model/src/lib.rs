use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

mod metrics;

pub use metrics::{
    Direction, DirectionMetrics, IoMetrics, LatencyStats, LatencyStatsError, MaxMean, NetCounter,
    NetworkTotals, NodeUsage, Percentile,
};

/// Failure to read or write the persisted results accumulator.
///
/// Callers must treat these as fatal and never fall back to an empty accumulator.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to read results from {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse results in {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write results to {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize results for {path:?}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to replace {path:?} with the new results")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-direction history of I/O statistics, one entry per qualifying pod record.
///
/// The seven sequences only grow together through [MetricSeries::push].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricSeries {
    bw_max: Vec<f64>,
    bw_avg: Vec<f64>,
    iops_max: Vec<f64>,
    iops_avg: Vec<f64>,
    lat_max: Vec<f64>,
    lat_avg: Vec<f64>,
    #[serde(rename = "latP9999")]
    lat_p9999: Vec<f64>,
}

impl MetricSeries {
    /// Append one entry to every sequence.
    pub fn push(&mut self, metrics: &DirectionMetrics) {
        self.bw_max.push(metrics.bandwidth.max);
        self.bw_avg.push(metrics.bandwidth.mean);
        self.iops_max.push(metrics.iops.max);
        self.iops_avg.push(metrics.iops.mean);
        self.lat_max.push(metrics.latency.max);
        self.lat_avg.push(metrics.latency.mean);
        self.lat_p9999.push(metrics.latency.p99_99());
    }

    /// Number of entries, taken from the bandwidth sequence.
    pub fn len(&self) -> usize {
        self.bw_max.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bw_max.is_empty()
    }

    /// The length of each of the seven sequences, in field order.
    pub fn lengths(&self) -> [usize; 7] {
        [
            self.bw_max.len(),
            self.bw_avg.len(),
            self.iops_max.len(),
            self.iops_avg.len(),
            self.lat_max.len(),
            self.lat_avg.len(),
            self.lat_p9999.len(),
        ]
    }

    pub fn bw_max(&self) -> &[f64] {
        &self.bw_max
    }

    pub fn bw_avg(&self) -> &[f64] {
        &self.bw_avg
    }

    pub fn iops_max(&self) -> &[f64] {
        &self.iops_max
    }

    pub fn iops_avg(&self) -> &[f64] {
        &self.iops_avg
    }

    pub fn lat_max(&self) -> &[f64] {
        &self.lat_max
    }

    pub fn lat_avg(&self) -> &[f64] {
        &self.lat_avg
    }

    pub fn lat_p9999(&self) -> &[f64] {
        &self.lat_p9999
    }
}

/// Everything recorded for one workload across all runs seen so far.
///
/// I/O series grow per valid pod record and direction, the telemetry sequences grow once per run
/// that produced a window aggregate. The categories are independent so their lengths may differ.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadResults {
    #[serde(rename = "w")]
    write: MetricSeries,
    #[serde(rename = "r")]
    read: MetricSeries,
    #[serde(rename = "cpuMax")]
    cpu_max: Vec<u64>,
    #[serde(rename = "cpuAvg")]
    cpu_avg: Vec<f64>,
    #[serde(rename = "memMax")]
    mem_max: Vec<u64>,
    #[serde(rename = "memAvg")]
    mem_avg: Vec<f64>,
    #[serde(rename = "rxbytes")]
    rx_bytes: Vec<i64>,
    #[serde(rename = "rxpackets")]
    rx_packets: Vec<i64>,
    #[serde(rename = "txbytes")]
    tx_bytes: Vec<i64>,
    #[serde(rename = "txpackets")]
    tx_packets: Vec<i64>,
}

impl WorkloadResults {
    pub fn series(&self, direction: Direction) -> &MetricSeries {
        match direction {
            Direction::Read => &self.read,
            Direction::Write => &self.write,
        }
    }

    pub fn read(&self) -> &MetricSeries {
        &self.read
    }

    pub fn write(&self) -> &MetricSeries {
        &self.write
    }

    pub fn push_run(&mut self, direction: Direction, metrics: &DirectionMetrics) {
        match direction {
            Direction::Read => self.read.push(metrics),
            Direction::Write => self.write.push(metrics),
        }
    }

    pub fn push_telemetry(&mut self, usage: &NodeUsage, network: &NetworkTotals) {
        self.cpu_max.push(usage.cpu_max);
        self.cpu_avg.push(usage.cpu_avg);
        self.mem_max.push(usage.mem_max);
        self.mem_avg.push(usage.mem_avg);
        self.rx_bytes.push(network.rx_bytes);
        self.rx_packets.push(network.rx_packets);
        self.tx_bytes.push(network.tx_bytes);
        self.tx_packets.push(network.tx_packets);
    }

    pub fn cpu_max(&self) -> &[u64] {
        &self.cpu_max
    }

    pub fn cpu_avg(&self) -> &[f64] {
        &self.cpu_avg
    }

    pub fn mem_max(&self) -> &[u64] {
        &self.mem_max
    }

    pub fn mem_avg(&self) -> &[f64] {
        &self.mem_avg
    }

    /// Recorded totals for one network counter, one entry per aggregated window.
    pub fn network(&self, counter: NetCounter) -> &[i64] {
        match counter {
            NetCounter::RxBytes => &self.rx_bytes,
            NetCounter::RxPackets => &self.rx_packets,
            NetCounter::TxBytes => &self.tx_bytes,
            NetCounter::TxPackets => &self.tx_packets,
        }
    }

    /// Number of windows that contributed telemetry.
    pub fn telemetry_len(&self) -> usize {
        self.cpu_max.len()
    }
}

/// The persistent, append-only collection of historical run statistics keyed by workload name.
///
/// An invocation loads it once, mutates it in memory and saves it once at the end. There is no
/// locking: only one writer may use a given file at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultAccumulator {
    workloads: BTreeMap<String, WorkloadResults>,
}

impl ResultAccumulator {
    /// Load the accumulator from `path`.
    ///
    /// A missing file is a valid initial state and yields an empty accumulator. Any other failure
    /// is returned as an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_reader(BufReader::new(file)).map_err(|source| PersistenceError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the whole accumulator to `path`, replacing whatever was there.
    ///
    /// The content is written to a temporary file next to `path` and renamed over it, so a failure
    /// part way through leaves the previous file untouched. The replaced file's permissions are
    /// kept; a new file gets the same mode a plain create would give it.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let write_err = |source| PersistenceError::Write {
            path: path.to_path_buf(),
            source,
        };
        let serialize_err = |source| PersistenceError::Serialize {
            path: path.to_path_buf(),
            source,
        };

        let previous = std::fs::metadata(path).ok().map(|m| m.permissions());

        let mut file = temp_file_in(dir).map_err(write_err)?;
        {
            let mut writer = BufWriter::new(&mut file);
            serde_json::to_writer(&mut writer, self).map_err(serialize_err)?;
            writer.flush().map_err(write_err)?;
        }
        if let Some(permissions) = previous {
            file.as_file()
                .set_permissions(permissions)
                .map_err(write_err)?;
        }
        file.as_file().sync_all().map_err(write_err)?;

        file.persist(path).map_err(|e| PersistenceError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;

        Ok(())
    }

    /// Get the entry for `name`, creating an empty one on first reference.
    pub fn ensure(&mut self, name: &str) -> &mut WorkloadResults {
        self.workloads.entry(name.to_string()).or_default()
    }

    /// Record one pod's metrics for one direction of a run.
    pub fn append_run(&mut self, name: &str, direction: Direction, metrics: &DirectionMetrics) {
        self.ensure(name).push_run(direction, metrics);
    }

    /// Record the aggregated telemetry of one run window.
    pub fn append_telemetry(&mut self, name: &str, usage: &NodeUsage, network: &NetworkTotals) {
        self.ensure(name).push_telemetry(usage, network);
    }

    pub fn get(&self, name: &str) -> Option<&WorkloadResults> {
        self.workloads.get(name)
    }

    pub fn len(&self) -> usize {
        self.workloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workloads.is_empty()
    }
}

/// Temporary file created with the default mode for new files, still subject to the umask.
#[cfg(unix)]
fn temp_file_in(dir: &Path) -> std::io::Result<tempfile::NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    tempfile::Builder::new()
        .permissions(std::fs::Permissions::from_mode(0o666))
        .tempfile_in(dir)
}

#[cfg(not(unix))]
fn temp_file_in(dir: &Path) -> std::io::Result<tempfile::NamedTempFile> {
    tempfile::NamedTempFile::new_in(dir)
}
