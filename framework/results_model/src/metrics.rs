use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// I/O direction of a benchmark measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Read,
    Write,
}

/// Latency percentile labels as emitted by fio's default `percentile_list`.
///
/// The label is the exact map key used in the extracted metric record, so `P99_99` is keyed by
/// `"99.990000"`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum_macros::Display,
    strum_macros::EnumString,
)]
pub enum Percentile {
    #[strum(serialize = "1.000000")]
    P1,
    #[strum(serialize = "5.000000")]
    P5,
    #[strum(serialize = "10.000000")]
    P10,
    #[strum(serialize = "20.000000")]
    P20,
    #[strum(serialize = "30.000000")]
    P30,
    #[strum(serialize = "40.000000")]
    P40,
    #[strum(serialize = "50.000000")]
    P50,
    #[strum(serialize = "60.000000")]
    P60,
    #[strum(serialize = "70.000000")]
    P70,
    #[strum(serialize = "80.000000")]
    P80,
    #[strum(serialize = "90.000000")]
    P90,
    #[strum(serialize = "95.000000")]
    P95,
    #[strum(serialize = "99.000000")]
    P99,
    #[strum(serialize = "99.500000")]
    P99_5,
    #[strum(serialize = "99.900000")]
    P99_9,
    #[strum(serialize = "99.950000")]
    P99_95,
    #[strum(serialize = "99.990000")]
    P99_99,
}

/// A max/mean pair, used for both bandwidth and IOPS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MaxMean {
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum LatencyStatsError {
    #[error("Latency stats are missing the `{0}` key")]
    Missing(&'static str),
}

/// Latency statistics for one direction.
///
/// On the wire this is a single string keyed map holding the percentile labels together with the
/// `max` and `mean` keys. Labels outside of [`Percentile`] are dropped when reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct LatencyStats {
    pub max: f64,
    pub mean: f64,
    pub percentiles: BTreeMap<Percentile, f64>,
}

impl LatencyStats {
    /// The value recorded for a percentile, if any.
    pub fn percentile(&self, percentile: Percentile) -> Option<f64> {
        self.percentiles.get(&percentile).copied()
    }

    /// The 99.99th percentile latency, zero when it was not recorded.
    pub fn p99_99(&self) -> f64 {
        self.percentile(Percentile::P99_99).unwrap_or_default()
    }
}

impl TryFrom<BTreeMap<String, f64>> for LatencyStats {
    type Error = LatencyStatsError;

    fn try_from(mut map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let max = map.remove("max").ok_or(LatencyStatsError::Missing("max"))?;
        let mean = map.remove("mean").ok_or(LatencyStatsError::Missing("mean"))?;
        let percentiles = map
            .into_iter()
            .filter_map(|(label, value)| {
                label
                    .parse::<Percentile>()
                    .ok()
                    .map(|percentile| (percentile, value))
            })
            .collect();

        Ok(Self {
            max,
            mean,
            percentiles,
        })
    }
}

impl From<LatencyStats> for BTreeMap<String, f64> {
    fn from(stats: LatencyStats) -> Self {
        let mut map = stats
            .percentiles
            .into_iter()
            .map(|(percentile, value)| (percentile.to_string(), value))
            .collect::<BTreeMap<_, _>>();
        map.insert("max".to_string(), stats.max);
        map.insert("mean".to_string(), stats.mean);
        map
    }
}

/// The metrics recorded for one direction of one pod's benchmark run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectionMetrics {
    pub bandwidth: MaxMean,
    pub iops: MaxMean,
    pub latency: LatencyStats,
}

impl DirectionMetrics {
    /// The seven scalars that must all be non-zero for the record to be usable.
    pub fn required_fields(&self) -> [f64; 7] {
        [
            self.bandwidth.max,
            self.bandwidth.mean,
            self.iops.max,
            self.iops.mean,
            self.latency.max,
            self.latency.mean,
            self.latency.p99_99(),
        ]
    }
}

/// Canonical per-run metric record produced from a benchmark tool's raw output.
///
/// A side is only present when the tool recorded at least one I/O in that direction. The
/// serialized form uses the flat `rbw`/`riops`/`rlats`/`wbw`/`wiops`/`wlats` keys; a side is only
/// read back when all three of its keys are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "FlatIoMetrics", into = "FlatIoMetrics")]
pub struct IoMetrics {
    pub read: Option<DirectionMetrics>,
    pub write: Option<DirectionMetrics>,
}

impl IoMetrics {
    pub fn direction(&self, direction: Direction) -> Option<&DirectionMetrics> {
        match direction {
            Direction::Read => self.read.as_ref(),
            Direction::Write => self.write.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FlatIoMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rbw: Option<MaxMean>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    riops: Option<MaxMean>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rlats: Option<LatencyStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wbw: Option<MaxMean>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wiops: Option<MaxMean>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wlats: Option<LatencyStats>,
}

fn join_direction(
    bandwidth: Option<MaxMean>,
    iops: Option<MaxMean>,
    latency: Option<LatencyStats>,
) -> Option<DirectionMetrics> {
    Some(DirectionMetrics {
        bandwidth: bandwidth?,
        iops: iops?,
        latency: latency?,
    })
}

impl From<FlatIoMetrics> for IoMetrics {
    fn from(flat: FlatIoMetrics) -> Self {
        Self {
            read: join_direction(flat.rbw, flat.riops, flat.rlats),
            write: join_direction(flat.wbw, flat.wiops, flat.wlats),
        }
    }
}

impl From<IoMetrics> for FlatIoMetrics {
    fn from(metrics: IoMetrics) -> Self {
        let mut flat = FlatIoMetrics::default();
        if let Some(read) = metrics.read {
            flat.rbw = Some(read.bandwidth);
            flat.riops = Some(read.iops);
            flat.rlats = Some(read.latency);
        }
        if let Some(write) = metrics.write {
            flat.wbw = Some(write.bandwidth);
            flat.wiops = Some(write.iops);
            flat.wlats = Some(write.latency);
        }
        flat
    }
}

/// Summed node resource usage over a run's window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeUsage {
    /// Maximum of the per-instant CPU totals, in nanocores
    pub cpu_max: u64,
    /// Mean of the per-instant CPU totals, in nanocores
    pub cpu_avg: f64,
    /// Maximum of the per-instant memory totals, in bytes
    pub mem_max: u64,
    /// Mean of the per-instant memory totals, in bytes
    pub mem_avg: f64,
}

/// A cumulative network counter reported per host.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum NetCounter {
    RxBytes,
    RxPackets,
    TxBytes,
    TxPackets,
}

impl NetCounter {
    pub fn all() -> impl Iterator<Item = NetCounter> {
        NetCounter::iter()
    }
}

/// Network counter deltas summed across hosts for one window.
///
/// Totals are signed; a counter reset on a host shows up as a negative contribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkTotals {
    pub rx_bytes: i64,
    pub rx_packets: i64,
    pub tx_bytes: i64,
    pub tx_packets: i64,
}

impl NetworkTotals {
    pub fn get(&self, counter: NetCounter) -> i64 {
        match counter {
            NetCounter::RxBytes => self.rx_bytes,
            NetCounter::RxPackets => self.rx_packets,
            NetCounter::TxBytes => self.tx_bytes,
            NetCounter::TxPackets => self.tx_packets,
        }
    }

    pub fn add(&mut self, counter: NetCounter, delta: i64) {
        let total = match counter {
            NetCounter::RxBytes => &mut self.rx_bytes,
            NetCounter::RxPackets => &mut self.rx_packets,
            NetCounter::TxBytes => &mut self.tx_bytes,
            NetCounter::TxPackets => &mut self.tx_packets,
        };
        *total += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn latency_stats_resolve_percentile_labels() {
        let stats: LatencyStats = serde_json::from_str(
            r#"{"max": 5, "mean": 3.5, "50.000000": 2, "99.990000": 4, "12.340000": 9}"#,
        )
        .unwrap();

        assert_eq!(5.0, stats.max);
        assert_eq!(3.5, stats.mean);
        assert_eq!(Some(2.0), stats.percentile(Percentile::P50));
        assert_eq!(4.0, stats.p99_99());
        assert_eq!(2, stats.percentiles.len());
    }

    #[test]
    fn latency_stats_require_max_and_mean() {
        let err = serde_json::from_str::<LatencyStats>(r#"{"mean": 3, "99.990000": 4}"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("max"), "unexpected error: {err}");
    }

    #[test]
    fn missing_p99_99_reads_as_zero() {
        let stats: LatencyStats = serde_json::from_str(r#"{"max": 5, "mean": 3}"#).unwrap();
        assert_eq!(0.0, stats.p99_99());
    }

    #[test]
    fn io_metrics_only_join_complete_sides() {
        let metrics: IoMetrics = serde_json::from_value(serde_json::json!({
            "wbw": {"max": 100, "mean": 90},
            "wiops": {"max": 10, "mean": 9},
            "wlats": {"max": 5, "mean": 3, "99.990000": 4},
            "rbw": {"max": 1, "mean": 1},
        }))
        .unwrap();

        assert!(metrics.read.is_none());
        let write = metrics.direction(Direction::Write).unwrap();
        assert_eq!(
            [100.0, 90.0, 10.0, 9.0, 5.0, 3.0, 4.0],
            write.required_fields()
        );
    }

    #[test]
    fn io_metrics_serialize_flat_keys() {
        let metrics = IoMetrics {
            read: Some(DirectionMetrics {
                bandwidth: MaxMean {
                    max: 1.0,
                    mean: 1.0,
                },
                iops: MaxMean {
                    max: 2.0,
                    mean: 2.0,
                },
                latency: LatencyStats {
                    max: 3.0,
                    mean: 3.0,
                    percentiles: BTreeMap::from([(Percentile::P99_99, 3.0)]),
                },
            }),
            write: None,
        };

        let value = serde_json::to_value(&metrics).unwrap();
        assert_eq!(
            serde_json::json!({
                "rbw": {"max": 1.0, "mean": 1.0},
                "riops": {"max": 2.0, "mean": 2.0},
                "rlats": {"max": 3.0, "mean": 3.0, "99.990000": 3.0},
            }),
            value
        );
    }

    #[test]
    fn network_totals_add_by_counter() {
        let mut totals = NetworkTotals::default();
        totals.add(NetCounter::RxBytes, 10);
        totals.add(NetCounter::RxBytes, -15);
        totals.add(NetCounter::TxPackets, 3);

        assert_eq!(-5, totals.get(NetCounter::RxBytes));
        assert_eq!(3, totals.get(NetCounter::TxPackets));
        assert_eq!(0, totals.get(NetCounter::RxPackets));
        assert_eq!(4, NetCounter::all().count());
    }
}
