use crate::window::{Coverage, NetworkCounters, TelemetryWindow};
use bench_results_model::{NetCounter, NetworkTotals, NodeUsage};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("No node coverage samples were collected for the window")]
    NoCoverage,
}

/// A network counter that went backwards between the start and the end of a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterAnomaly {
    pub host: String,
    pub counter: NetCounter,
    pub start: u64,
    pub last: u64,
}

impl CounterAnomaly {
    pub fn delta(&self) -> i64 {
        counter_delta(self.start, self.last)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkReport {
    pub totals: NetworkTotals,
    pub anomalies: Vec<CounterAnomaly>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowAggregate {
    pub usage: NodeUsage,
    pub network: NetworkTotals,
    pub anomalies: Vec<CounterAnomaly>,
    /// Number of coverage samples recorded, including those left out for incomplete coverage
    pub coverage_samples: usize,
}

/// Max and mean of the per-instant node totals over the coverage history.
///
/// The number of hosts in the last entry is taken as the expected host count and entries with
/// fewer hosts are left out. Fails if nothing is left to average over.
pub fn node_usage(history: &[Coverage]) -> Result<NodeUsage, AggregateError> {
    let expected_hosts = history.last().ok_or(AggregateError::NoCoverage)?.len();

    let mut retained = 0u64;
    let (mut cpu_sum, mut mem_sum) = (0u128, 0u128);
    let (mut cpu_max, mut mem_max) = (0u128, 0u128);

    for coverage in history.iter().filter(|c| c.len() >= expected_hosts) {
        let cpu: u128 = coverage.values().map(|s| u128::from(s.cpu)).sum();
        let mem: u128 = coverage.values().map(|s| u128::from(s.mem)).sum();

        retained += 1;
        cpu_sum += cpu;
        mem_sum += mem;
        cpu_max = cpu_max.max(cpu);
        mem_max = mem_max.max(mem);
    }

    if retained == 0 {
        return Err(AggregateError::NoCoverage);
    }

    let usage = NodeUsage {
        cpu_max: clamp_total("cpu", cpu_max),
        cpu_avg: cpu_sum as f64 / retained as f64,
        mem_max: clamp_total("memory", mem_max),
        mem_avg: mem_sum as f64 / retained as f64,
    };

    Ok(usage)
}

/// Sum of `last - start` per counter over every host that has a start snapshot.
///
/// Negative deltas are summed as they are and reported as anomalies.
pub fn network_totals(counters: &NetworkCounters) -> NetworkReport {
    let mut report = NetworkReport::default();

    for (host, start) in counters.start() {
        let Some(last) = counters.last().get(host) else {
            continue;
        };

        for counter in NetCounter::all() {
            let (start, last) = (start.get(counter), last.get(counter));
            let delta = counter_delta(start, last);
            if delta < 0 {
                report.anomalies.push(CounterAnomaly {
                    host: host.clone(),
                    counter,
                    start,
                    last,
                });
            }
            report.totals.add(counter, delta);
        }
    }

    report
}

/// Aggregate a collected window. No aggregate exists when no node coverage was recorded.
pub fn aggregate_window(window: &TelemetryWindow) -> Result<WindowAggregate, AggregateError> {
    let usage = node_usage(window.coverage.history())?;
    let NetworkReport { totals, anomalies } = network_totals(&window.network);

    Ok(WindowAggregate {
        usage,
        network: totals,
        anomalies,
        coverage_samples: window.coverage.len(),
    })
}

fn clamp_total(name: &str, total: u128) -> u64 {
    u64::try_from(total).unwrap_or_else(|_| {
        log::warn!("Node {name} total {total} exceeds the recordable maximum, clamping");
        u64::MAX
    })
}

fn counter_delta(start: u64, last: u64) -> i64 {
    (i128::from(last) - i128::from(start)) as i64
}
