use bench_results_model::{Direction, DirectionMetrics, IoMetrics};

/// A metric record is usable only if none of its required fields is zero.
///
/// All-zero values are an instrumentation artifact rather than a real measurement.
pub fn is_valid(metrics: &DirectionMetrics) -> bool {
    metrics.required_fields().iter().all(|value| *value != 0.0)
}

/// The pod's metrics for `direction`, if they were recorded and are usable.
pub fn usable_metrics(metrics: &IoMetrics, direction: Direction) -> Option<&DirectionMetrics> {
    let selected = metrics.direction(direction)?;
    if is_valid(selected) {
        Some(selected)
    } else {
        log::debug!("Ignoring {direction} metrics with zero fields: {selected:?}");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_results_model::{LatencyStats, MaxMean, Percentile};
    use std::collections::BTreeMap;

    fn complete() -> DirectionMetrics {
        DirectionMetrics {
            bandwidth: MaxMean {
                max: 100.0,
                mean: 90.0,
            },
            iops: MaxMean {
                max: 10.0,
                mean: 9.0,
            },
            latency: LatencyStats {
                max: 5.0,
                mean: 3.0,
                percentiles: BTreeMap::from([(Percentile::P50, 0.0), (Percentile::P99_99, 4.0)]),
            },
        }
    }

    #[test]
    fn complete_record_is_valid() {
        assert!(is_valid(&complete()));
    }

    #[test]
    fn any_zero_required_field_is_invalid() {
        let setters: [fn(&mut DirectionMetrics); 7] = [
            |m| m.bandwidth.max = 0.0,
            |m| m.bandwidth.mean = 0.0,
            |m| m.iops.max = 0.0,
            |m| m.iops.mean = 0.0,
            |m| m.latency.max = 0.0,
            |m| m.latency.mean = 0.0,
            |m| {
                m.latency.percentiles.insert(Percentile::P99_99, 0.0);
            },
        ];

        for (i, zero_field) in setters.iter().enumerate() {
            let mut metrics = complete();
            zero_field(&mut metrics);
            assert!(
                !is_valid(&metrics),
                "field {i} was zero but record is valid"
            );
        }
    }

    #[test]
    fn missing_p99_99_is_invalid() {
        let mut metrics = complete();
        metrics.latency.percentiles.remove(&Percentile::P99_99);
        assert!(!is_valid(&metrics));
    }

    #[test]
    fn directions_are_independent() {
        let mut read = complete();
        read.iops.mean = 0.0;
        let metrics = IoMetrics {
            read: Some(read),
            write: Some(complete()),
        };

        assert!(usable_metrics(&metrics, Direction::Read).is_none());
        assert!(usable_metrics(&metrics, Direction::Write).is_some());
        let unrecorded = IoMetrics::default();
        assert!(usable_metrics(&unrecorded, Direction::Write).is_none());
    }
}
