use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::{
    sample::MetricUnit,
    stats::{GroupStatistic, Statistic, finite_or_zero},
};

const TIE_TOLERANCE: f64 = 1e-9;

/// Cost of a candidate method relative to a reference, in the metric's unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverheadRecord {
    pub absolute: f64,
    /// Zero when the reference is zero
    pub percent: f64,
    pub per_call: f64,
}

impl OverheadRecord {
    pub fn between(candidate: f64, reference: f64, call_count: NonZeroU64) -> Self {
        let absolute = finite_or_zero(candidate - reference);
        let percent = if reference == 0.0 {
            0.0
        } else {
            finite_or_zero(absolute / reference * 100.0)
        };
        Self {
            absolute,
            percent,
            per_call: finite_or_zero(absolute / call_count.get() as f64),
        }
    }
}

pub fn compute_overhead(
    candidate: &GroupStatistic,
    baseline: &GroupStatistic,
    call_count: NonZeroU64,
) -> OverheadRecord {
    OverheadRecord::between(candidate.median, baseline.median, call_count)
}

/// Renders a per-call cost, switching from ns to µs at `threshold_ns`.
/// Returns `None` for metrics that are not durations.
pub fn format_per_call(per_call: f64, unit: MetricUnit, threshold_ns: f64) -> Option<String> {
    let nanos = finite_or_zero(per_call * unit.nanos()?);
    if nanos.abs() < threshold_ns {
        Some(format!("{nanos:.1} ns/call"))
    } else {
        Some(format!("{:.1} µs/call", nanos / 1_000.0))
    }
}

pub fn format_percent(percent: f64) -> String {
    format!("{:+.1}%", finite_or_zero(percent))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Faster {
    Reference,
    Candidate,
    Equal,
}

/// Comparison of two variants of one interception approach
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuntimeDelta {
    pub reference: f64,
    pub candidate: f64,
    /// Candidate relative to reference
    pub overhead: OverheadRecord,
    pub faster: Faster,
}

impl RuntimeDelta {
    pub fn describe(&self, reference: &str, candidate: &str) -> String {
        match self.faster {
            Faster::Equal => "equal".to_owned(),
            Faster::Reference => {
                format!("{reference} faster by {:.1}%", self.overhead.percent.abs())
            }
            Faster::Candidate => {
                format!("{candidate} faster by {:.1}%", self.overhead.percent.abs())
            }
        }
    }
}

pub fn compute_runtime_delta(
    reference: &GroupStatistic,
    candidate: &GroupStatistic,
    statistic: Statistic,
    call_count: NonZeroU64,
) -> RuntimeDelta {
    let a = reference.central(statistic);
    let b = candidate.central(statistic);
    let faster = if (a - b).abs() <= TIE_TOLERANCE * a.abs().max(b.abs()) {
        Faster::Equal
    } else if a < b {
        Faster::Reference
    } else {
        Faster::Candidate
    };
    RuntimeDelta {
        reference: a,
        candidate: b,
        overhead: OverheadRecord::between(b, a, call_count),
        faster,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(values: &[f64]) -> GroupStatistic {
        GroupStatistic::compute(values).unwrap()
    }

    fn calls(n: u64) -> NonZeroU64 {
        NonZeroU64::new(n).unwrap()
    }

    #[test]
    fn overhead_from_medians() {
        let record = compute_overhead(&stat(&[120.0]), &stat(&[100.0]), calls(1_000_000));
        assert!((record.absolute - 20.0).abs() < 1e-12);
        assert!((record.percent - 20.0).abs() < 1e-12);
        assert!((record.per_call - 0.00002).abs() < 1e-15);
        assert_eq!(
            format_per_call(record.per_call, MetricUnit::Milliseconds, 1_000.0).as_deref(),
            Some("20.0 ns/call")
        );
    }

    #[test]
    fn negative_overhead_is_preserved() {
        let record = compute_overhead(&stat(&[90.0]), &stat(&[100.0]), calls(10));
        assert!((record.absolute + 10.0).abs() < 1e-12);
        assert!((record.percent + 10.0).abs() < 1e-12);
        assert_eq!(format_percent(record.percent), "-10.0%");
    }

    #[test]
    fn zero_baseline_gives_zero_percent() {
        let record = compute_overhead(&stat(&[5.0]), &stat(&[0.0]), calls(1));
        assert_eq!(record.percent, 0.0);
        assert_eq!(record.absolute, 5.0);
    }

    #[test]
    fn per_call_switches_to_micros() {
        // 2ms over 1000 calls is 2µs per call
        assert_eq!(
            format_per_call(2.0 / 1_000.0, MetricUnit::Milliseconds, 1_000.0).as_deref(),
            Some("2.0 µs/call")
        );
        assert_eq!(
            format_per_call(0.5, MetricUnit::Microseconds, 1_000.0).as_deref(),
            Some("500.0 ns/call")
        );
        assert_eq!(format_per_call(0.5, MetricUnit::Kilobytes, 1_000.0), None);
    }

    #[test]
    fn runtime_delta_reports_faster_variant() {
        let delta =
            compute_runtime_delta(&stat(&[50.0]), &stat(&[60.0]), Statistic::Mean, calls(1));
        assert_eq!(delta.faster, Faster::Reference);
        assert_eq!(delta.describe("V8", "QuickJS"), "V8 faster by 20.0%");

        let delta =
            compute_runtime_delta(&stat(&[60.0]), &stat(&[50.0]), Statistic::Mean, calls(1));
        assert_eq!(delta.faster, Faster::Candidate);
        let text = delta.describe("V8", "QuickJS");
        assert!(text.starts_with("QuickJS faster by"));
    }

    #[test]
    fn runtime_delta_tie() {
        let delta = compute_runtime_delta(
            &stat(&[0.1 + 0.2]),
            &stat(&[0.3]),
            Statistic::Median,
            calls(1),
        );
        assert_eq!(delta.faster, Faster::Equal);
        assert_eq!(delta.describe("V8", "QuickJS"), "equal");
    }
}
