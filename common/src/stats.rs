use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Replaces NaN and infinities coming out of degenerate input with zero
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Quantile of already sorted samples, linear interpolation between
/// closest ranks.
pub fn compute_quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let fraction = rank - lower as f64;
            sorted[lower] + fraction * (sorted[upper] - sorted[lower])
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupStatistic {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub min: f64,
    pub max: f64,
}

impl GroupStatistic {
    /// Summary of one group's samples, `None` when the group is empty
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let std = if n < 2 {
            0.0
        } else {
            let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            variance.sqrt()
        };

        let q1 = compute_quantile(&sorted, 0.25);
        let median = compute_quantile(&sorted, 0.5);
        let q3 = compute_quantile(&sorted, 0.75);

        Some(Self {
            count: n,
            mean: finite_or_zero(mean),
            std: finite_or_zero(std),
            median: finite_or_zero(median),
            q1: finite_or_zero(q1),
            q3: finite_or_zero(q3),
            iqr: finite_or_zero(q3 - q1),
            min: finite_or_zero(sorted[0]),
            max: finite_or_zero(sorted[n - 1]),
        })
    }

    /// The value a chart bar or report line shows
    pub fn central(&self, statistic: Statistic) -> f64 {
        match statistic {
            Statistic::Mean => self.mean,
            Statistic::Median => self.median,
        }
    }

    /// Downward and upward error around [`Self::central`]
    pub fn spread(&self, statistic: Statistic) -> (f64, f64) {
        match statistic {
            Statistic::Mean => (self.std, self.std),
            Statistic::Median => (self.median - self.q1, self.q3 - self.median),
        }
    }
}

/// Which central tendency governs charts, summaries and runtime comparisons
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    #[default]
    Mean,
    Median,
}

impl Statistic {
    pub fn describe(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean ± std",
            Statistic::Median => "median ± IQR/2",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Mean => write!(f, "mean"),
            Statistic::Median => write!(f, "median"),
        }
    }
}

impl FromStr for Statistic {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean" => Ok(Statistic::Mean),
            "median" => Ok(Statistic::Median),
            other => Err(ConfigError::UnknownStatistic(other.to_owned())),
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_quartiles_are_ordered(values in prop::collection::vec(1e-6f64..1e6, 1..200)) {
            let stat = GroupStatistic::compute(&values).unwrap();
            prop_assert!(stat.min <= stat.q1);
            prop_assert!(stat.q1 <= stat.median);
            prop_assert!(stat.median <= stat.q3);
            prop_assert!(stat.q3 <= stat.max);
            prop_assert!(stat.std >= 0.0);
        }

        #[test]
        fn prop_compute_is_deterministic(values in prop::collection::vec(1e-6f64..1e6, 1..50)) {
            let a = GroupStatistic::compute(&values).unwrap();
            let b = GroupStatistic::compute(&values).unwrap();
            prop_assert_eq!(a.mean.to_bits(), b.mean.to_bits());
            prop_assert_eq!(a.std.to_bits(), b.std.to_bits());
            prop_assert_eq!(a.median.to_bits(), b.median.to_bits());
        }
    }
}
