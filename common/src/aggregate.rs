use std::num::NonZeroU64;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    chart::{Bar, NoiseBand},
    config::Settings,
    error::AggregateError,
    method::{Engine, FunctionFamily, MethodTag, Phase},
    overhead::{
        OverheadRecord, RuntimeDelta, compute_overhead, compute_runtime_delta, format_percent,
    },
    sample::SampleStore,
    stats::GroupStatistic,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodEntry {
    pub tag: MethodTag,
    pub stat: GroupStatistic,
    /// Relative to the function's baseline, absent for the baseline itself
    /// and for functions without one
    pub overhead: Option<OverheadRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionReport {
    pub function: String,
    pub call_count: NonZeroU64,
    /// Present methods only, in enumeration order
    pub entries: Vec<MethodEntry>,
}

impl FunctionReport {
    pub fn family(&self) -> FunctionFamily {
        FunctionFamily::of(&self.function)
    }

    pub fn entry(&self, tag: MethodTag) -> Option<&MethodEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    pub fn baseline(&self) -> Result<&MethodEntry, AggregateError> {
        let tag = self.family().baseline();
        self.entry(tag).ok_or_else(|| AggregateError::MissingBaseline {
            function: self.function.clone(),
            method: tag.to_string(),
        })
    }
}

/// Statistics and baseline overhead of every known method of one function
pub fn aggregate_function(
    store: &SampleStore,
    function: &str,
    settings: &Settings,
) -> FunctionReport {
    let family = FunctionFamily::of(function);
    let mut entries = Vec::new();
    for tag in family.enumeration() {
        match GroupStatistic::compute(&store.select_tag(function, tag)) {
            Some(stat) => entries.push(MethodEntry {
                tag,
                stat,
                overhead: None,
            }),
            None => debug!(
                "{}",
                AggregateError::MissingGroup {
                    function: function.to_owned(),
                    method: tag.to_string(),
                }
            ),
        }
    }

    let mut report = FunctionReport {
        function: function.to_owned(),
        call_count: settings.call_count(function),
        entries,
    };

    match report.baseline() {
        Ok(baseline) => {
            let baseline = baseline.stat;
            for entry in report.entries.iter_mut().filter(|e| !e.tag.is_baseline()) {
                entry.overhead = Some(compute_overhead(&entry.stat, &baseline, report.call_count));
            }
        }
        Err(err) if !report.entries.is_empty() => warn!("{err}"),
        Err(_) => {}
    }
    report
}

/// One report per function, in the store's first-appearance order
pub fn aggregate(store: &SampleStore, settings: &Settings) -> Vec<FunctionReport> {
    store
        .functions()
        .into_par_iter()
        .map(|function| aggregate_function(store, function, settings))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeComparison {
    pub phase: Phase,
    pub reference: MethodEntry,
    pub candidate: MethodEntry,
    pub delta: RuntimeDelta,
}

/// V8 against QuickJS for every phase recorded with both engines
pub fn compare_runtimes(report: &FunctionReport, settings: &Settings) -> Vec<RuntimeComparison> {
    Phase::ALL
        .into_iter()
        .filter_map(|phase| {
            let reference = report.entry(MethodTag::Intercept {
                phase,
                engine: Some(Engine::V8),
            })?;
            let candidate = report.entry(MethodTag::Intercept {
                phase,
                engine: Some(Engine::QuickJs),
            })?;
            Some(RuntimeComparison {
                phase,
                delta: compute_runtime_delta(
                    &reference.stat,
                    &candidate.stat,
                    settings.statistic,
                    report.call_count,
                ),
                reference: reference.clone(),
                candidate: candidate.clone(),
            })
        })
        .collect()
}

/// Shapes report entries into chart bars. `methods` only restricts which
/// entries appear, bars keep enumeration order.
pub fn method_bars(
    report: &FunctionReport,
    settings: &Settings,
    methods: Option<&[MethodTag]>,
    label: impl Fn(&MethodTag) -> String,
    precision: usize,
) -> Vec<Bar> {
    report
        .entries
        .iter()
        .filter(|e| methods.is_none_or(|m| m.contains(&e.tag)))
        .map(|entry| {
            let value = entry.stat.central(settings.statistic);
            let (error_low, error_high) = entry.stat.spread(settings.statistic);
            let annotation = match entry.overhead {
                Some(overhead) => format!(
                    "{value:.precision$} ({})",
                    format_percent(overhead.percent)
                ),
                None => format!("{value:.precision$}"),
            };
            Bar {
                label: label(&entry.tag),
                value,
                error_low,
                error_high,
                color: settings.color(entry.tag),
                annotation: Some(annotation),
            }
        })
        .collect()
}

/// Band of `baseline ± noise_band_percent` when the function has a baseline
pub fn noise_band(report: &FunctionReport, settings: &Settings) -> Option<NoiseBand> {
    if settings.noise_band_percent <= 0.0 {
        return None;
    }
    let baseline = report.baseline().ok()?;
    Some(NoiseBand {
        center: baseline.stat.central(settings.statistic),
        percent: settings.noise_band_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        overhead::Faster,
        sample::{MetricColumn, Observation},
        stats::Statistic,
    };

    fn store(rows: &[(&str, &str, f64)]) -> SampleStore {
        SampleStore::from_observations(
            MetricColumn::TimeMs,
            rows.iter()
                .map(|(function, method, metric)| Observation {
                    function: function.to_string(),
                    method: method.to_string(),
                    tag: method.parse().ok(),
                    metric: *metric,
                })
                .collect(),
        )
    }

    #[test]
    fn absent_methods_are_skipped() {
        let store = store(&[
            ("hot_path", "frida_onenter_v8", 300.0),
            ("hot_path", "baseline", 100.0),
            ("hot_path", "frida_onenter_v8", 320.0),
        ]);
        let report = aggregate_function(&store, "hot_path", &Settings::default());
        let tags: Vec<String> = report.entries.iter().map(|e| e.tag.to_string()).collect();
        assert_eq!(tags, vec!["baseline", "frida_onenter_v8"]);
        assert!(report.entry(MethodTag::LdPreload).is_none());
    }

    #[test]
    fn overhead_against_baseline_median() {
        let store = store(&[
            ("hot_path", "baseline", 100.0),
            ("hot_path", "ldpreload", 120.0),
        ]);
        let report = aggregate_function(&store, "hot_path", &Settings::default());
        assert_eq!(report.call_count.get(), 100_000_000);
        assert_eq!(report.baseline().unwrap().overhead, None);
        let entry = report.entry(MethodTag::LdPreload).unwrap();
        let overhead = entry.overhead.unwrap();
        assert!((overhead.percent - 20.0).abs() < 1e-9);
        assert!((overhead.per_call - 20.0 / 100_000_000.0).abs() < 1e-18);
    }

    #[test]
    fn missing_baseline_omits_overhead() {
        let store = store(&[
            ("recursive", "ldpreload", 12.0),
            ("recursive", "frida_both_v8", 40.0),
        ]);
        let report = aggregate_function(&store, "recursive", &Settings::default());
        assert_eq!(report.entries.len(), 2);
        assert!(report.entries.iter().all(|e| e.overhead.is_none()));
        assert_eq!(
            report.baseline(),
            Err(AggregateError::MissingBaseline {
                function: "recursive".to_owned(),
                method: "baseline".to_owned(),
            })
        );
    }

    #[test]
    fn complex_family_uses_its_own_baseline() {
        let store = store(&[
            ("compute_sum_complex", "baseline", 1.0),
            ("compute_sum_complex", "baseline_complex", 50.0),
            ("compute_sum_complex", "frida_complex_v8", 75.0),
        ]);
        let report = aggregate_function(&store, "compute_sum_complex", &Settings::default());
        assert_eq!(report.baseline().unwrap().tag, MethodTag::BaselineComplex);
        let entry = report
            .entry(MethodTag::Intercept {
                phase: Phase::Complex,
                engine: Some(Engine::V8),
            })
            .unwrap();
        assert!((entry.overhead.unwrap().percent - 50.0).abs() < 1e-9);
        assert!(report.entry(MethodTag::Baseline).is_none());
    }

    #[test]
    fn groups_do_not_mix() {
        let store = store(&[
            ("hot_path", "baseline", 100.0),
            ("recursive", "baseline", 10.0),
            ("hot_path", "ldpreload", 110.0),
        ]);
        let reports = aggregate(&store, &Settings::default());
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].function, "hot_path");
        assert_eq!(reports[0].baseline().unwrap().stat.count, 1);
        assert_eq!(reports[1].baseline().unwrap().stat.mean, 10.0);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let store = store(&[
            ("hot_path", "baseline", 100.1),
            ("hot_path", "baseline", 99.7),
            ("hot_path", "baseline", 101.3),
            ("hot_path", "frida_both_qjs", 700.2),
            ("hot_path", "frida_both_qjs", 690.9),
        ]);
        let settings = Settings::default();
        assert_eq!(aggregate(&store, &settings), aggregate(&store, &settings));
    }

    #[test]
    fn runtime_comparison_pairs_engines() {
        let store = store(&[
            ("hot_path", "frida_onenter_v8", 50.0),
            ("hot_path", "frida_onenter_qjs", 60.0),
            ("hot_path", "frida_onleave_v8", 70.0),
        ]);
        let settings = Settings::default();
        let report = aggregate_function(&store, "hot_path", &settings);
        let comparisons = compare_runtimes(&report, &settings);
        assert_eq!(comparisons.len(), 1);
        assert_eq!(comparisons[0].phase, Phase::OnEnter);
        assert_eq!(comparisons[0].delta.faster, Faster::Reference);
        assert_eq!(
            comparisons[0].delta.describe("V8", "QuickJS"),
            "V8 faster by 20.0%"
        );
    }

    #[test]
    fn bars_follow_statistic_and_filter() {
        let store = store(&[
            ("hot_path", "baseline", 100.0),
            ("hot_path", "baseline", 110.0),
            ("hot_path", "frida_onenter_qjs", 400.0),
            ("hot_path", "frida_onenter_v8", 300.0),
        ]);
        let mut settings = Settings::default();
        let report = aggregate_function(&store, "hot_path", &settings);

        let v8_only = [MethodTag::Baseline, "frida_onenter_v8".parse().unwrap()];
        let bars = method_bars(&report, &settings, Some(&v8_only[..]), MethodTag::label, 1);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].label, "Baseline");
        assert_eq!(bars[0].value, 105.0);
        assert_eq!(bars[0].annotation.as_deref(), Some("105.0"));
        assert_eq!(bars[1].label, "Frida onEnter (V8)");

        settings.statistic = Statistic::Median;
        let bars = method_bars(&report, &settings, None, MethodTag::short_label, 0);
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[1].label, "onEnter (V8)");
        assert_eq!(bars[2].label, "onEnter (QJS)");
        assert_eq!(bars[0].error_low, 2.5);
        assert_eq!(bars[2].error_high, 0.0);
    }

    #[test]
    fn noise_band_around_baseline() {
        let store = store(&[("hot_path", "baseline", 200.0)]);
        let mut settings = Settings::default();
        let report = aggregate_function(&store, "hot_path", &settings);
        let band = noise_band(&report, &settings).unwrap();
        assert_eq!(band.center, 200.0);
        assert_eq!(band.percent, 5.0);

        settings.noise_band_percent = 0.0;
        assert!(noise_band(&report, &settings).is_none());
    }
}
