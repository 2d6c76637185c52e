use crate::{
    aggregate::{FunctionReport, MethodEntry, compare_runtimes},
    config::Settings,
    method::Engine,
    overhead::{format_per_call, format_percent},
    sample::MetricUnit,
    stats::finite_or_zero,
};

fn entry_line(
    entry: &MethodEntry,
    settings: &Settings,
    unit: MetricUnit,
    calls_known: bool,
) -> String {
    let value = entry.stat.central(settings.statistic);
    let (low, high) = entry.stat.spread(settings.statistic);
    let spread = finite_or_zero((low + high) / 2.0);
    let mut line = format!("  {:20}: {value:6.1} ± {spread:4.1}", entry.tag.label());

    if let Some(overhead) = entry.overhead {
        line.push_str(&format!("  [{}", format_percent(overhead.percent)));
        if calls_known
            && let Some(per_call) = format_per_call(
                overhead.per_call,
                unit,
                settings.metric_unit_switch_threshold_ns,
            )
        {
            line.push_str(&format!(", {per_call}"));
        }
        line.push(']');
    }
    line
}

/// Per-function statistic lines with overhead against baseline where one exists
pub fn performance_lines(
    reports: &[FunctionReport],
    settings: &Settings,
    unit: MetricUnit,
    per_call: bool,
) -> Vec<String> {
    let mut lines = vec![format!(
        "Performance Summary ({} {unit}):",
        settings.statistic.describe()
    )];
    for report in reports.iter().filter(|r| !r.entries.is_empty()) {
        lines.push(String::new());
        lines.push(format!("{}:", report.function.to_uppercase()));
        if report.baseline().is_err() {
            lines.push("  (no baseline, overhead not computed)".to_owned());
        }
        lines.extend(
            report
                .entries
                .iter()
                .map(|entry| entry_line(entry, settings, unit, per_call)),
        );
    }
    lines
}

/// V8 against QuickJS per phase, for functions recorded with both engines
pub fn runtime_lines(
    reports: &[FunctionReport],
    settings: &Settings,
    unit: MetricUnit,
) -> Vec<String> {
    let reference = Engine::V8;
    let candidate = Engine::QuickJs;
    let mut lines = vec![format!(
        "{} vs {} Runtime Comparison:",
        reference.name(),
        candidate.name()
    )];
    for report in reports {
        let comparisons = compare_runtimes(report, settings);
        if comparisons.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("{}:", report.function.to_uppercase()));
        for comparison in comparisons {
            let delta = &comparison.delta;
            lines.push(format!(
                "  {:8}: {}={:5.1}{unit}, {}={:5.1}{unit} ({})",
                comparison.phase.label(),
                reference.short_name(),
                delta.reference,
                candidate.short_name(),
                delta.candidate,
                delta.describe(reference.name(), candidate.name()),
            ));
        }
    }
    lines
}

pub fn render_summary(reports: &[FunctionReport], settings: &Settings, unit: MetricUnit) -> String {
    let mut lines = performance_lines(reports, settings, unit, true);
    lines.push(String::new());
    lines.extend(runtime_lines(reports, settings, unit));
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregate::aggregate,
        sample::{MetricColumn, SampleStore},
    };

    const DATA: &str = "\
Function,Method,Time_ms
hot_path,baseline,100
hot_path,ldpreload,120
hot_path,frida_onenter_v8,50
hot_path,frida_onenter_qjs,60
recursive,frida_both_v8,30
";

    fn reports() -> (Vec<FunctionReport>, Settings) {
        let store = SampleStore::from_reader(DATA.as_bytes(), MetricColumn::TimeMs).unwrap();
        let mut settings = Settings::default();
        let calls = std::num::NonZeroU64::new(1_000_000).unwrap();
        settings.call_counts.insert("hot_path".to_owned(), calls);
        (aggregate(&store, &settings), settings)
    }

    #[test]
    fn performance_section() {
        let (reports, settings) = reports();
        let lines = performance_lines(&reports, &settings, MetricUnit::Milliseconds, true);
        assert_eq!(lines[0], "Performance Summary (mean ± std ms):");
        assert_eq!(lines[2], "HOT_PATH:");
        assert_eq!(
            lines[3],
            format!("  {:20}: {:6.1} ± {:4.1}", "Baseline", 100.0, 0.0)
        );
        assert_eq!(
            lines[4],
            format!(
                "  {:20}: {:6.1} ± {:4.1}  [+20.0%, 20.0 ns/call]",
                "LD_PRELOAD", 120.0, 0.0
            )
        );
        let missing = "  (no baseline, overhead not computed)".to_owned();
        assert!(lines.contains(&missing));
    }

    #[test]
    fn runtime_section() {
        let (reports, settings) = reports();
        let lines = runtime_lines(&reports, &settings, MetricUnit::Milliseconds);
        assert_eq!(lines[0], "V8 vs QuickJS Runtime Comparison:");
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[3],
            "  onEnter : V8= 50.0ms, QJS= 60.0ms (V8 faster by 20.0%)"
        );
    }

    #[test]
    fn summary_is_deterministic() {
        let (reports, settings) = reports();
        let first = render_summary(&reports, &settings, MetricUnit::Milliseconds);
        let (again, _) = self::reports();
        assert_eq!(
            first,
            render_summary(&again, &settings, MetricUnit::Milliseconds)
        );
        assert!(!first.contains("NaN"));
    }
}
