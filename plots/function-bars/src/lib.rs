use std::path::Path;

use common::{
    aggregate::{aggregate, method_bars, noise_band},
    chart::{ChartOptions, Panel, render_bar_grid},
    method::MethodTag,
    plot::{Plot, PlotContext, Source},
    util::function_title,
};
use eyre::{ContextCompat, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One panel per benchmarked function, every method as a bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionBars {
    /// Restrict to these functions, all by default
    #[serde(default)]
    pub functions: Option<Vec<String>>,
    /// Restrict to these methods, all by default
    #[serde(default)]
    pub methods: Option<Vec<MethodTag>>,
    #[serde(default)]
    pub log_scale: bool,
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default = "default_columns")]
    pub columns: usize,
}

fn default_filename() -> String {
    "performance.svg".to_owned()
}

fn default_columns() -> usize {
    2
}

impl Default for FunctionBars {
    fn default() -> Self {
        Self {
            functions: None,
            methods: None,
            log_scale: false,
            filename: default_filename(),
            columns: default_columns(),
        }
    }
}

#[typetag::serde]
impl Plot for FunctionBars {
    fn name(&self) -> &'static str {
        "FunctionBars"
    }

    fn required_sources(&self) -> &'static [Source] {
        &[Source::Timing]
    }

    fn plot(&self, ctx: &PlotContext<'_>, plot_path: &Path) -> Result<()> {
        let store = ctx.timing.context("Timing samples not loaded")?;
        let settings = ctx.settings;

        let panels = aggregate(store, settings)
            .iter()
            .filter(|report| {
                self.functions
                    .as_ref()
                    .is_none_or(|functions| functions.contains(&report.function))
            })
            .filter_map(|report| {
                let bars = method_bars(
                    report,
                    settings,
                    self.methods.as_deref(),
                    MethodTag::label,
                    1,
                );
                if bars.is_empty() {
                    debug!("No bars for {}", report.function);
                    return None;
                }
                Some(Panel {
                    options: ChartOptions {
                        title: function_title(&report.function, report.call_count),
                        y_label: store.unit().axis_label(),
                        log_scale: self.log_scale,
                        noise_band: noise_band(report, settings),
                    },
                    bars,
                })
            })
            .collect::<Vec<_>>();

        if panels.is_empty() {
            warn!("Nothing to plot for {}", self.filename);
            return Ok(());
        }

        render_bar_grid(
            &plot_path.join(&self.filename),
            &format!("Function Performance ({})", settings.statistic.describe()),
            &panels,
            self.columns,
        )
    }
}
