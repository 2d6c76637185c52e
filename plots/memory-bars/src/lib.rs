use std::path::Path;

use common::{
    aggregate::{aggregate, method_bars, noise_band},
    chart::{ChartOptions, Panel, render_bar_chart, render_bar_grid},
    method::MethodTag,
    plot::{Plot, PlotContext, Source},
    sample::PROCESS_FUNCTION,
    util::title_case,
};
use eyre::{ContextCompat, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Peak memory per method, annotated with the growth over baseline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryBars {
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default)]
    pub log_scale: bool,
}

fn default_filename() -> String {
    "memory.svg".to_owned()
}

impl Default for MemoryBars {
    fn default() -> Self {
        Self {
            filename: default_filename(),
            log_scale: false,
        }
    }
}

#[typetag::serde]
impl Plot for MemoryBars {
    fn name(&self) -> &'static str {
        "MemoryBars"
    }

    fn required_sources(&self) -> &'static [Source] {
        &[Source::Memory]
    }

    fn plot(&self, ctx: &PlotContext<'_>, plot_path: &Path) -> Result<()> {
        let store = ctx.memory.context("Memory samples not loaded")?;
        let settings = ctx.settings;
        let unit = store.unit();

        let panels = aggregate(store, settings)
            .iter()
            .filter(|report| !report.entries.is_empty())
            .map(|report| {
                let mut bars = method_bars(report, settings, None, MethodTag::label, 0);
                for (bar, entry) in bars.iter_mut().zip(&report.entries) {
                    bar.annotation = Some(match entry.overhead {
                        Some(overhead) => format!(
                            "{:.0} ({:+.0} {})",
                            bar.value,
                            overhead.absolute,
                            unit.symbol()
                        ),
                        None => format!("{:.0}", bar.value),
                    });
                }
                let title = if report.function == PROCESS_FUNCTION {
                    "Memory Usage".to_owned()
                } else {
                    format!("Memory Usage: {}", title_case(&report.function))
                };
                Panel {
                    options: ChartOptions {
                        title,
                        y_label: unit.axis_label(),
                        log_scale: self.log_scale,
                        noise_band: noise_band(report, settings),
                    },
                    bars,
                }
            })
            .collect::<Vec<_>>();

        let path = plot_path.join(&self.filename);
        match panels.as_slice() {
            [] => {
                warn!("No memory samples to plot");
                Ok(())
            }
            [panel] => render_bar_chart(&path, panel),
            panels => render_bar_grid(&path, "Memory Usage", panels, 2),
        }
    }
}
