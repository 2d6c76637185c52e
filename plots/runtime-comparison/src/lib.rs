use std::path::Path;

use common::{
    aggregate::{aggregate_function, method_bars},
    chart::{ChartOptions, Panel, render_bar_chart},
    method::{Engine, MethodTag, Phase},
    plot::{Plot, PlotContext, Source},
    util::function_title,
};
use eyre::{ContextCompat, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// V8 and QuickJS side by side for each scripted interceptor phase of one function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeComparison {
    #[serde(default = "default_function")]
    pub function: String,
    #[serde(default = "default_filename")]
    pub filename: String,
}

fn default_function() -> String {
    "hot_path".to_owned()
}

fn default_filename() -> String {
    "runtime_comparison.svg".to_owned()
}

impl Default for RuntimeComparison {
    fn default() -> Self {
        Self {
            function: default_function(),
            filename: default_filename(),
        }
    }
}

/// `onEnter V8, onEnter QJS, onLeave V8, ...`
fn compared_methods() -> Vec<MethodTag> {
    Phase::SCRIPTED
        .into_iter()
        .flat_map(|phase| {
            Engine::ALL.into_iter().map(move |engine| MethodTag::Intercept {
                phase,
                engine: Some(engine),
            })
        })
        .collect()
}

#[typetag::serde]
impl Plot for RuntimeComparison {
    fn name(&self) -> &'static str {
        "RuntimeComparison"
    }

    fn required_sources(&self) -> &'static [Source] {
        &[Source::Timing]
    }

    fn plot(&self, ctx: &PlotContext<'_>, plot_path: &Path) -> Result<()> {
        let store = ctx.timing.context("Timing samples not loaded")?;
        let report = aggregate_function(store, &self.function, ctx.settings);

        let methods = compared_methods();
        let mut bars = method_bars(
            &report,
            ctx.settings,
            Some(methods.as_slice()),
            MethodTag::short_label,
            0,
        );
        if bars.is_empty() {
            warn!("No interceptor samples for {}", self.function);
            return Ok(());
        }
        for bar in &mut bars {
            bar.annotation = Some(format!("{:.0}", bar.value));
        }

        let [reference, candidate] = Engine::ALL;
        let panel = Panel {
            options: ChartOptions {
                title: format!(
                    "{} vs {}: {}",
                    reference.name(),
                    candidate.name(),
                    function_title(&report.function, report.call_count)
                ),
                y_label: store.unit().axis_label(),
                log_scale: false,
                noise_band: None,
            },
            bars,
        };
        render_bar_chart(&plot_path.join(&self.filename), &panel)
    }
}
