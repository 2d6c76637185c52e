use core::fmt::Debug;
use std::path::Path;

use dyn_clone::{DynClone, clone_trait_object};
use eyre::{Context, Result};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{config::Settings, sample::SampleStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    Timing,
    Memory,
}

/// Everything a plot may draw from. Stores are read-only after load.
#[derive(Debug, Clone, Copy)]
pub struct PlotContext<'a> {
    pub timing: Option<&'a SampleStore>,
    pub memory: Option<&'a SampleStore>,
    pub settings: &'a Settings,
}

impl<'a> PlotContext<'a> {
    pub fn source(&self, source: Source) -> Option<&'a SampleStore> {
        match source {
            Source::Timing => self.timing,
            Source::Memory => self.memory,
        }
    }
}

#[typetag::serde(tag = "type")]
pub trait Plot: Debug + DynClone + Send + Sync {
    fn name(&self) -> &'static str;
    /// The sources that this plot requires
    fn required_sources(&self) -> &'static [Source];
    /// Plots the data
    ///
    /// Arguments:
    /// * `ctx` - Loaded sample stores and settings
    /// * `plot_path` - Output directory, ie. /plots
    fn plot(&self, ctx: &PlotContext<'_>, plot_path: &Path) -> Result<()>;
}
clone_trait_object!(Plot);

/// Runs every plot whose sources are loaded. Plots are independent and run
/// in parallel; the first failure is returned after all have finished.
pub fn plot(plots: &[Box<dyn Plot>], ctx: &PlotContext<'_>, plot_path: &Path) -> Result<()> {
    std::fs::create_dir_all(plot_path)
        .with_context(|| format!("Create plot dir {}", plot_path.display()))?;

    let results = plots
        .par_iter()
        .filter(|plot| {
            let missing = plot
                .required_sources()
                .iter()
                .any(|s| ctx.source(*s).is_none_or(|store| store.is_empty()));
            if missing {
                warn!("Skipping {}, required data not loaded", plot.name());
            }
            !missing
        })
        .map(|plot| {
            debug!("Running {}", plot.name());
            plot.plot(ctx, plot_path)
                .with_context(|| format!("Plot {}", plot.name()))
        })
        .collect::<Vec<_>>();
    for item in results {
        item?;
    }
    Ok(())
}
