use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use common::{
    aggregate::{FunctionReport, aggregate, compare_runtimes},
    config::{Config, Settings},
    plot::PlotContext,
    report::{performance_lines, render_summary},
    sample::{MetricColumn, SampleStore},
};
use eyre::{Context, Result, bail};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const MODULES: &[&str] = &[
    "common",
    "function_bars",
    "runtime_comparison",
    "memory_bars",
    "default_plots",
];

#[derive(Parser)]
#[command(
    name = "hookbench",
    about = "Charts and summaries of function hooking benchmarks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long)]
    log: Vec<String>,
}

#[derive(Args)]
struct Inputs {
    /// Timing results
    #[arg(short, long, default_value = "results.csv")]
    timing: PathBuf,
    /// Metric column of the timing results
    #[arg(long, default_value = "Time_ms")]
    timing_column: MetricColumn,
    /// Memory results, `Method,Memory_KB`
    #[arg(short, long)]
    memory: Option<PathBuf>,
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the configured charts
    Plot {
        #[command(flatten)]
        inputs: Inputs,
        /// Output directory
        #[arg(short, long, default_value = "plots")]
        output: PathBuf,
    },
    /// Print the performance and runtime summary
    Summary {
        #[command(flatten)]
        inputs: Inputs,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List recorded functions and their methods
    Functions {
        #[arg(short, long, default_value = "results.csv")]
        timing: PathBuf,
        #[arg(long, default_value = "Time_ms")]
        timing_column: MetricColumn,
    },
}

fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "hookbench.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("hookbench={log_level}"));

    if !args.log.is_empty() {
        for log in &args.log {
            env_filter = env_filter.add_directive(log.parse()?);
        }
    }

    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(layer().with_writer(non_blocking))
        .init();

    default_plots::init_plots();

    let result = match args.command {
        Commands::Plot { inputs, output } => plot(&inputs, &output),
        Commands::Summary {
            inputs,
            output,
            json,
        } => summary(&inputs, output.as_deref(), json),
        Commands::Functions {
            timing,
            timing_column,
        } => list_functions(&timing, timing_column),
    };
    if let Err(err) = &result {
        error!("{err:#?}");
    }
    result
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path)
    } else {
        debug!("No config at {}, using defaults", path.display());
        Ok(Config::default())
    }
}

fn load_store(path: &Path, column: MetricColumn) -> Result<SampleStore> {
    let store = SampleStore::load(path, column)
        .with_context(|| format!("Loading samples from {}", path.display()))?;
    if store.dropped() > 0 {
        warn!(
            "Dropped {} malformed rows from {}",
            store.dropped(),
            path.display()
        );
    }
    if store.is_empty() {
        bail!("No usable samples in {}", path.display());
    }
    info!(
        "Loaded {} samples from {}",
        store.observations().len(),
        path.display()
    );
    Ok(store)
}

struct Loaded {
    config: Config,
    timing: SampleStore,
    memory: Option<SampleStore>,
}

fn load(inputs: &Inputs) -> Result<Loaded> {
    let config = load_config(&inputs.config)?;
    let timing = load_store(&inputs.timing, inputs.timing_column)?;
    let memory = inputs
        .memory
        .as_deref()
        .map(|path| load_store(path, MetricColumn::MemoryKb))
        .transpose()?;
    Ok(Loaded {
        config,
        timing,
        memory,
    })
}

fn plot(inputs: &Inputs, output: &Path) -> Result<()> {
    let loaded = load(inputs)?;
    let ctx = PlotContext {
        timing: Some(&loaded.timing),
        memory: loaded.memory.as_ref(),
        settings: &loaded.config.settings,
    };
    let plots = loaded
        .config
        .plots
        .clone()
        .unwrap_or_else(default_plots::default_plots);

    common::plot::plot(&plots, &ctx, output)?;
    println!("Plots written to {}", output.display());
    Ok(())
}

fn summary_json(
    timing: &[FunctionReport],
    memory: Option<&[FunctionReport]>,
    settings: &Settings,
) -> Result<String> {
    let runtimes = timing
        .iter()
        .flat_map(|report| compare_runtimes(report, settings))
        .collect::<Vec<_>>();
    let value = serde_json::json!({
        "statistic": settings.statistic,
        "functions": timing,
        "runtime_comparison": runtimes,
        "memory": memory,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

fn summary_text(loaded: &Loaded, json: bool) -> Result<String> {
    let settings = &loaded.config.settings;
    let timing = aggregate(&loaded.timing, settings);
    let memory = loaded
        .memory
        .as_ref()
        .map(|store| aggregate(store, settings));

    if json {
        return summary_json(&timing, memory.as_deref(), settings);
    }
    let mut text = render_summary(&timing, settings, loaded.timing.unit());
    if let (Some(reports), Some(store)) = (&memory, &loaded.memory) {
        let lines = performance_lines(reports, settings, store.unit(), false);
        text.push('\n');
        text.push_str(&lines.join("\n"));
        text.push('\n');
    }
    Ok(text)
}

fn summary(inputs: &Inputs, output: Option<&Path>, json: bool) -> Result<()> {
    let text = summary_text(&load(inputs)?, json)?;
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Writing summary to {}", path.display()))?,
        None => print!("{text}"),
    }
    Ok(())
}

fn list_functions(timing: &Path, column: MetricColumn) -> Result<()> {
    let store = load_store(timing, column)?;
    for function in store.functions() {
        println!("{function}");
        for (method, count) in store.method_counts(function) {
            println!("  {method:24} {count}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMING: &str = "\
Function,Method,Time_ms
hot_path,baseline,100
hot_path,ldpreload,120
hot_path,frida_onenter_v8,300
hot_path,frida_onenter_qjs,360
array_ops,frida_onenter_v8,5
";

    const MEMORY: &str = "\
Method,Memory_KB
baseline,1000
ldpreload,1200
";

    fn store(data: &str, column: MetricColumn) -> SampleStore {
        SampleStore::from_reader(data.as_bytes(), column).unwrap()
    }

    fn loaded(memory: bool) -> Loaded {
        Loaded {
            config: Config::default(),
            timing: store(TIMING, MetricColumn::TimeMs),
            memory: memory.then(|| store(MEMORY, MetricColumn::MemoryKb)),
        }
    }

    #[test]
    fn json_summary_shape() {
        let text = summary_text(&loaded(true), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        let functions = value["functions"].as_array().unwrap();
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0]["function"], "hot_path");
        assert_eq!(functions[1]["function"], "array_ops");

        let runtimes = value["runtime_comparison"].as_array().unwrap();
        assert_eq!(runtimes.len(), 1);
        assert_eq!(runtimes[0]["delta"]["faster"], "Reference");

        let memory = value["memory"].as_array().unwrap();
        assert_eq!(memory[0]["function"], "process");
        assert!(value["statistic"].is_string());
    }

    #[test]
    fn json_summary_without_memory() {
        let text = summary_text(&loaded(false), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value["memory"].is_null());
        assert!(value["functions"].is_array());
    }

    #[test]
    fn text_summary_appends_memory_section() {
        let text = summary_text(&loaded(true), false).unwrap();
        assert!(text.starts_with("Performance Summary (mean ± std ms):"));
        assert!(text.contains("V8 vs QuickJS Runtime Comparison:"));
        assert!(text.contains("Performance Summary (mean ± std KB):"));
        assert!(text.contains("PROCESS:"));
        assert!(text.ends_with('\n'));

        let without = summary_text(&loaded(false), false).unwrap();
        assert!(!without.contains("KB"));
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config.name, "hookbench");
        assert!(config.plots.is_none());
    }

    #[test]
    fn present_config_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "name: nightly\n").unwrap();
        assert_eq!(load_config(&path).unwrap().name, "nightly");
    }
}
