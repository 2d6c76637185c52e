use common::plot::Plot;
pub use function_bars::FunctionBars;
pub use memory_bars::MemoryBars;
pub use runtime_comparison::RuntimeComparison;

/// Hack to prevent serde issues, makes sure every plot crate is linked in
/// before a config is deserialized
pub fn init_plots() {
    _ = serde_json::to_string(&FunctionBars::default());
    _ = serde_json::to_string(&RuntimeComparison::default());
    _ = serde_json::to_string(&MemoryBars::default());
}

/// Plots used when the config does not list any
pub fn default_plots() -> Vec<Box<dyn Plot>> {
    vec![
        Box::new(FunctionBars::default()),
        Box::new(RuntimeComparison::default()),
        Box::new(MemoryBars::default()),
    ]
}

#[cfg(test)]
mod tests {
    use common::config::Config;

    use super::*;

    #[test]
    fn config_lists_plots_by_type() {
        init_plots();
        let yaml = r#"
name: run
plots:
  - type: FunctionBars
    methods: [baseline, frida_onenter_v8]
  - type: RuntimeComparison
    function: recursive
  - type: MemoryBars
"#;
        let config: Config = serde_yml::from_str(yaml).unwrap();
        let names: Vec<&str> = config.plots.unwrap().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["FunctionBars", "RuntimeComparison", "MemoryBars"]);
    }

    #[test]
    fn defaults_cover_every_plot() {
        let names: Vec<&str> = default_plots().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["FunctionBars", "RuntimeComparison", "MemoryBars"]);
    }
}
