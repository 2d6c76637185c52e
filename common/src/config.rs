use std::{collections::HashMap, num::NonZeroU64, path::Path};

use eyre::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{chart::Color, method::MethodTag, plot::Plot, stats::Statistic};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub settings: Settings,
    /// `None` selects the default plot set
    #[serde(default)]
    pub plots: Option<Vec<Box<dyn Plot>>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            settings: Settings::default(),
            plots: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Read config {}", path.display()))?;
        serde_yml::from_str(&data)
            .with_context(|| format!("Parse config {}", path.display()))
    }
}

fn default_name() -> String {
    "hookbench".to_owned()
}

const DEFAULT_CALL_COUNT: NonZeroU64 = NonZeroU64::new(1_000_000).unwrap();

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub statistic: Statistic,
    /// Per-call costs below this many nanoseconds are shown in ns, otherwise µs
    pub metric_unit_switch_threshold_ns: f64,
    /// Half-width of the shaded band around the baseline, in percent
    pub noise_band_percent: f64,
    /// Entries are layered over the built-in palette
    #[serde(deserialize_with = "extend_palette")]
    pub palette: HashMap<MethodTag, Color>,
    /// Entries are layered over the built-in call counts
    #[serde(deserialize_with = "extend_call_counts")]
    pub call_counts: HashMap<String, NonZeroU64>,
    pub default_call_count: NonZeroU64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            statistic: Statistic::Mean,
            metric_unit_switch_threshold_ns: 1_000.0,
            noise_band_percent: 5.0,
            palette: default_palette(),
            call_counts: default_call_counts(),
            default_call_count: DEFAULT_CALL_COUNT,
        }
    }
}

impl Settings {
    pub fn call_count(&self, function: &str) -> NonZeroU64 {
        self.call_counts
            .get(function)
            .copied()
            .unwrap_or(self.default_call_count)
    }

    pub fn color(&self, tag: MethodTag) -> Color {
        self.palette.get(&tag).copied().unwrap_or(Color::FALLBACK)
    }
}

fn default_palette() -> HashMap<MethodTag, Color> {
    [
        ("baseline", Color(0x00, 0xff, 0x41)),
        ("baseline_complex", Color(0x00, 0xc8, 0x32)),
        ("ldpreload", Color(0x00, 0xb4, 0xd8)),
        ("frida_onenter_v8", Color(0xff, 0x40, 0x81)),
        ("frida_onleave_v8", Color(0xff, 0x6b, 0x35)),
        ("frida_both_v8", Color(0xff, 0x00, 0x6e)),
        ("frida_onenter_qjs", Color(0x7f, 0xff, 0x00)),
        ("frida_onleave_qjs", Color(0xff, 0x69, 0xb4)),
        ("frida_both_qjs", Color(0xdc, 0x14, 0x3c)),
        ("frida_cmodule", Color(0xff, 0xd1, 0x66)),
        ("frida_complex_v8", Color(0xb3, 0x88, 0xff)),
        ("frida_complex_qjs", Color(0x8a, 0x2b, 0xe2)),
    ]
    .into_iter()
    .filter_map(|(method, color)| Some((method.parse().ok()?, color)))
    .collect()
}

fn extend_palette<'de, D>(deserializer: D) -> Result<HashMap<MethodTag, Color>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut palette = default_palette();
    palette.extend(HashMap::<MethodTag, Color>::deserialize(deserializer)?);
    Ok(palette)
}

fn extend_call_counts<'de, D>(deserializer: D) -> Result<HashMap<String, NonZeroU64>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut call_counts = default_call_counts();
    call_counts.extend(HashMap::<String, NonZeroU64>::deserialize(deserializer)?);
    Ok(call_counts)
}

fn default_call_counts() -> HashMap<String, NonZeroU64> {
    [
        ("hot_path", 100_000_000),
        ("recursive", 1_000_000),
        ("array_ops", 100_000),
        ("memory_ops", 1_000_000),
    ]
    .into_iter()
    .filter_map(|(function, calls)| Some((function.to_owned(), NonZeroU64::new(calls)?)))
    .collect()
}
