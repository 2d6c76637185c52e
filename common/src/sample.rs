use std::{
    collections::{HashMap, HashSet},
    fmt,
    fs::File,
    io::Read,
    path::Path,
    str::FromStr,
};

use csv::{ReaderBuilder, StringRecord, Trim};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{error::SampleError, method::MethodTag};

/// Function name given to rows of a source without a `Function` column
pub const PROCESS_FUNCTION: &str = "process";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricColumn {
    #[serde(rename = "Time_ms")]
    TimeMs,
    #[serde(rename = "Time_us")]
    TimeUs,
    #[serde(rename = "Memory_KB")]
    MemoryKb,
}

impl MetricColumn {
    pub fn header(&self) -> &'static str {
        match self {
            MetricColumn::TimeMs => "Time_ms",
            MetricColumn::TimeUs => "Time_us",
            MetricColumn::MemoryKb => "Memory_KB",
        }
    }

    pub fn unit(&self) -> MetricUnit {
        match self {
            MetricColumn::TimeMs => MetricUnit::Milliseconds,
            MetricColumn::TimeUs => MetricUnit::Microseconds,
            MetricColumn::MemoryKb => MetricUnit::Kilobytes,
        }
    }
}

impl FromStr for MetricColumn {
    type Err = SampleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Time_ms" => Ok(MetricColumn::TimeMs),
            "Time_us" => Ok(MetricColumn::TimeUs),
            "Memory_KB" => Ok(MetricColumn::MemoryKb),
            other => Err(SampleError::UnknownColumn(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricUnit {
    Milliseconds,
    Microseconds,
    Kilobytes,
}

impl MetricUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            MetricUnit::Milliseconds => "ms",
            MetricUnit::Microseconds => "µs",
            MetricUnit::Kilobytes => "KB",
        }
    }

    pub fn axis_label(&self) -> String {
        match self {
            MetricUnit::Kilobytes => format!("Memory ({})", self.symbol()),
            _ => format!("Time ({})", self.symbol()),
        }
    }

    /// Nanoseconds per unit, `None` for non-time units
    pub fn nanos(&self) -> Option<f64> {
        match self {
            MetricUnit::Milliseconds => Some(1_000_000.0),
            MetricUnit::Microseconds => Some(1_000.0),
            MetricUnit::Kilobytes => None,
        }
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub function: String,
    pub method: String,
    /// `None` when the method name is not one this tool knows how to order
    pub tag: Option<MethodTag>,
    pub metric: f64,
}

#[derive(Debug, Clone)]
pub struct SampleStore {
    column: MetricColumn,
    observations: Vec<Observation>,
    dropped: usize,
}

struct Columns {
    function: Option<usize>,
    method: usize,
    metric: usize,
}

impl Columns {
    fn locate(headers: &StringRecord, column: MetricColumn) -> Result<Self, SampleError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let function = find("Function");
        if function.is_none() && column != MetricColumn::MemoryKb {
            return Err(SampleError::MissingColumn("Function".to_owned()));
        }
        Ok(Self {
            function,
            method: find("Method")
                .ok_or_else(|| SampleError::MissingColumn("Method".to_owned()))?,
            metric: find(column.header())
                .ok_or_else(|| SampleError::MissingColumn(column.header().to_owned()))?,
        })
    }

    fn parse(&self, record: &StringRecord, line: u64) -> Result<Observation, SampleError> {
        let function = match self.function {
            Some(idx) => record.get(idx).unwrap_or_default(),
            None => PROCESS_FUNCTION,
        };
        if function.is_empty() {
            return Err(SampleError::EmptyField {
                line,
                field: "Function",
            });
        }
        let method = record.get(self.method).unwrap_or_default();
        if method.is_empty() {
            return Err(SampleError::EmptyField {
                line,
                field: "Method",
            });
        }
        let raw = record.get(self.metric).unwrap_or_default();
        let metric = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| SampleError::MalformedMetric {
                line,
                value: raw.to_owned(),
            })?;

        Ok(Observation {
            function: function.to_owned(),
            method: method.to_owned(),
            tag: method.parse().ok(),
            metric,
        })
    }
}

impl SampleStore {
    pub fn load(path: &Path, column: MetricColumn) -> Result<Self, SampleError> {
        debug!("Loading {} from {}", column.header(), path.display());
        Self::from_reader(File::open(path)?, column)
    }

    /// Reads every row of a CSV source. Rows that cannot be used are dropped
    /// with a warning; only a missing header column fails the load.
    pub fn from_reader<R: Read>(reader: R, column: MetricColumn) -> Result<Self, SampleError> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);
        let columns = Columns::locate(reader.headers()?, column)?;

        let mut observations = Vec::new();
        let mut dropped = 0;
        for (idx, record) in reader.records().enumerate() {
            let line = idx as u64 + 2;
            let parsed = record
                .map_err(|source| SampleError::Csv { line, source })
                .and_then(|record| columns.parse(&record, line));
            match parsed {
                Ok(observation) => observations.push(observation),
                Err(err) => {
                    warn!("Dropping row: {err}");
                    dropped += 1;
                }
            }
        }

        for method in observations
            .iter()
            .filter(|o| o.tag.is_none())
            .map(|o| o.method.as_str())
            .unique()
        {
            warn!("Unrecognised method {method}, left out of reports");
        }

        debug!(
            "Loaded {} observations, dropped {dropped}",
            observations.len()
        );
        Ok(Self {
            column,
            observations,
            dropped,
        })
    }

    pub fn from_observations(column: MetricColumn, observations: Vec<Observation>) -> Self {
        Self {
            column,
            observations,
            dropped: 0,
        }
    }

    pub fn unit(&self) -> MetricUnit {
        self.column.unit()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Metric values of one (function, method) group, empty when absent
    pub fn select(&self, function: &str, method: &str) -> Vec<f64> {
        self.observations
            .iter()
            .filter(|o| o.function == function && o.method == method)
            .map(|o| o.metric)
            .collect()
    }

    pub fn select_tag(&self, function: &str, tag: MethodTag) -> Vec<f64> {
        self.observations
            .iter()
            .filter(|o| o.function == function && o.tag == Some(tag))
            .map(|o| o.metric)
            .collect()
    }

    /// Function names in order of first appearance
    pub fn functions(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.observations
            .iter()
            .map(|o| o.function.as_str())
            .filter(|f| seen.insert(*f))
            .collect()
    }

    /// Sample count per method name for one function, in first-appearance order
    pub fn method_counts(&self, function: &str) -> Vec<(&str, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order = Vec::new();
        for o in self.observations.iter().filter(|o| o.function == function) {
            let count = counts.entry(o.method.as_str()).or_insert_with(|| {
                order.push(o.method.as_str());
                0
            });
            *count += 1;
        }
        order.into_iter().map(|m| (m, counts[m])).collect()
    }
}
