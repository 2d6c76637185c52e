use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("Missing column {0}")]
    MissingColumn(String),
    #[error("Unknown metric column {0:?}, expected one of Time_ms, Time_us, Memory_KB")]
    UnknownColumn(String),
    #[error("Row {line}: empty {field}")]
    EmptyField { line: u64, field: &'static str },
    #[error("Row {line}: metric {value:?} is not a finite number")]
    MalformedMetric { line: u64, value: String },
    #[error("Row {line}: {source}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Header(#[from] csv::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("No samples for {function}/{method}")]
    MissingGroup { function: String, method: String },
    #[error("No {method} group for {function}, overhead omitted")]
    MissingBaseline { function: String, method: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown method {0:?}")]
    UnknownMethod(String),
    #[error("Invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),
    #[error("Unknown statistic {0:?}")]
    UnknownStatistic(String),
}
