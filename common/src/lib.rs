pub mod aggregate;
pub mod chart;
pub mod config;
pub mod error;
pub mod method;
pub mod overhead;
pub mod plot;
pub mod report;
pub mod sample;
pub mod stats;
pub mod util;
