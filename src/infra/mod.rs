//! Infrastructure - configuration and run metrics

pub mod config;
pub mod metrics;

pub use config::Config;
pub use metrics::{MetricsSummary, RunMetrics};
