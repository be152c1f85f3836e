//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! The matrix API key may also be supplied through MATRIX_API_KEY.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// CSV with one row per transfer
    #[serde(default = "default_transfers_file")]
    pub transfers_file: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { transfers_file: default_transfers_file() }
    }
}

fn default_transfers_file() -> String {
    "data/transfers.csv".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationConfig {
    /// Hospitals strictly under this travel time are feasible
    #[serde(default = "default_threshold_secs")]
    pub threshold_secs: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self { threshold_secs: default_threshold_secs() }
    }
}

fn default_threshold_secs() -> f64 {
    3600.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct HospitalsConfig {
    /// Suffix stripped from destination names (e.g. "Westmead Hosp")
    #[serde(default = "default_name_suffix")]
    pub name_suffix: String,
    /// Cleaned names classified as spinal specialist hospitals
    #[serde(default = "default_spinal")]
    pub spinal: Vec<String>,
}

impl Default for HospitalsConfig {
    fn default() -> Self {
        Self { name_suffix: default_name_suffix(), spinal: default_spinal() }
    }
}

fn default_name_suffix() -> String {
    " Hosp".to_string()
}

fn default_spinal() -> Vec<String> {
    vec!["Royal North Shore".to_string(), "Prince of Wales".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatrixConfig {
    #[serde(default = "default_matrix_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-lookup timeout
    #[serde(default = "default_matrix_timeout_ms")]
    pub timeout_ms: u64,
    /// Lookups in flight at once (1 = sequential)
    #[serde(default = "default_matrix_concurrency")]
    pub concurrency: usize,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            endpoint: default_matrix_endpoint(),
            api_key: None,
            timeout_ms: default_matrix_timeout_ms(),
            concurrency: default_matrix_concurrency(),
        }
    }
}

fn default_matrix_endpoint() -> String {
    "https://maps.googleapis.com/maps/api/distancematrix/json".to_string()
}

fn default_matrix_timeout_ms() -> u64 {
    10_000
}

fn default_matrix_concurrency() -> usize {
    4
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Nested JSON report
    #[serde(default = "default_json_file")]
    pub json_file: String,
    /// Flat tabular report
    #[serde(default = "default_csv_file")]
    pub csv_file: String,
    /// Run summary (skipped/failed transfers, metrics)
    #[serde(default = "default_summary_file")]
    pub summary_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_file: default_json_file(),
            csv_file: default_csv_file(),
            summary_file: default_summary_file(),
        }
    }
}

fn default_json_file() -> String {
    "out/data.json".to_string()
}

fn default_csv_file() -> String {
    "out/nearest_hospitals.csv".to_string()
}

fn default_summary_file() -> String {
    "out/run_summary.json".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub hospitals: HospitalsConfig,
    #[serde(default)]
    pub matrix: MatrixConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    config_file: String,
    transfers_file: String,
    threshold_secs: f64,
    hospital_name_suffix: String,
    spinal_hospitals: Vec<String>,
    matrix_endpoint: String,
    matrix_api_key: Option<String>,
    matrix_timeout_ms: u64,
    matrix_concurrency: usize,
    json_file: String,
    csv_file: String,
    summary_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    /// Determine config file path from the CLI value or environment
    pub fn resolve_config_path(cli: Option<&str>) -> String {
        if let Some(path) = cli {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        let matrix_api_key = toml_config
            .matrix
            .api_key
            .filter(|k| !k.is_empty())
            .or_else(|| env::var("MATRIX_API_KEY").ok().filter(|k| !k.is_empty()));

        Self {
            config_file,
            transfers_file: toml_config.input.transfers_file,
            threshold_secs: toml_config.evaluation.threshold_secs,
            hospital_name_suffix: toml_config.hospitals.name_suffix,
            spinal_hospitals: toml_config.hospitals.spinal,
            matrix_endpoint: toml_config.matrix.endpoint,
            matrix_api_key,
            matrix_timeout_ms: toml_config.matrix.timeout_ms,
            matrix_concurrency: toml_config.matrix.concurrency.max(1),
            json_file: toml_config.output.json_file,
            csv_file: toml_config.output.csv_file,
            summary_file: toml_config.output.summary_file,
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let threshold = toml_config.evaluation.threshold_secs;
        if !threshold.is_finite() || threshold < 0.0 {
            bail!("Invalid threshold_secs {} in {}", threshold, path.display());
        }

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration - a missing file means defaults, anything else
    /// wrong with an existing file is an error
    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        match fs::metadata(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(config_file = %path, "config_not_found_using_defaults");
                Ok(Self::default())
            }
            _ => Self::from_file(path),
        }
    }

    // CLI overrides
    pub fn with_threshold_secs(mut self, secs: f64) -> Self {
        self.threshold_secs = secs;
        self
    }

    pub fn with_transfers_file(mut self, path: &str) -> Self {
        self.transfers_file = path.to_string();
        self
    }

    pub fn with_matrix_endpoint(mut self, endpoint: &str) -> Self {
        self.matrix_endpoint = endpoint.to_string();
        self
    }

    pub fn with_matrix_concurrency(mut self, concurrency: usize) -> Self {
        self.matrix_concurrency = concurrency.max(1);
        self
    }

    pub fn with_output_dir(mut self, dir: &Path) -> Self {
        self.json_file = dir.join("data.json").display().to_string();
        self.csv_file = dir.join("nearest_hospitals.csv").display().to_string();
        self.summary_file = dir.join("run_summary.json").display().to_string();
        self
    }

    // Getters for all config fields
    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn transfers_file(&self) -> &str {
        &self.transfers_file
    }

    pub fn threshold_secs(&self) -> f64 {
        self.threshold_secs
    }

    pub fn hospital_name_suffix(&self) -> &str {
        &self.hospital_name_suffix
    }

    pub fn spinal_hospitals(&self) -> &[String] {
        &self.spinal_hospitals
    }

    pub fn matrix_endpoint(&self) -> &str {
        &self.matrix_endpoint
    }

    pub fn matrix_api_key(&self) -> Option<&str> {
        self.matrix_api_key.as_deref()
    }

    pub fn matrix_timeout(&self) -> Duration {
        Duration::from_millis(self.matrix_timeout_ms)
    }

    pub fn matrix_concurrency(&self) -> usize {
        self.matrix_concurrency
    }

    pub fn json_file(&self) -> &str {
        &self.json_file
    }

    pub fn csv_file(&self) -> &str {
        &self.csv_file
    }

    pub fn summary_file(&self) -> &str {
        &self.summary_file
    }
}
