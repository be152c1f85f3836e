//! Ambulance reach - transfer feasibility and nearest-hospital reports
//!
//! Reads a batch of ambulance transfers, asks a Distance Matrix provider for
//! travel times from each pickup to every known hospital, and writes which
//! hospitals were reachable within the threshold.
//!
//! Module structure:
//! - `domain/` - Hospitals, transfers, evaluation results
//! - `io/` - CSV ingestion, matrix provider, report output
//! - `services/` - Evaluator, aggregator, batch pipeline
//! - `infra/` - Config, metrics

use ambulance_reach::infra::Config;
use ambulance_reach::io::{HttpMatrixClient, HttpMatrixConfig};
use ambulance_reach::services::run_batch;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Ambulance reach - which hospitals each transfer could have reached
#[derive(Parser, Debug)]
#[command(name = "ambulance-reach", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Transfers CSV (overrides [input].transfers_file)
    #[arg(short, long)]
    input: Option<String>,

    /// Feasibility threshold in seconds
    #[arg(short, long)]
    threshold_secs: Option<f64>,

    /// Distance Matrix endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Lookups in flight at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Directory for data.json, nearest_hospitals.csv and run_summary.json
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Default: INFO, use RUST_LOG=debug to see every lookup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_timer(UtcTime::rfc_3339())
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(UtcTime::rfc_3339())
            .with_target(false)
            .init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        build = option_env!("GIT_HASH").unwrap_or("unknown"),
        "ambulance-reach starting"
    );

    let config_path = Config::resolve_config_path(args.config.as_deref());
    let mut config = Config::load_from_path(&config_path)?;
    if let Some(input) = &args.input {
        config = config.with_transfers_file(input);
    }
    if let Some(threshold) = args.threshold_secs {
        anyhow::ensure!(
            threshold.is_finite() && threshold >= 0.0,
            "threshold must be a non-negative number of seconds, got {}",
            threshold
        );
        config = config.with_threshold_secs(threshold);
    }
    if let Some(endpoint) = &args.endpoint {
        config = config.with_matrix_endpoint(endpoint);
    }
    if let Some(concurrency) = args.concurrency {
        config = config.with_matrix_concurrency(concurrency);
    }
    if let Some(dir) = &args.output_dir {
        config = config.with_output_dir(dir);
    }

    info!(
        config_file = %config.config_file(),
        transfers_file = %config.transfers_file(),
        threshold_secs = %config.threshold_secs(),
        matrix_endpoint = %config.matrix_endpoint(),
        matrix_concurrency = %config.matrix_concurrency(),
        api_key_set = config.matrix_api_key().is_some(),
        json_file = %config.json_file(),
        csv_file = %config.csv_file(),
        "config_loaded"
    );

    let client = HttpMatrixClient::new(HttpMatrixConfig {
        endpoint: config.matrix_endpoint().to_string(),
        api_key: config.matrix_api_key().map(str::to_string),
        timeout: config.matrix_timeout(),
    })?;

    let summary = run_batch(&config, Arc::new(client))
        .await
        .with_context(|| format!("Run over {} failed", config.transfers_file()))?;
    summary.log();

    info!(run_id = %summary.run_id, "ambulance-reach finished");
    Ok(())
}
