//! Mock Distance Matrix server
//!
//! Answers Distance-Matrix-shaped GET requests with deterministic travel
//! times so the batch runner can be exercised offline.
//!
//! Usage:
//!   cargo run --bin mock-matrix -- --port 8090
//!   ambulance-reach --endpoint http://127.0.0.1:8090/maps/api/distancematrix/json

use ambulance_reach::io::mock_matrix::{self, MockMatrixConfig};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mock-matrix")]
#[command(about = "Mock Distance Matrix provider for local runs")]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "8090")]
    port: u16,

    /// Simulated travel speed (km/h)
    #[arg(long, default_value = "50")]
    speed_kmh: f64,

    /// Shortest simulated distance (meters)
    #[arg(long, default_value = "500")]
    min_distance_m: f64,

    /// Longest simulated distance (meters)
    #[arg(long, default_value = "60000")]
    max_distance_m: f64,

    /// API key answered with REQUEST_DENIED
    #[arg(long, default_value = "invalid")]
    deny_key: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = MockMatrixConfig {
        speed_mps: args.speed_kmh / 3.6,
        min_distance_m: args.min_distance_m,
        max_distance_m: args.max_distance_m.max(args.min_distance_m),
        deny_key: Some(args.deny_key).filter(|k| !k.is_empty()),
    };

    let listener = TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!(port = %args.port, speed_kmh = %args.speed_kmh, "mock_matrix_starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown_signal_received");
            let _ = shutdown_tx.send(true);
        }
    });

    mock_matrix::serve(listener, config, shutdown_rx).await
}
