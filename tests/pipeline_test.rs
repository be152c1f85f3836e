//! End-to-end batch runs against a canned matrix provider

use ambulance_reach::domain::TransferId;
use ambulance_reach::infra::Config;
use ambulance_reach::io::report::read_flat;
use ambulance_reach::io::{LookupError, MatrixEntry, MatrixLookup, MatrixRequest, MatrixResponse, MatrixStatus};
use ambulance_reach::services::run_batch;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

/// Catalog order is Westmead, Royal North Shore, Liverpool (first occurrence)
const TRANSFERS: &str = "\
ppn,pickup_latitude,pickup_longitude,destination_name,first_hosp_address
10,-33.80,151.00,Westmead Hosp,Hawkesbury Rd Westmead NSW
9,-33.90,151.20,Royal North Shore Hosp,Reserve Rd St Leonards NSW
100,-33.92,150.92,Liverpool Hosp,Elizabeth St Liverpool NSW
55,-33.70,151.10,,
";

struct CannedLookup {
    responses: HashMap<u64, MatrixResponse>,
}

#[async_trait]
impl MatrixLookup for CannedLookup {
    async fn lookup(&self, request: &MatrixRequest) -> Result<MatrixResponse, LookupError> {
        assert_eq!(request.len(), 3);
        self.responses
            .get(&request.ppn.0)
            .cloned()
            .ok_or_else(|| LookupError::Decode(format!("no response for {}", request.ppn)))
    }
}

fn ok(values: &[(f64, f64)]) -> MatrixResponse {
    MatrixResponse::ok(values.iter().map(|&(t, d)| MatrixEntry::new(t, d)).collect())
}

fn lookup() -> Arc<CannedLookup> {
    Arc::new(CannedLookup {
        responses: HashMap::from([
            // Westmead, Royal North Shore, Liverpool
            (9, ok(&[(1000.0, 12_000.0), (2000.0, 20_000.0), (5000.0, 55_000.0)])),
            (10, MatrixResponse::failed(MatrixStatus::OverQueryLimit)),
            (100, ok(&[(600.0, 8_000.0), (4000.0, 45_000.0), (3600.0, 30_000.0)])),
        ]),
    })
}

fn setup(dir: &Path) -> Config {
    let input = dir.join("transfers.csv");
    fs::write(&input, TRANSFERS).unwrap();
    Config::default()
        .with_transfers_file(input.to_str().unwrap())
        .with_output_dir(&dir.join("out"))
        .with_matrix_concurrency(3)
}

#[tokio::test]
async fn test_nested_report_shape_and_order() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path());

    run_batch(&config, lookup()).await.unwrap();

    let content = fs::read_to_string(config.json_file()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&content).unwrap();
    let transfers = report["Ambulance Transfers"].as_array().unwrap();

    // Numeric order, skipped row absent, failed transfer still listed
    let ppns: Vec<u64> = transfers.iter().map(|t| t["ppn"].as_u64().unwrap()).collect();
    assert_eq!(ppns, vec![9, 10, 100]);

    let first = &transfers[0];
    assert_eq!(first["pickup_lat"], -33.9);
    assert_eq!(first["pickup_long"], 151.2);
    let calculated = &first["Calculated Transfers"];
    assert_eq!(calculated["First Hospital"]["hospital"], "Royal North Shore Hospital");
    assert_eq!(calculated["First Hospital"]["time"], 2000.0);
    assert_eq!(calculated["First Hospital"]["distance"], 20_000.0);
    let trauma = calculated["Trauma Hospitals"].as_array().unwrap();
    assert_eq!(trauma.len(), 1);
    assert_eq!(trauma[0]["hospital"], "Westmead Hospital");
    assert!(calculated["Spinal Specialist Hospitals"].as_array().unwrap().is_empty());

    let failed = &transfers[1]["Calculated Transfers"];
    assert!(failed["First Hospital"].is_null());
    assert!(failed["Trauma Hospitals"].as_array().unwrap().is_empty());

    // Assigned hospital kept even at exactly the threshold
    let last = &transfers[2]["Calculated Transfers"];
    assert_eq!(last["First Hospital"]["hospital"], "Liverpool Hospital");
    assert_eq!(last["First Hospital"]["time"], 3600.0);
}

#[tokio::test]
async fn test_flat_report_rows() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path());

    run_batch(&config, lookup()).await.unwrap();

    let rows = read_flat(config.csv_file()).unwrap();
    let ids: Vec<TransferId> = rows.iter().map(|r| r.ppn).collect();
    assert_eq!(ids, vec![TransferId(9), TransferId(10), TransferId(100)]);

    let rns = &rows[0];
    assert_eq!(rns.assigned_hospital, "Royal North Shore");
    assert_eq!(rns.time_to_assigned_min, Some(2000.0 / 60.0));
    assert_eq!(rns.distance_to_assigned_km, Some(20.0));
    assert_eq!(rns.nearest_trauma_hospital.as_deref(), Some("Westmead"));
    assert_eq!(rns.nearest_spinal_hospital, None);

    let failed = &rows[1];
    assert_eq!(failed.assigned_hospital, "Westmead");
    assert_eq!(failed.time_to_assigned_min, None);
    assert_eq!(failed.nearest_trauma_hospital, None);

    let liverpool = &rows[2];
    assert_eq!(liverpool.nearest_trauma_hospital.as_deref(), Some("Westmead"));
    assert_eq!(liverpool.distance_to_nearest_trauma_km, Some(8.0));
    assert_eq!(liverpool.nearest_spinal_hospital, None);
}

#[tokio::test]
async fn test_summary_records_skipped_and_failed() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path());

    let summary = run_batch(&config, lookup()).await.unwrap();
    assert_eq!(summary.hospitals, 3);
    assert_eq!(summary.transfers_total, 4);
    assert_eq!(summary.transfers_evaluated, 2);
    assert_eq!(summary.skipped_ids(), vec![TransferId(55)]);
    assert_eq!(summary.failed_ids(), vec![TransferId(10)]);
    assert_eq!(summary.metrics.lookups_total, 3);
    assert_eq!(summary.metrics.lookups_failed, 1);

    let content = fs::read_to_string(config.summary_file()).unwrap();
    let written: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(written["failed"][0]["ppn"], 10);
    assert_eq!(written["failed"][0]["error"]["kind"], "matrix_lookup_failed");
    assert_eq!(written["skipped"][0]["kind"], "unresolved_assigned_hospital");
    assert_eq!(written["threshold_secs"], 3600.0);
}

#[tokio::test]
async fn test_lower_threshold_never_adds_hospitals() {
    let dir = tempdir().unwrap();
    let strict = setup(dir.path()).with_threshold_secs(700.0);

    run_batch(&strict, lookup()).await.unwrap();
    let rows = read_flat(strict.csv_file()).unwrap();

    // ppn 9: Westmead at 1000s no longer qualifies
    assert_eq!(rows[0].nearest_trauma_hospital, None);
    assert_eq!(rows[0].assigned_hospital, "Royal North Shore");
    assert_eq!(rows[0].time_to_assigned_min, Some(2000.0 / 60.0));
    // ppn 100: Westmead at 600s still does
    assert_eq!(rows[2].nearest_trauma_hospital.as_deref(), Some("Westmead"));
}

#[tokio::test]
async fn test_missing_input_is_fatal() {
    let dir = tempdir().unwrap();
    let config = Config::default()
        .with_transfers_file(dir.path().join("absent.csv").to_str().unwrap())
        .with_output_dir(dir.path());

    let err = run_batch(&config, lookup()).await.unwrap_err();
    assert!(format!("{:#}", err).contains("absent.csv"));
    assert!(!dir.path().join("data.json").exists());
}

#[tokio::test]
async fn test_rerun_overwrites_outputs() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path());

    let first = run_batch(&config, lookup()).await.unwrap();
    let second = run_batch(&config, lookup()).await.unwrap();
    assert_ne!(first.run_id, second.run_id);

    let content = fs::read_to_string(config.summary_file()).unwrap();
    let written: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(written["run_id"], second.run_id.to_string());
}
