//! Integration tests for configuration loading

use ambulance_reach::infra::Config;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[input]
transfers_file = "data/2023.csv"

[evaluation]
threshold_secs = 1800

[hospitals]
name_suffix = " Hospital"
spinal = ["Prince of Wales"]

[matrix]
endpoint = "http://127.0.0.1:8090/maps/api/distancematrix/json"
api_key = "abc123"
timeout_ms = 2500
concurrency = 8

[output]
json_file = "reports/data.json"
csv_file = "reports/rows.csv"
summary_file = "reports/summary.json"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.transfers_file(), "data/2023.csv");
    assert_eq!(config.threshold_secs(), 1800.0);
    assert_eq!(config.hospital_name_suffix(), " Hospital");
    assert_eq!(config.spinal_hospitals(), &["Prince of Wales"]);
    assert_eq!(config.matrix_endpoint(), "http://127.0.0.1:8090/maps/api/distancematrix/json");
    assert_eq!(config.matrix_api_key(), Some("abc123"));
    assert_eq!(config.matrix_timeout(), Duration::from_millis(2500));
    assert_eq!(config.matrix_concurrency(), 8);
    assert_eq!(config.json_file(), "reports/data.json");
    assert_eq!(config.csv_file(), "reports/rows.csv");
    assert_eq!(config.summary_file(), "reports/summary.json");
}

#[test]
fn test_partial_file_uses_section_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[evaluation]\nthreshold_secs = 900.5\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.threshold_secs(), 900.5);
    assert_eq!(config.transfers_file(), "data/transfers.csv");
    assert_eq!(config.spinal_hospitals(), &["Royal North Shore", "Prince of Wales"]);
    assert_eq!(config.matrix_concurrency(), 4);
}

#[test]
fn test_negative_threshold_rejected() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[evaluation]\nthreshold_secs = -1.0\n").unwrap();
    temp_file.flush().unwrap();

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("threshold_secs"));
}

#[test]
fn test_zero_concurrency_clamped() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[matrix]\nconcurrency = 0\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.matrix_concurrency(), 1);
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml").unwrap();
    assert_eq!(config.threshold_secs(), 3600.0);
    assert_eq!(config.transfers_file(), "data/transfers.csv");
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_shipped_dev_config_parses() {
    let config = Config::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config/dev.toml")).unwrap();
    assert_eq!(config.threshold_secs(), 3600.0);
    assert!(config.matrix_endpoint().contains("127.0.0.1"));
}

#[test]
fn test_load_from_path_rejects_invalid_threshold() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[evaluation]\nthreshold_secs = -1.0\n\n[output]\njson_file = \"custom/data.json\"\n")
        .unwrap();
    temp_file.flush().unwrap();

    let err = Config::load_from_path(temp_file.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("threshold_secs"));
}

#[test]
fn test_load_from_path_rejects_malformed_toml() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[evaluation\nthreshold_secs = 10\n").unwrap();
    temp_file.flush().unwrap();

    let err = Config::load_from_path(temp_file.path().to_str().unwrap()).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}
