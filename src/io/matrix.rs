//! Travel-time/distance matrix lookups
//!
//! A `MatrixRequest` snapshots the destination hospitals it was built from, so
//! response entries are paired back to hospitals through the request itself
//! rather than through a separately fetched address list.
//!
//! Wire format (Distance Matrix JSON):
//! `{"status": "OK", "rows": [{"elements": [{"status": "OK",
//!   "duration": {"value": secs}, "distance": {"value": meters}}]}]}`

use crate::domain::error::TransferError;
use crate::domain::hospital::{Hospital, HospitalCatalog};
use crate::domain::transfer::{Transfer, TransferId};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Log a lookup failure (cold path)
#[cold]
fn log_lookup_failed(ppn: TransferId, e: &LookupError) {
    error!(ppn = %ppn, error = %e, "matrix_lookup_error");
}

/// One origin against an ordered list of destination hospitals
#[derive(Debug, Clone)]
pub struct MatrixRequest {
    pub ppn: TransferId,
    pub origin_lat: f64,
    pub origin_lon: f64,
    destinations: Vec<Arc<Hospital>>,
}

impl MatrixRequest {
    /// Request every catalog hospital, in catalog order, from the transfer's pickup point
    pub fn for_catalog(catalog: &HospitalCatalog, transfer: &Transfer) -> Self {
        Self {
            ppn: transfer.id,
            origin_lat: transfer.pickup_lat,
            origin_lon: transfer.pickup_lon,
            destinations: catalog.iter().cloned().collect(),
        }
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.destinations.iter().map(|h| h.address.as_str())
    }

    pub fn origin(&self) -> String {
        format!("{},{}", self.origin_lat, self.origin_lon)
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    /// Zip response entries with this request's destinations.
    /// A length disagreement is a broken contract, never truncated.
    pub fn pair(
        &self,
        entries: &[MatrixEntry],
    ) -> Result<Vec<(Arc<Hospital>, MatrixEntry)>, TransferError> {
        if entries.len() != self.destinations.len() {
            return Err(TransferError::IndexMismatch {
                expected: self.destinations.len(),
                actual: entries.len(),
            });
        }
        Ok(self.destinations.iter().cloned().zip(entries.iter().copied()).collect())
    }
}

/// Travel figures for one destination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixEntry {
    pub travel_time_secs: f64,
    pub travel_distance_m: f64,
}

impl MatrixEntry {
    pub fn new(travel_time_secs: f64, travel_distance_m: f64) -> Self {
        Self { travel_time_secs, travel_distance_m }
    }
}

/// Top-level status reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixStatus {
    Ok,
    InvalidRequest,
    MaxElementsExceeded,
    MaxDimensionsExceeded,
    OverDailyLimit,
    OverQueryLimit,
    RequestDenied,
    UnknownError,
    Other(String),
}

impl std::str::FromStr for MatrixStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "OK" => MatrixStatus::Ok,
            "INVALID_REQUEST" => MatrixStatus::InvalidRequest,
            "MAX_ELEMENTS_EXCEEDED" => MatrixStatus::MaxElementsExceeded,
            "MAX_DIMENSIONS_EXCEEDED" => MatrixStatus::MaxDimensionsExceeded,
            "OVER_DAILY_LIMIT" => MatrixStatus::OverDailyLimit,
            "OVER_QUERY_LIMIT" => MatrixStatus::OverQueryLimit,
            "REQUEST_DENIED" => MatrixStatus::RequestDenied,
            "UNKNOWN_ERROR" => MatrixStatus::UnknownError,
            other => MatrixStatus::Other(other.to_string()),
        })
    }
}

impl MatrixStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MatrixStatus::Ok => "OK",
            MatrixStatus::InvalidRequest => "INVALID_REQUEST",
            MatrixStatus::MaxElementsExceeded => "MAX_ELEMENTS_EXCEEDED",
            MatrixStatus::MaxDimensionsExceeded => "MAX_DIMENSIONS_EXCEEDED",
            MatrixStatus::OverDailyLimit => "OVER_DAILY_LIMIT",
            MatrixStatus::OverQueryLimit => "OVER_QUERY_LIMIT",
            MatrixStatus::RequestDenied => "REQUEST_DENIED",
            MatrixStatus::UnknownError => "UNKNOWN_ERROR",
            MatrixStatus::Other(s) => s,
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        *self == MatrixStatus::Ok
    }
}

impl std::fmt::Display for MatrixStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded lookup result. Entries are only meaningful when `status` is OK.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixResponse {
    pub status: MatrixStatus,
    pub entries: Vec<MatrixEntry>,
}

impl MatrixResponse {
    pub fn ok(entries: Vec<MatrixEntry>) -> Self {
        Self { status: MatrixStatus::Ok, entries }
    }

    pub fn failed(status: MatrixStatus) -> Self {
        Self { status, entries: Vec::new() }
    }

    /// Decode the provider's JSON shape for a single-origin request
    pub fn from_wire(wire: WireResponse) -> Result<Self, LookupError> {
        let status = match wire.status.parse::<MatrixStatus>() {
            Ok(status) => status,
            Err(never) => match never {},
        };
        if !status.is_ok() {
            return Ok(Self::failed(status));
        }

        let row = wire
            .rows
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::Decode("response has no rows".to_string()))?;

        let entries = row
            .elements
            .into_iter()
            .enumerate()
            .map(|(index, element)| {
                if element.status != "OK" {
                    return Err(LookupError::Element { index, status: element.status });
                }
                match (element.duration, element.distance) {
                    (Some(duration), Some(distance)) => {
                        Ok(MatrixEntry::new(duration.value, distance.value))
                    }
                    _ => Err(LookupError::Decode(format!(
                        "element {} is missing duration or distance",
                        index
                    ))),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::ok(entries))
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("provider returned HTTP {0}")]
    HttpStatus(u16),

    #[error("element {index} has status {status}")]
    Element { index: usize, status: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Source of travel matrices. Implementations must be shareable across tasks.
#[async_trait]
pub trait MatrixLookup: Send + Sync {
    async fn lookup(&self, request: &MatrixRequest) -> Result<MatrixResponse, LookupError>;
}

/// Distance Matrix JSON body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireResponse {
    pub status: String,
    #[serde(default)]
    pub rows: Vec<WireRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRow {
    pub elements: Vec<WireElement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireElement {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<WireValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<WireValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireValue {
    pub value: f64,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct HttpMatrixConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for HttpMatrixConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://maps.googleapis.com/maps/api/distancematrix/json".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client for a Distance-Matrix-compatible endpoint
pub struct HttpMatrixClient {
    config: HttpMatrixConfig,
    client: reqwest::Client,
}

impl HttpMatrixClient {
    pub fn new(config: HttpMatrixConfig) -> anyhow::Result<Self> {
        // Create HTTP client once for reuse (connection pooling)
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build matrix HTTP client")?;
        Ok(Self { config, client })
    }

    /// Client-side timeouts count as timeouts, not transport failures
    fn transport_error(&self, e: reqwest::Error) -> LookupError {
        if e.is_timeout() {
            LookupError::Timeout(self.config.timeout)
        } else {
            LookupError::Http(e)
        }
    }

    async fn fetch(&self, request: &MatrixRequest) -> Result<MatrixResponse, LookupError> {
        // Providers reject an empty destination list
        if request.is_empty() {
            return Ok(MatrixResponse::ok(Vec::new()));
        }

        let destinations = request.addresses().collect::<Vec<_>>().join("|");
        let mut query = vec![("origins", request.origin()), ("destinations", destinations)];
        if let Some(key) = &self.config.api_key {
            query.push(("key", key.clone()));
        }

        debug!(
            ppn = %request.ppn,
            destinations = request.len(),
            endpoint = %self.config.endpoint,
            "matrix_lookup_sent"
        );

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::HttpStatus(status.as_u16()));
        }

        let wire: WireResponse = response.json().await.map_err(|e| self.transport_error(e))?;
        if let Some(message) = &wire.error_message {
            debug!(ppn = %request.ppn, status = %wire.status, message = %message, "matrix_provider_message");
        }
        MatrixResponse::from_wire(wire)
    }
}

#[async_trait]
impl MatrixLookup for HttpMatrixClient {
    async fn lookup(&self, request: &MatrixRequest) -> Result<MatrixResponse, LookupError> {
        let result = self.fetch(request).await;
        if let Err(e) = &result {
            log_lookup_failed(request.ppn, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hospital::Category;

    fn catalog() -> HospitalCatalog {
        [
            Hospital::new("A", "1 A St", Category::Trauma),
            Hospital::new("B", "2 B St", Category::Spinal),
            Hospital::new("C", "3 C St", Category::Trauma),
        ]
        .into_iter()
        .collect()
    }

    fn request() -> MatrixRequest {
        let catalog = catalog();
        let transfer = Transfer::resolve(TransferId(1), -33.9, 151.2, "B", &catalog).unwrap();
        MatrixRequest::for_catalog(&catalog, &transfer)
    }

    #[test]
    fn test_request_snapshots_catalog_order() {
        let request = request();
        let addresses: Vec<&str> = request.addresses().collect();
        assert_eq!(addresses, vec!["1 A St", "2 B St", "3 C St"]);
        assert_eq!(request.origin(), "-33.9,151.2");
    }

    #[tokio::test]
    async fn test_empty_request_skips_provider() {
        let catalog = catalog();
        let transfer = Transfer::resolve(TransferId(1), -33.9, 151.2, "B", &catalog).unwrap();
        let request = MatrixRequest::for_catalog(&HospitalCatalog::new(), &transfer);
        assert!(request.is_empty());

        // Nothing listens here; reaching the network would fail the lookup
        let client = HttpMatrixClient::new(HttpMatrixConfig {
            endpoint: "http://127.0.0.1:9/maps/api/distancematrix/json".to_string(),
            api_key: None,
            timeout: Duration::from_millis(200),
        })
        .unwrap();
        let response = client.lookup(&request).await.unwrap();
        assert!(response.status.is_ok());
        assert!(response.entries.is_empty());
    }

    #[test]
    fn test_pair_aligns_by_position() {
        let request = request();
        let entries =
            [MatrixEntry::new(1.0, 10.0), MatrixEntry::new(2.0, 20.0), MatrixEntry::new(3.0, 30.0)];
        let pairs = request.pair(&entries).unwrap();
        assert_eq!(pairs[1].0.name, "B");
        assert_eq!(pairs[1].1, MatrixEntry::new(2.0, 20.0));
    }

    #[test]
    fn test_pair_length_mismatch() {
        let request = request();
        let entries = [MatrixEntry::new(1.0, 10.0)];
        assert_eq!(
            request.pair(&entries).unwrap_err(),
            TransferError::IndexMismatch { expected: 3, actual: 1 }
        );
    }

    #[test]
    fn test_from_wire_ok() {
        let json = r#"{
            "status": "OK",
            "origin_addresses": ["x"],
            "destination_addresses": ["a", "b"],
            "rows": [{"elements": [
                {"status": "OK", "duration": {"value": 600, "text": "10 mins"}, "distance": {"value": 8000, "text": "8 km"}},
                {"status": "OK", "duration": {"value": 4000, "text": "67 mins"}, "distance": {"value": 52000, "text": "52 km"}}
            ]}]
        }"#;
        let wire: WireResponse = serde_json::from_str(json).unwrap();
        let response = MatrixResponse::from_wire(wire).unwrap();
        assert!(response.status.is_ok());
        assert_eq!(
            response.entries,
            vec![MatrixEntry::new(600.0, 8000.0), MatrixEntry::new(4000.0, 52000.0)]
        );
    }

    #[test]
    fn test_from_wire_non_ok_status() {
        let json = r#"{"status": "INVALID_REQUEST", "rows": []}"#;
        let wire: WireResponse = serde_json::from_str(json).unwrap();
        let response = MatrixResponse::from_wire(wire).unwrap();
        assert_eq!(response.status, MatrixStatus::InvalidRequest);
        assert!(response.entries.is_empty());
    }

    #[test]
    fn test_from_wire_unrecognized_status_kept_verbatim() {
        let json = r#"{"status": "ZERO_RESULTS", "rows": []}"#;
        let wire: WireResponse = serde_json::from_str(json).unwrap();
        let response = MatrixResponse::from_wire(wire).unwrap();
        assert_eq!(response.status, MatrixStatus::Other("ZERO_RESULTS".to_string()));
        assert_eq!(response.status.to_string(), "ZERO_RESULTS");
    }

    #[test]
    fn test_from_wire_element_not_found() {
        let json = r#"{"status": "OK", "rows": [{"elements": [{"status": "NOT_FOUND"}]}]}"#;
        let wire: WireResponse = serde_json::from_str(json).unwrap();
        let err = MatrixResponse::from_wire(wire).unwrap_err();
        assert!(matches!(err, LookupError::Element { index: 0, .. }));
    }

    #[test]
    fn test_from_wire_missing_rows() {
        let wire = WireResponse { status: "OK".to_string(), rows: vec![], error_message: None };
        assert!(matches!(MatrixResponse::from_wire(wire), Err(LookupError::Decode(_))));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("OK".parse::<MatrixStatus>().unwrap(), MatrixStatus::Ok);
        assert_eq!("REQUEST_DENIED".parse::<MatrixStatus>().unwrap(), MatrixStatus::RequestDenied);
        assert!(matches!("SOMETHING".parse::<MatrixStatus>().unwrap(), MatrixStatus::Other(_)));
    }
}
