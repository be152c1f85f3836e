//! IO layer - input files, the travel-matrix provider and report output
//!
//! - `ingest` - CSV transfer records, hospital catalog scraping
//! - `matrix` - `MatrixLookup` trait and the HTTP Distance Matrix client
//! - `mock_matrix` - local stand-in for the provider
//! - `report` - nested JSON, flat CSV and run summary writers

pub mod ingest;
pub mod matrix;
pub mod mock_matrix;
pub mod report;

pub use ingest::{HospitalRules, Ingested};
pub use matrix::{
    HttpMatrixClient, HttpMatrixConfig, LookupError, MatrixEntry, MatrixLookup, MatrixRequest,
    MatrixResponse, MatrixStatus,
};
pub use mock_matrix::MockMatrixConfig;
pub use report::ReportWriter;
