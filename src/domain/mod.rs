//! Domain models - hospitals, transfers and evaluation results
//!
//! - `Hospital` / `HospitalCatalog` - ordered reference set of destinations
//! - `Transfer` - one ambulance movement with its assigned hospital
//! - `FeasibleTrip` / `EvaluatedTransfer` - evaluation output
//! - `TransferError` - per-transfer failure taxonomy

pub mod error;
pub mod hospital;
pub mod transfer;

// Re-export commonly used types at module level
pub use error::TransferError;
pub use hospital::{Category, Hospital, HospitalCatalog};
pub use transfer::{EvaluatedTransfer, FeasibleTrip, Transfer, TransferId};
