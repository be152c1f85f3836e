//! Per-transfer failure taxonomy
//!
//! None of these abort a batch. They are recorded against the transfer and
//! surfaced in the run summary.

use crate::domain::hospital::Category;
use crate::domain::transfer::TransferId;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferError {
    /// Declared destination has no catalog entry
    #[error("transfer {ppn}: assigned hospital '{name}' is not in the catalog")]
    UnresolvedAssignedHospital { ppn: TransferId, name: String },

    /// Lookup returned a non-success status, failed in transport or timed out
    #[error("matrix lookup failed: {reason}")]
    MatrixLookupFailed { reason: String },

    /// Response entry count disagrees with the request's destinations
    #[error("matrix response has {actual} entries, expected {expected}")]
    IndexMismatch { expected: usize, actual: usize },

    /// No feasible trip of the category besides the assigned hospital
    #[error("transfer {ppn}: no feasible {category} hospital")]
    NoQualifyingHospital { ppn: TransferId, category: Category },
}

impl TransferError {
    pub fn kind(&self) -> &'static str {
        match self {
            TransferError::UnresolvedAssignedHospital { .. } => "unresolved_assigned_hospital",
            TransferError::MatrixLookupFailed { .. } => "matrix_lookup_failed",
            TransferError::IndexMismatch { .. } => "index_mismatch",
            TransferError::NoQualifyingHospital { .. } => "no_qualifying_hospital",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TransferError::IndexMismatch { expected: 3, actual: 2 };
        assert_eq!(err.to_string(), "matrix response has 2 entries, expected 3");

        let err = TransferError::UnresolvedAssignedHospital {
            ppn: TransferId(42),
            name: "Nowhere".to_string(),
        };
        assert!(err.to_string().contains("Nowhere"));
        assert_eq!(err.kind(), "unresolved_assigned_hospital");
    }

    #[test]
    fn test_serialize_tagged() {
        let err = TransferError::NoQualifyingHospital { ppn: TransferId(7), category: Category::Spinal };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "no_qualifying_hospital");
        assert_eq!(value["ppn"], 7);
        assert_eq!(value["category"], "spinal");
    }
}
