//! Feasibility evaluation - which hospitals a transfer could have reached
//!
//! A hospital is feasible when its travel time is strictly below the
//! threshold, or when it is the transfer's assigned hospital. The assigned
//! hospital is kept whatever its time so reports always have a figure for the
//! hospital actually used.

use crate::domain::error::TransferError;
use crate::domain::transfer::{FeasibleTrip, Transfer};
use crate::io::matrix::{LookupError, MatrixRequest, MatrixResponse};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct FeasibilityEvaluator {
    threshold_secs: f64,
}

impl FeasibilityEvaluator {
    pub fn new(threshold_secs: f64) -> Self {
        Self { threshold_secs }
    }

    pub fn threshold_secs(&self) -> f64 {
        self.threshold_secs
    }

    /// Turn one lookup outcome into the transfer's feasible-trip list
    pub fn evaluate(
        &self,
        transfer: &Transfer,
        request: &MatrixRequest,
        outcome: Result<MatrixResponse, LookupError>,
    ) -> Result<Vec<FeasibleTrip>, TransferError> {
        let response = outcome
            .map_err(|e| TransferError::MatrixLookupFailed { reason: e.to_string() })?;

        if !response.status.is_ok() {
            return Err(TransferError::MatrixLookupFailed {
                reason: format!("status {}", response.status),
            });
        }

        let pairs = request.pair(&response.entries)?;

        let trips: Vec<FeasibleTrip> = pairs
            .into_iter()
            .filter(|(hospital, entry)| {
                entry.travel_time_secs < self.threshold_secs || *hospital == transfer.assigned
            })
            .map(|(hospital, entry)| {
                FeasibleTrip::new(hospital, entry.travel_time_secs, entry.travel_distance_m)
            })
            .collect();

        debug!(
            ppn = %transfer.id,
            candidates = request.len(),
            feasible = trips.len(),
            threshold_secs = self.threshold_secs,
            "transfer_evaluated"
        );

        Ok(trips)
    }
}
