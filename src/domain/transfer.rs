//! Ambulance transfers and their evaluation results

use crate::domain::error::TransferError;
use crate::domain::hospital::{serialize_display_name, Category, Hospital, HospitalCatalog};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Newtype wrapper for the external transfer identifier (`ppn`).
/// Ordering is numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TransferId(pub u64);

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransferId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(TransferId)
    }
}

/// One ambulance transfer with its historically assigned destination
#[derive(Debug, Clone)]
pub struct Transfer {
    pub id: TransferId,
    pub pickup_lat: f64,
    pub pickup_lon: f64,
    pub assigned: Arc<Hospital>,
}

impl Transfer {
    /// Build a transfer, resolving the assigned hospital by cleaned name
    pub fn resolve(
        id: TransferId,
        pickup_lat: f64,
        pickup_lon: f64,
        assigned_name: &str,
        catalog: &HospitalCatalog,
    ) -> Result<Self, TransferError> {
        let assigned = catalog.by_name(assigned_name).cloned().ok_or_else(|| {
            TransferError::UnresolvedAssignedHospital { ppn: id, name: assigned_name.to_string() }
        })?;
        Ok(Self { id, pickup_lat, pickup_lon, assigned })
    }
}

impl std::fmt::Display for Transfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Transfer {} of ({}, {}) was delivered to {}",
            self.id, self.pickup_lat, self.pickup_lon, self.assigned
        )
    }
}

/// A hospital judged reachable (or retained as the assigned destination)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeasibleTrip {
    #[serde(serialize_with = "serialize_display_name")]
    pub hospital: Arc<Hospital>,
    #[serde(rename = "time")]
    pub travel_time_secs: f64,
    #[serde(rename = "distance")]
    pub travel_distance_m: f64,
}

impl FeasibleTrip {
    pub fn new(hospital: Arc<Hospital>, travel_time_secs: f64, travel_distance_m: f64) -> Self {
        Self { hospital, travel_time_secs, travel_distance_m }
    }

    #[inline]
    pub fn time_minutes(&self) -> f64 {
        self.travel_time_secs / 60.0
    }

    #[inline]
    pub fn distance_km(&self) -> f64 {
        self.travel_distance_m / 1000.0
    }
}

/// A transfer after feasibility evaluation.
///
/// Trips are in catalog order. When `failure` is set the trip list is empty.
#[derive(Debug, Clone)]
pub struct EvaluatedTransfer {
    pub transfer: Transfer,
    trips: Vec<FeasibleTrip>,
    failure: Option<TransferError>,
}

impl EvaluatedTransfer {
    pub fn from_outcome(transfer: Transfer, outcome: Result<Vec<FeasibleTrip>, TransferError>) -> Self {
        match outcome {
            Ok(trips) => Self { transfer, trips, failure: None },
            Err(e) => Self { transfer, trips: Vec::new(), failure: Some(e) },
        }
    }

    #[inline]
    pub fn id(&self) -> TransferId {
        self.transfer.id
    }

    pub fn trips(&self) -> &[FeasibleTrip] {
        &self.trips
    }

    pub fn failure(&self) -> Option<&TransferError> {
        self.failure.as_ref()
    }

    /// Trip to the hospital the transfer actually went to
    pub fn first_hospital(&self) -> Option<&FeasibleTrip> {
        self.trips.iter().find(|t| t.hospital == self.transfer.assigned)
    }

    /// Feasible trips of one category, excluding the assigned hospital
    pub fn alternatives(&self, category: Category) -> impl Iterator<Item = &FeasibleTrip> {
        let assigned = &self.transfer.assigned;
        self.trips
            .iter()
            .filter(move |t| t.hospital.is_category(category) && t.hospital != *assigned)
    }
}
