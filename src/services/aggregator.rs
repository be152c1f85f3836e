//! Aggregation of evaluated transfers into report views
//!
//! Two shapes are produced, both ordered by ascending numeric transfer id:
//! - nested report: raw seconds/meters, full per-category alternative lists
//! - flat rows: one line per transfer with the assigned hospital and the
//!   nearest trauma/spinal alternative, in minutes and kilometers

use crate::domain::error::TransferError;
use crate::domain::hospital::{Category, Hospital};
use crate::domain::transfer::{EvaluatedTransfer, FeasibleTrip, TransferId};
use serde::{Deserialize, Serialize};

/// Nearest trip of a category, excluding the assigned hospital.
///
/// Ranked by distance. Equal distances resolve to the earliest trip in
/// catalog order.
pub fn nearest<'a>(
    trips: &'a [FeasibleTrip],
    assigned: &Hospital,
    category: Category,
) -> Option<&'a FeasibleTrip> {
    trips
        .iter()
        .filter(|t| t.hospital.is_category(category) && t.hospital.as_ref() != assigned)
        .min_by(|a, b| a.travel_distance_m.total_cmp(&b.travel_distance_m))
}

#[derive(Debug, Serialize)]
pub struct NestedReport<'a> {
    #[serde(rename = "Ambulance Transfers")]
    pub transfers: Vec<NestedEntry<'a>>,
}

#[derive(Debug, Serialize)]
pub struct NestedEntry<'a> {
    pub ppn: TransferId,
    pub pickup_lat: f64,
    #[serde(rename = "pickup_long")]
    pub pickup_lon: f64,
    #[serde(rename = "Calculated Transfers")]
    pub calculated: CalculatedTransfers<'a>,
}

#[derive(Debug, Serialize)]
pub struct CalculatedTransfers<'a> {
    #[serde(rename = "First Hospital")]
    pub first_hospital: Option<&'a FeasibleTrip>,
    #[serde(rename = "Trauma Hospitals")]
    pub trauma_hospitals: Vec<&'a FeasibleTrip>,
    #[serde(rename = "Spinal Specialist Hospitals")]
    pub spinal_hospitals: Vec<&'a FeasibleTrip>,
}

/// One tabular report line. Empty cells mean "not available".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    pub ppn: TransferId,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub assigned_hospital: String,
    pub time_to_assigned_min: Option<f64>,
    pub distance_to_assigned_km: Option<f64>,
    pub nearest_trauma_hospital: Option<String>,
    pub time_to_nearest_trauma_min: Option<f64>,
    pub distance_to_nearest_trauma_km: Option<f64>,
    pub nearest_spinal_hospital: Option<String>,
    pub time_to_nearest_spinal_min: Option<f64>,
    pub distance_to_nearest_spinal_km: Option<f64>,
}

pub struct TransferAggregator<'a> {
    transfers: Vec<&'a EvaluatedTransfer>,
}

impl<'a> TransferAggregator<'a> {
    pub fn new(evaluated: &'a [EvaluatedTransfer]) -> Self {
        let mut transfers: Vec<&EvaluatedTransfer> = evaluated.iter().collect();
        transfers.sort_by_key(|t| t.id());
        Self { transfers }
    }

    /// Transfers in report order
    pub fn iter(&self) -> impl Iterator<Item = &'a EvaluatedTransfer> + '_ {
        self.transfers.iter().copied()
    }

    pub fn nested_report(&self) -> NestedReport<'a> {
        let transfers = self
            .transfers
            .iter()
            .map(|&evaluated| NestedEntry {
                ppn: evaluated.id(),
                pickup_lat: evaluated.transfer.pickup_lat,
                pickup_lon: evaluated.transfer.pickup_lon,
                calculated: CalculatedTransfers {
                    first_hospital: evaluated.first_hospital(),
                    trauma_hospitals: evaluated.alternatives(Category::Trauma).collect(),
                    spinal_hospitals: evaluated.alternatives(Category::Spinal).collect(),
                },
            })
            .collect();
        NestedReport { transfers }
    }

    pub fn flat_rows(&self) -> Vec<FlatRow> {
        self.transfers.iter().map(|&evaluated| flat_row(evaluated)).collect()
    }

    /// Categories with no qualifying alternative, per successfully evaluated transfer
    pub fn missing_categories(&self) -> Vec<TransferError> {
        let mut missing = Vec::new();
        for evaluated in self.transfers.iter().filter(|t| t.failure().is_none()) {
            for category in [Category::Trauma, Category::Spinal] {
                if nearest(evaluated.trips(), &evaluated.transfer.assigned, category).is_none() {
                    missing.push(TransferError::NoQualifyingHospital { ppn: evaluated.id(), category });
                }
            }
        }
        missing
    }
}

fn flat_row(evaluated: &EvaluatedTransfer) -> FlatRow {
    let transfer = &evaluated.transfer;
    let first = evaluated.first_hospital();
    let trauma = nearest(evaluated.trips(), &transfer.assigned, Category::Trauma);
    let spinal = nearest(evaluated.trips(), &transfer.assigned, Category::Spinal);

    FlatRow {
        ppn: transfer.id,
        pickup_latitude: transfer.pickup_lat,
        pickup_longitude: transfer.pickup_lon,
        assigned_hospital: transfer.assigned.name.clone(),
        time_to_assigned_min: first.map(FeasibleTrip::time_minutes),
        distance_to_assigned_km: first.map(FeasibleTrip::distance_km),
        nearest_trauma_hospital: trauma.map(|t| t.hospital.name.clone()),
        time_to_nearest_trauma_min: trauma.map(FeasibleTrip::time_minutes),
        distance_to_nearest_trauma_km: trauma.map(FeasibleTrip::distance_km),
        nearest_spinal_hospital: spinal.map(|t| t.hospital.name.clone()),
        time_to_nearest_spinal_min: spinal.map(FeasibleTrip::time_minutes),
        distance_to_nearest_spinal_km: spinal.map(FeasibleTrip::distance_km),
    }
}
