//! CSV ingestion of transfer records
//!
//! One file feeds both the hospital catalog (scraped from the destination
//! columns, first occurrence of a cleaned name wins) and the transfers.
//!
//! Expected header: `ppn, pickup_latitude, pickup_longitude,
//! destination_name, first_hosp_address`. Extra columns are ignored.

use crate::domain::error::TransferError;
use crate::domain::hospital::{Category, Hospital, HospitalCatalog};
use crate::domain::transfer::{Transfer, TransferId};
use anyhow::{bail, Context};
use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Raw input row, fields kept as text until validated
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRow {
    pub ppn: String,
    pub pickup_latitude: String,
    pub pickup_longitude: String,
    pub destination_name: String,
    pub first_hosp_address: String,
}

/// Name cleanup and specialty classification applied during ingestion
#[derive(Debug, Clone)]
pub struct HospitalRules {
    name_suffix: String,
    spinal: FxHashSet<String>,
}

impl Default for HospitalRules {
    fn default() -> Self {
        Self::new(" Hosp", &["Royal North Shore".to_string(), "Prince of Wales".to_string()])
    }
}

impl HospitalRules {
    pub fn new(name_suffix: &str, spinal: &[String]) -> Self {
        Self { name_suffix: name_suffix.to_string(), spinal: spinal.iter().cloned().collect() }
    }

    /// Trim and drop the trailing suffix (e.g. "Westmead Hosp" -> "Westmead")
    pub fn clean_name(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if self.name_suffix.is_empty() {
            return trimmed.to_string();
        }
        trimmed.strip_suffix(self.name_suffix.as_str()).unwrap_or(trimmed).trim_end().to_string()
    }

    pub fn classify(&self, cleaned_name: &str) -> Category {
        if self.spinal.contains(cleaned_name) {
            Category::Spinal
        } else {
            Category::Trauma
        }
    }
}

/// Result of ingesting one file
#[derive(Debug)]
pub struct Ingested {
    pub catalog: HospitalCatalog,
    pub transfers: Vec<Transfer>,
    /// Rows that could not become transfers
    pub skipped: Vec<TransferError>,
}

pub fn read_rows<R: Read>(reader: R) -> anyhow::Result<Vec<TransferRow>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for (i, result) in csv_reader.deserialize::<TransferRow>().enumerate() {
        // header is line 1
        let row = result.with_context(|| format!("Malformed transfer row at line {}", i + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_rows_from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<TransferRow>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open transfers file {}", path.display()))?;
    read_rows(file).with_context(|| format!("Failed to read transfers file {}", path.display()))
}

/// Build the catalog from the destination columns, deduplicated by cleaned name.
///
/// A named destination without an address is fatal: every lookup sends the
/// whole catalog, so one blank address would fail them all.
pub fn scrape_catalog(rows: &[TransferRow], rules: &HospitalRules) -> anyhow::Result<HospitalCatalog> {
    let mut seen = FxHashSet::default();
    let mut catalog = HospitalCatalog::new();
    for (i, row) in rows.iter().enumerate() {
        let name = rules.clean_name(&row.destination_name);
        if name.is_empty() || !seen.insert(name.clone()) {
            continue;
        }
        let address = row.first_hosp_address.trim();
        if address.is_empty() {
            bail!("Hospital '{}' has no first_hosp_address at line {}", name, i + 2);
        }
        let category = rules.classify(&name);
        catalog.add(Hospital::new(name, address, category));
    }
    Ok(catalog)
}

/// Turn rows into transfers against a built catalog.
///
/// Malformed ids/coordinates and duplicate ids are fatal. An assigned
/// hospital missing from the catalog skips only that row.
pub fn build_transfers(
    rows: &[TransferRow],
    catalog: &HospitalCatalog,
    rules: &HospitalRules,
) -> anyhow::Result<(Vec<Transfer>, Vec<TransferError>)> {
    let mut seen = FxHashSet::default();
    let mut transfers = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let line = i + 2;
        let id: TransferId = row
            .ppn
            .parse()
            .with_context(|| format!("Invalid ppn '{}' at line {}", row.ppn, line))?;
        let lat = parse_coordinate(&row.pickup_latitude, -90.0, 90.0)
            .with_context(|| format!("Invalid pickup_latitude for ppn {} at line {}", id, line))?;
        let lon = parse_coordinate(&row.pickup_longitude, -180.0, 180.0)
            .with_context(|| format!("Invalid pickup_longitude for ppn {} at line {}", id, line))?;

        if !seen.insert(id) {
            bail!("Duplicate ppn {} at line {}", id, line);
        }

        let name = rules.clean_name(&row.destination_name);
        match Transfer::resolve(id, lat, lon, &name, catalog) {
            Ok(transfer) => transfers.push(transfer),
            Err(e) => {
                warn!(ppn = %id, destination = %name, "transfer_skipped_unresolved_hospital");
                skipped.push(e);
            }
        }
    }

    Ok((transfers, skipped))
}

fn parse_coordinate(raw: &str, min: f64, max: f64) -> anyhow::Result<f64> {
    let value: f64 = raw.trim().parse().with_context(|| format!("'{}' is not a number", raw))?;
    if !value.is_finite() || value < min || value > max {
        bail!("{} is outside [{}, {}]", value, min, max);
    }
    Ok(value)
}

/// Read a transfers file and build both the catalog and the transfers
pub fn load<P: AsRef<Path>>(path: P, rules: &HospitalRules) -> anyhow::Result<Ingested> {
    let path = path.as_ref();
    let rows = read_rows_from_path(path)?;
    ingest_rows(&rows, rules).with_context(|| format!("Failed to ingest {}", path.display()))
}

pub fn ingest_rows(rows: &[TransferRow], rules: &HospitalRules) -> anyhow::Result<Ingested> {
    let catalog = scrape_catalog(rows, rules)?;
    if catalog.is_empty() {
        bail!("No hospitals found in input");
    }

    let (transfers, skipped) = build_transfers(rows, &catalog, rules)?;

    info!(
        rows = rows.len(),
        hospitals = catalog.len(),
        spinal = catalog.by_category(Category::Spinal).len(),
        transfers = transfers.len(),
        skipped = skipped.len(),
        "transfers_ingested"
    );

    Ok(Ingested { catalog, transfers, skipped })
}
