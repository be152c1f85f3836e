//! Report output - nested JSON document, flat CSV and run summary
//!
//! Each file is rewritten in full on every run. Parent directories are
//! created as needed.

use crate::services::aggregator::{FlatRow, NestedReport};
use crate::services::summary::RunSummary;
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct ReportWriter {
    json_path: PathBuf,
    csv_path: PathBuf,
    summary_path: PathBuf,
}

impl ReportWriter {
    pub fn new(json_path: &str, csv_path: &str, summary_path: &str) -> Self {
        info!(json = %json_path, csv = %csv_path, summary = %summary_path, "report_writer_initialized");
        Self {
            json_path: PathBuf::from(json_path),
            csv_path: PathBuf::from(csv_path),
            summary_path: PathBuf::from(summary_path),
        }
    }

    pub fn write_nested(&self, report: &NestedReport<'_>) -> anyhow::Result<()> {
        write_json(&self.json_path, report)?;
        info!(
            file = %self.json_path.display(),
            transfers = report.transfers.len(),
            "nested_report_written"
        );
        Ok(())
    }

    pub fn write_flat(&self, rows: &[FlatRow]) -> anyhow::Result<()> {
        let file = create(&self.csv_path)?;
        let mut writer = csv::Writer::from_writer(file);
        for row in rows {
            writer
                .serialize(row)
                .with_context(|| format!("Failed to write row for ppn {}", row.ppn))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.csv_path.display()))?;
        info!(file = %self.csv_path.display(), rows = rows.len(), "flat_report_written");
        Ok(())
    }

    pub fn write_summary(&self, summary: &RunSummary) -> anyhow::Result<()> {
        write_json(&self.summary_path, summary)?;
        info!(file = %self.summary_path.display(), run_id = %summary.run_id, "summary_written");
        Ok(())
    }
}

/// Read a flat report back (used for verification and downstream joins)
pub fn read_flat<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<FlatRow>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        rows.push(result.with_context(|| format!("Malformed row in {}", path.display()))?);
    }
    Ok(rows)
}

fn create(path: &Path) -> anyhow::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    File::create(path).with_context(|| format!("Failed to create {}", path.display()))
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let mut writer = BufWriter::new(create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    writeln!(writer)?;
    writer.flush().with_context(|| format!("Failed to flush {}", path.display()))?;
    debug!(file = %path.display(), "json_written");
    Ok(())
}
