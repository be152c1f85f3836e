//! Run summary - what happened to every input transfer

use crate::domain::error::TransferError;
use crate::domain::transfer::{EvaluatedTransfer, TransferId};
use crate::infra::metrics::MetricsSummary;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

/// A transfer whose lookup or evaluation failed
#[derive(Debug, Clone, Serialize)]
pub struct FailedTransfer {
    pub ppn: TransferId,
    pub error: TransferError,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub build: String,
    pub started_at: String,
    pub threshold_secs: f64,
    pub hospitals: usize,
    /// Rows read, including skipped ones
    pub transfers_total: usize,
    pub transfers_evaluated: usize,
    /// Rows that never became transfers
    pub skipped: Vec<TransferError>,
    pub failed: Vec<FailedTransfer>,
    /// Categories without a feasible alternative, per evaluated transfer
    pub missing_nearest: Vec<TransferError>,
    pub metrics: MetricsSummary,
}

/// Identity and start time of a run
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub started_at: OffsetDateTime,
}

impl RunInfo {
    pub fn start() -> Self {
        Self { run_id: Uuid::now_v7(), started_at: OffsetDateTime::now_utc() }
    }

    pub fn started_at_rfc3339(&self) -> String {
        self.started_at.format(&Rfc3339).unwrap_or_else(|_| self.started_at.to_string())
    }
}

impl RunSummary {
    pub fn build(
        run: &RunInfo,
        threshold_secs: f64,
        hospitals: usize,
        evaluated: &[EvaluatedTransfer],
        skipped: Vec<TransferError>,
        missing_nearest: Vec<TransferError>,
        metrics: MetricsSummary,
    ) -> Self {
        let mut failed: Vec<FailedTransfer> = evaluated
            .iter()
            .filter_map(|t| t.failure().map(|e| FailedTransfer { ppn: t.id(), error: e.clone() }))
            .collect();
        failed.sort_by_key(|f| f.ppn);

        Self {
            run_id: run.run_id,
            build: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
            started_at: run.started_at_rfc3339(),
            threshold_secs,
            hospitals,
            transfers_total: evaluated.len() + skipped.len(),
            transfers_evaluated: evaluated.len() - failed.len(),
            skipped,
            failed,
            missing_nearest,
            metrics,
        }
    }

    pub fn failed_ids(&self) -> Vec<TransferId> {
        self.failed.iter().map(|f| f.ppn).collect()
    }

    pub fn skipped_ids(&self) -> Vec<TransferId> {
        self.skipped
            .iter()
            .filter_map(|e| match e {
                TransferError::UnresolvedAssignedHospital { ppn, .. } => Some(*ppn),
                _ => None,
            })
            .collect()
    }

    pub fn log(&self) {
        info!(
            run_id = %self.run_id,
            transfers_total = %self.transfers_total,
            transfers_evaluated = %self.transfers_evaluated,
            skipped = %self.skipped.len(),
            failed = %self.failed.len(),
            missing_nearest = %self.missing_nearest.len(),
            "run_summary"
        );
        if !self.skipped.is_empty() {
            warn!(ppns = ?self.skipped_ids(), "transfers_skipped");
        }
        if !self.failed.is_empty() {
            warn!(ppns = ?self.failed_ids(), "transfers_failed");
        }
        self.metrics.log();
    }
}
