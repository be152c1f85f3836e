//! Batch pipeline - evaluates every transfer against the frozen catalog
//!
//! Lookups run with bounded concurrency. Each call carries its own
//! `MatrixRequest`, so completion order does not affect attribution. A failed
//! or timed-out lookup marks only its own transfer and the batch continues.

use crate::domain::error::TransferError;
use crate::domain::hospital::HospitalCatalog;
use crate::domain::transfer::{EvaluatedTransfer, Transfer, TransferId};
use crate::infra::config::Config;
use crate::infra::metrics::RunMetrics;
use crate::io::ingest::{self, HospitalRules};
use crate::io::matrix::{LookupError, MatrixLookup, MatrixRequest};
use crate::io::report::ReportWriter;
use crate::services::aggregator::TransferAggregator;
use crate::services::evaluator::FeasibilityEvaluator;
use crate::services::summary::{RunInfo, RunSummary};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Log an isolated per-transfer failure (cold path)
#[cold]
fn log_transfer_failed(ppn: TransferId, e: &TransferError) {
    warn!(ppn = %ppn, kind = e.kind(), error = %e, "transfer_evaluation_failed");
}

pub struct BatchRunner<L: MatrixLookup + ?Sized> {
    lookup: Arc<L>,
    catalog: Arc<HospitalCatalog>,
    evaluator: FeasibilityEvaluator,
    concurrency: usize,
    timeout: Duration,
    metrics: Arc<RunMetrics>,
}

impl<L: MatrixLookup + ?Sized> BatchRunner<L> {
    pub fn new(lookup: Arc<L>, catalog: Arc<HospitalCatalog>, evaluator: FeasibilityEvaluator) -> Self {
        Self {
            lookup,
            catalog,
            evaluator,
            concurrency: 1,
            timeout: Duration::from_secs(10),
            metrics: Arc::new(RunMetrics::new()),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn metrics(&self) -> &Arc<RunMetrics> {
        &self.metrics
    }

    /// Look up and evaluate one transfer. Never fails; failures are recorded
    /// on the returned transfer.
    pub async fn evaluate_one(&self, transfer: Transfer) -> EvaluatedTransfer {
        let request = MatrixRequest::for_catalog(&self.catalog, &transfer);

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.lookup.lookup(&request))
            .await
            .unwrap_or(Err(LookupError::Timeout(self.timeout)));
        // Either our deadline or the lookup's own client-side one
        if matches!(outcome, Err(LookupError::Timeout(_))) {
            self.metrics.record_timeout();
        }
        self.metrics.record_lookup(start.elapsed().as_millis() as u64);

        let result = self.evaluator.evaluate(&transfer, &request, outcome);
        match &result {
            Ok(trips) => self.metrics.record_evaluated(trips.len()),
            Err(e) => {
                self.metrics.record_failure(e);
                log_transfer_failed(transfer.id, e);
            }
        }

        EvaluatedTransfer::from_outcome(transfer, result)
    }

    /// Evaluate all transfers. Output order follows completion; the aggregator
    /// imposes id order.
    pub async fn run(&self, transfers: Vec<Transfer>) -> Vec<EvaluatedTransfer> {
        info!(
            transfers = transfers.len(),
            hospitals = self.catalog.len(),
            concurrency = self.concurrency,
            timeout_ms = self.timeout.as_millis() as u64,
            threshold_secs = self.evaluator.threshold_secs(),
            "batch_started"
        );

        stream::iter(transfers)
            .map(|transfer| self.evaluate_one(transfer))
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }
}

/// Full run: ingest, evaluate, aggregate, write reports
pub async fn run_batch<L: MatrixLookup + ?Sized>(
    config: &Config,
    lookup: Arc<L>,
) -> anyhow::Result<RunSummary> {
    let run = RunInfo::start();
    info!(run_id = %run.run_id, input = %config.transfers_file(), "run_started");

    let rules = HospitalRules::new(config.hospital_name_suffix(), config.spinal_hospitals());
    let ingested = ingest::load(config.transfers_file(), &rules)?;

    // Frozen before fan-out; every request snapshots this order
    let catalog = Arc::new(ingested.catalog);

    let evaluator = FeasibilityEvaluator::new(config.threshold_secs());
    let runner = BatchRunner::new(lookup, catalog.clone(), evaluator)
        .with_concurrency(config.matrix_concurrency())
        .with_timeout(config.matrix_timeout());

    let evaluated = runner.run(ingested.transfers).await;

    let aggregator = TransferAggregator::new(&evaluated);
    let writer = ReportWriter::new(config.json_file(), config.csv_file(), config.summary_file());
    writer.write_nested(&aggregator.nested_report())?;
    writer.write_flat(&aggregator.flat_rows())?;

    let summary = RunSummary::build(
        &run,
        config.threshold_secs(),
        catalog.len(),
        &evaluated,
        ingested.skipped,
        aggregator.missing_categories(),
        runner.metrics().report(),
    );
    writer.write_summary(&summary)?;

    Ok(summary)
}
