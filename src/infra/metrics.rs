//! Lock-free run metrics
//!
//! Counters are shared by all in-flight lookups and updated with atomics.
//!
//! NOTE: All atomics use Relaxed ordering intentionally—these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use crate::domain::error::TransferError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Lookup latency bucket boundaries (milliseconds)
/// Buckets: ≤50, ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, >25600
const BUCKET_BOUNDS_MS: [u64; 10] = [50, 100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600];
const NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_ms: u64) -> usize {
    BUCKET_BOUNDS_MS.partition_point(|&bound| bound < latency_ms)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = ((total as f64 * percentile).ceil() as u64).max(1);
    let mut cumulative = 0u64;

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
    const BUCKET_UPPER_BOUNDS_MS: [u64; NUM_BUCKETS] =
        [50, 100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS_MS[i];
        }
    }
    BUCKET_UPPER_BOUNDS_MS[NUM_BUCKETS - 1]
}

/// Counters for one batch run
pub struct RunMetrics {
    /// Lookups issued (including ones that later failed)
    lookups_total: AtomicU64,
    /// Non-success status or transport error
    lookups_failed: AtomicU64,
    /// Lookups cut off by the per-call timeout
    lookup_timeouts: AtomicU64,
    /// Responses whose length disagreed with the request
    index_mismatches: AtomicU64,
    /// Transfers with a feasible set
    transfers_evaluated: AtomicU64,
    /// Sum of feasible trips across evaluated transfers
    feasible_trips_total: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_max_ms: AtomicU64,
    latency_buckets: [AtomicU64; NUM_BUCKETS],
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            lookups_total: AtomicU64::new(0),
            lookups_failed: AtomicU64::new(0),
            lookup_timeouts: AtomicU64::new(0),
            index_mismatches: AtomicU64::new(0),
            transfers_evaluated: AtomicU64::new(0),
            feasible_trips_total: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_max_ms: AtomicU64::new(0),
            latency_buckets: Default::default(),
        }
    }

    /// Record a completed lookup call (success or not)
    pub fn record_lookup(&self, latency_ms: u64) {
        self.lookups_total.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_ms, latency_ms);
        self.latency_buckets[bucket_index(latency_ms)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.lookup_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evaluated(&self, feasible: usize) {
        self.transfers_evaluated.fetch_add(1, Ordering::Relaxed);
        self.feasible_trips_total.fetch_add(feasible as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self, error: &TransferError) {
        match error {
            TransferError::IndexMismatch { .. } => {
                self.index_mismatches.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.lookups_failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn lookups_total(&self) -> u64 {
        self.lookups_total.load(Ordering::Relaxed)
    }

    /// Snapshot without resetting; a run reports once at the end
    pub fn report(&self) -> MetricsSummary {
        let lookups_total = self.lookups_total.load(Ordering::Relaxed);
        let transfers_evaluated = self.transfers_evaluated.load(Ordering::Relaxed);
        let feasible_trips_total = self.feasible_trips_total.load(Ordering::Relaxed);
        let latency_sum_ms = self.latency_sum_ms.load(Ordering::Relaxed);

        let mut buckets = [0u64; NUM_BUCKETS];
        for (i, bucket) in self.latency_buckets.iter().enumerate() {
            buckets[i] = bucket.load(Ordering::Relaxed);
        }

        MetricsSummary {
            lookups_total,
            lookups_failed: self.lookups_failed.load(Ordering::Relaxed),
            lookup_timeouts: self.lookup_timeouts.load(Ordering::Relaxed),
            index_mismatches: self.index_mismatches.load(Ordering::Relaxed),
            transfers_evaluated,
            feasible_trips_total,
            avg_feasible_per_transfer: if transfers_evaluated > 0 {
                feasible_trips_total as f64 / transfers_evaluated as f64
            } else {
                0.0
            },
            avg_lookup_ms: if lookups_total > 0 { latency_sum_ms / lookups_total } else { 0 },
            max_lookup_ms: self.latency_max_ms.load(Ordering::Relaxed),
            lookup_p50_ms: percentile_from_buckets(&buckets, 0.50),
            lookup_p99_ms: percentile_from_buckets(&buckets, 0.99),
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of `RunMetrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub lookups_total: u64,
    pub lookups_failed: u64,
    pub lookup_timeouts: u64,
    pub index_mismatches: u64,
    pub transfers_evaluated: u64,
    pub feasible_trips_total: u64,
    pub avg_feasible_per_transfer: f64,
    pub avg_lookup_ms: u64,
    pub max_lookup_ms: u64,
    pub lookup_p50_ms: u64,
    pub lookup_p99_ms: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            lookups_total = %self.lookups_total,
            lookups_failed = %self.lookups_failed,
            lookup_timeouts = %self.lookup_timeouts,
            index_mismatches = %self.index_mismatches,
            transfers_evaluated = %self.transfers_evaluated,
            avg_feasible = format!("{:.1}", self.avg_feasible_per_transfer),
            avg_lookup_ms = %self.avg_lookup_ms,
            max_lookup_ms = %self.max_lookup_ms,
            p50_ms = %self.lookup_p50_ms,
            p99_ms = %self.lookup_p99_ms,
            "metrics"
        );
    }
}
