//! Business logic - feasibility evaluation, aggregation and the batch run

pub mod aggregator;
pub mod evaluator;
pub mod pipeline;
pub mod summary;

pub use aggregator::{FlatRow, NestedReport, TransferAggregator};
pub use evaluator::FeasibilityEvaluator;
pub use pipeline::{run_batch, BatchRunner};
pub use summary::{RunInfo, RunSummary};
