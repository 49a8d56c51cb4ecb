//! Walk-forward epoch selection engine.
//!
//! Runs the sequential fold scan: split, read the carried posterior for
//! test scoring, sweep the epoch grid, pick the validation-optimal
//! candidate, then fold its observation into the posterior for future
//! folds.

pub mod runner;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bayes::CarryForwardError;
use crate::frontier::EpochCandidate;
use crate::metrics::{OosMetrics, TestSeries};
use crate::split::{Fold, SplitError};

pub use runner::{AggregateReport, EpochSelectionEngine, SelectionRun};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no folds supplied")]
    NoFolds,

    #[error("split error: {0}")]
    Split(#[from] SplitError),

    #[error("carry-forward error: {0}")]
    CarryForward(#[from] CarryForwardError),
}

/// What the external trainer reports for one `(fold, epoch)` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingOutcome {
    /// In-sample Sharpe-like statistic on the train partition.
    pub is_statistic: f64,
    /// Out-of-sample Sharpe-like statistic on the validation partition.
    pub oos_statistic: f64,
    /// Validation sample count behind the statistics.
    pub sample_size: usize,
    /// Training-cost proxy; the epoch count is used when absent.
    pub training_cost: Option<f64>,
}

/// External model-training collaborator.
///
/// Implementations must be `Sync`: the per-fold epoch sweep runs the
/// grid in parallel. Returning `None` from either method means the run
/// timed out or went missing; the engine drops it and continues.
pub trait EpochTrainer {
    /// Train for `epoch` epochs on the fold's train partition and score
    /// train/validation.
    fn train(&self, fold_index: usize, fold: &Fold, epoch: u32) -> Option<TrainingOutcome>;

    /// Produce per-sample predictions and actuals on the fold's test
    /// partition, training at `epoch` epochs.
    fn evaluate_test(&self, fold_index: usize, fold: &Fold, epoch: u32) -> Option<TestSeries>;
}

/// How a fold left the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoldStatus {
    /// Contributed to aggregation.
    Accepted,
    /// Every candidate's WFE fell below the reject band; excluded from
    /// aggregation but the run continued.
    Rejected,
    /// Every candidate training run was dropped; nothing to select.
    Skipped,
}

/// Outcome of one fold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold_index: usize,
    /// The fold's partition layout.
    pub fold: Fold,
    /// Epoch the TEST partition was scored with, taken from the
    /// posterior *before* this fold's own update.
    pub prior_epoch_used_for_test: u32,
    /// This fold's frontier pick; feeds the posterior for future folds.
    pub validation_optimal_epoch: Option<u32>,
    /// WFE of the frontier pick, when distinguishable from noise.
    pub validation_optimal_wfe: Option<f64>,
    /// Test-partition metrics at `prior_epoch_used_for_test`.
    pub test_metrics: Option<OosMetrics>,
    /// The full swept candidate set, grid order.
    pub epoch_candidates: Vec<EpochCandidate>,
    pub status: FoldStatus,
}
