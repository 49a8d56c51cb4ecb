//! The sequential fold scan.
//!
//! Folds run strictly in temporal order: the posterior read for fold
//! i+1 depends on fold i's update having completed. Only the epoch
//! sweep inside a single fold is parallel; candidates share read-only
//! fold data and are joined before frontier selection.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::{AggregationEngine, FoldStatistic, WfeAggregate};
use crate::bayes::{BayesianCarryForward, PosteriorState, WFE_CLAMP};
use crate::config::Config;
use crate::frontier::{EpochCandidate, FrontierSelector};
use crate::metrics::OosMetricsCalculator;
use crate::split::{NestedSplitter, SplitConfig};
use crate::stats::{NoiseFloor, TransferQuality};

use super::{EngineError, EpochTrainer, FoldResult, FoldStatus};

/// Final cross-fold report. Recomputed from the fold results, never
/// mutated incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    pub n_folds: usize,
    pub rejected_folds: usize,
    pub skipped_folds: usize,
    /// Pooled/median/weighted WFE over accepted folds.
    pub wfe: WfeAggregate,
    /// Sample-weighted per-period OOS statistic over test partitions.
    pub oos_statistic: f64,
    /// OOS statistic corrected for folds × candidates selection trials.
    pub deflated_sharpe: f64,
    /// Probability the true OOS statistic exceeds zero.
    pub probabilistic_sharpe: f64,
    /// Per-fold arrays, fold order.
    pub wfe_by_fold: Vec<Option<f64>>,
    pub prior_epochs: Vec<u32>,
    pub optimal_epochs: Vec<Option<u32>>,
    pub test_sharpe_by_fold: Vec<Option<f64>>,
}

impl AggregateReport {
    /// Get summary string.
    pub fn summary(&self) -> String {
        format!(
            "Epoch Selection Report: {} folds ({} rejected, {} skipped)\n\
             WFE median: {}\n\
             WFE pooled: {}\n\
             WFE weighted: {}\n\
             OOS statistic: {:.3}\n\
             Deflated Sharpe: {:.3}\n\
             PSR: {:.3}",
            self.n_folds,
            self.rejected_folds,
            self.skipped_folds,
            fmt_opt(self.wfe.median),
            fmt_opt(self.wfe.pooled),
            fmt_opt(self.wfe.weighted_mean),
            self.oos_statistic,
            self.deflated_sharpe,
            self.probabilistic_sharpe
        )
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.3}", v),
        None => "n/a".to_string(),
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct SelectionRun {
    pub fold_results: Vec<FoldResult>,
    pub report: AggregateReport,
    /// Final posterior, with full update history.
    pub posterior: PosteriorState,
}

/// Adaptive walk-forward epoch selection over a sequence of folds.
pub struct EpochSelectionEngine {
    config: Config,
    splitter: NestedSplitter,
    selector: FrontierSelector,
    noise_floor: NoiseFloor,
}

impl EpochSelectionEngine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            splitter: NestedSplitter::default(),
            selector: FrontierSelector::default(),
            noise_floor: NoiseFloor::default(),
        }
    }

    /// Set the partition fractions.
    pub fn with_split_config(mut self, config: SplitConfig) -> Result<Self, EngineError> {
        self.splitter = NestedSplitter::new(config)?;
        Ok(self)
    }

    /// Set the frontier weights.
    pub fn with_selector(mut self, selector: FrontierSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Set the noise-floor convention.
    pub fn with_noise_floor(mut self, noise_floor: NoiseFloor) -> Self {
        self.noise_floor = noise_floor;
        self
    }

    /// Run the selection over folds of the given lengths, in temporal
    /// order.
    pub fn run<T>(&self, trainer: &T, fold_lengths: &[usize]) -> Result<SelectionRun, EngineError>
    where
        T: EpochTrainer + Sync,
    {
        if fold_lengths.is_empty() {
            return Err(EngineError::NoFolds);
        }

        let grid = self.config.epoch_grid();
        let annualization = self
            .config
            .time_unit
            .periods_per_year(self.config.market_type);
        let mut carry = BayesianCarryForward::new(&self.config);
        let mut fold_results = Vec::with_capacity(fold_lengths.len());

        info!(
            folds = fold_lengths.len(),
            grid_points = grid.len(),
            "starting epoch selection"
        );

        for (fold_index, &n) in fold_lengths.iter().enumerate() {
            let fold = self.splitter.split(n)?;

            // Read the test epoch from the pre-fold posterior before any
            // of this fold's own results exist.
            let prior_epoch = carry.read_for_test(&grid);

            let outcomes: Vec<(u32, super::TrainingOutcome)> = grid
                .par_iter()
                .filter_map(|&epoch| {
                    trainer
                        .train(fold_index, &fold, epoch)
                        .map(|outcome| (epoch, outcome))
                })
                .collect();

            let dropped = grid.len() - outcomes.len();
            if dropped > 0 {
                warn!(fold_index, dropped, "epoch candidates dropped from sweep");
            }

            let candidates: Vec<EpochCandidate> = outcomes
                .into_iter()
                .map(|(epoch, o)| EpochCandidate {
                    epoch,
                    is_statistic: o.is_statistic,
                    oos_statistic: o.oos_statistic,
                    wfe: self.noise_floor.wfe(
                        o.is_statistic,
                        o.oos_statistic,
                        Some(o.sample_size),
                    ),
                    sample_size: o.sample_size,
                    training_cost: o.training_cost.unwrap_or(epoch as f64),
                })
                .collect();

            let selection = self.selector.select(&candidates);

            let test_metrics = match trainer.evaluate_test(fold_index, &fold, prior_epoch) {
                Some(series) => Some(OosMetricsCalculator::calculate(&series, annualization)),
                None => {
                    warn!(fold_index, prior_epoch, "test evaluation missing");
                    None
                }
            };

            let status = Self::fold_status(&candidates, selection.is_some());

            let (validation_optimal_epoch, validation_optimal_wfe) = match &selection {
                Some(sel) => (Some(sel.chosen.epoch), sel.chosen.wfe),
                None => (None, None),
            };

            if let Some(sel) = &selection {
                // A fallback pick without a valid WFE still updates the
                // posterior, at the weakest allowed confidence.
                let observed_wfe = sel.chosen.wfe.unwrap_or(WFE_CLAMP.0);
                carry.update(fold_index, sel.chosen.epoch, observed_wfe)?;
            }

            info!(
                fold_index,
                prior_epoch,
                optimal_epoch = ?validation_optimal_epoch,
                wfe = ?validation_optimal_wfe,
                ?status,
                "fold complete"
            );

            fold_results.push(FoldResult {
                fold_index,
                fold,
                prior_epoch_used_for_test: prior_epoch,
                validation_optimal_epoch,
                validation_optimal_wfe,
                test_metrics,
                epoch_candidates: candidates,
                status,
            });
        }

        let report = self.build_report(&fold_results, grid.len());

        Ok(SelectionRun {
            fold_results,
            report,
            posterior: carry.state().clone(),
        })
    }

    /// Rejected when every noise-distinguishable candidate falls in the
    /// reject band; skipped when the sweep produced nothing at all.
    fn fold_status(candidates: &[EpochCandidate], selected: bool) -> FoldStatus {
        if !selected {
            return FoldStatus::Skipped;
        }
        let valid: Vec<f64> = candidates.iter().filter_map(|c| c.wfe).collect();
        if !valid.is_empty()
            && valid
                .iter()
                .all(|w| TransferQuality::classify(*w) == TransferQuality::Reject)
        {
            FoldStatus::Rejected
        } else {
            FoldStatus::Accepted
        }
    }

    fn build_report(&self, fold_results: &[FoldResult], grid_points: usize) -> AggregateReport {
        let rejected = fold_results
            .iter()
            .filter(|f| f.status == FoldStatus::Rejected)
            .count();
        let skipped = fold_results
            .iter()
            .filter(|f| f.status == FoldStatus::Skipped)
            .count();

        let accepted: Vec<FoldStatistic> = fold_results
            .iter()
            .filter(|f| f.status == FoldStatus::Accepted)
            .filter_map(|f| {
                let wfe = f.validation_optimal_wfe?;
                let epoch = f.validation_optimal_epoch?;
                let chosen = f.epoch_candidates.iter().find(|c| c.epoch == epoch)?;
                Some(FoldStatistic {
                    wfe,
                    is_statistic: chosen.is_statistic,
                    oos_statistic: chosen.oos_statistic,
                    n_is: f.fold.train().len(),
                    n_oos: f.fold.validation().len(),
                })
            })
            .collect();

        let wfe = AggregationEngine::aggregate_wfe(&accepted, rejected);

        // Sample-weighted per-period OOS statistic over test partitions.
        let mut weighted_sum = 0.0;
        let mut total_samples = 0usize;
        for f in fold_results {
            if let Some(metrics) = &f.test_metrics {
                weighted_sum += metrics.sharpe_per_period * metrics.sample_size as f64;
                total_samples += metrics.sample_size;
            }
        }
        let oos_statistic = if total_samples > 0 {
            weighted_sum / total_samples as f64
        } else {
            0.0
        };

        let n_trials = fold_results.len() * grid_points;
        let deflated_sharpe = AggregationEngine::deflated_sharpe(
            oos_statistic,
            n_trials,
            (total_samples > 0).then_some(total_samples),
        );
        let probabilistic_sharpe =
            OosMetricsCalculator::probabilistic_sharpe(oos_statistic, total_samples);

        AggregateReport {
            n_folds: fold_results.len(),
            rejected_folds: rejected,
            skipped_folds: skipped,
            wfe,
            oos_statistic,
            deflated_sharpe,
            probabilistic_sharpe,
            wfe_by_fold: fold_results
                .iter()
                .map(|f| f.validation_optimal_wfe)
                .collect(),
            prior_epochs: fold_results
                .iter()
                .map(|f| f.prior_epoch_used_for_test)
                .collect(),
            optimal_epochs: fold_results
                .iter()
                .map(|f| f.validation_optimal_epoch)
                .collect(),
            test_sharpe_by_fold: fold_results
                .iter()
                .map(|f| f.test_metrics.as_ref().map(|m| m.sharpe_ratio))
                .collect(),
        }
    }
}
