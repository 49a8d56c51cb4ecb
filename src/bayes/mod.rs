//! Bayesian carry-forward of the optimal-epoch posterior across folds.
//!
//! A fold's held-out test partition is scored with the epoch the
//! posterior held *before* that fold contributed anything — scoring it
//! with the fold's own validation-optimal epoch is look-ahead bias. The
//! type enforces the per-fold read-before-update ordering.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// WFE observations are clamped into this band before weighting an
/// update. Values above 2.0 are regime luck or an IS underfit, not
/// evidence; values near zero would blow up the effective variance.
pub const WFE_CLAMP: (f64, f64) = (0.1, 2.0);

#[derive(Error, Debug)]
pub enum CarryForwardError {
    #[error("fold {fold_index}: update() called before read_for_test()")]
    UpdateBeforeRead { fold_index: usize },
}

/// One applied posterior update, kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosteriorUpdate {
    pub fold_index: usize,
    pub observed_epoch: u32,
    pub wfe_clamped: f64,
    pub posterior_mean: f64,
    pub posterior_variance: f64,
}

/// Normal posterior over the true optimal epoch.
///
/// Owned by exactly one [`BayesianCarryForward`] per selection run and
/// mutated only by sequential fold updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosteriorState {
    pub mean: f64,
    pub variance: f64,
    pub history: Vec<PosteriorUpdate>,
}

/// Sequential posterior carrier for one epoch-selection run.
///
/// Per-fold protocol, in order:
/// 1. [`read_for_test`](Self::read_for_test) — the epoch the fold's TEST
///    partition is scored with, taken from the pre-fold posterior.
/// 2. [`update`](Self::update) — fold the validation-optimal observation
///    into the posterior for future folds.
///
/// Updating before reading is rejected with
/// [`CarryForwardError::UpdateBeforeRead`].
#[derive(Debug, Clone)]
pub struct BayesianCarryForward {
    state: PosteriorState,
    observation_variance: f64,
    read_this_fold: bool,
}

impl BayesianCarryForward {
    /// Seed the posterior from the configured prior.
    pub fn new(config: &Config) -> Self {
        Self {
            state: PosteriorState {
                mean: config.prior_mean(),
                variance: config.prior_variance(),
                history: Vec::new(),
            },
            observation_variance: config.observation_variance(),
            read_this_fold: false,
        }
    }

    /// Current posterior state.
    pub fn state(&self) -> &PosteriorState {
        &self.state
    }

    /// Epoch to score the current fold's TEST partition with: the
    /// posterior mean snapped to the nearest grid value.
    ///
    /// Must be called before any work derived from the current fold's
    /// validation-optimal candidate.
    pub fn read_for_test(&mut self, epoch_grid: &[u32]) -> u32 {
        self.read_this_fold = true;
        let mean = self.state.mean;
        epoch_grid
            .iter()
            .copied()
            .min_by(|a, b| {
                let da = (*a as f64 - mean).abs();
                let db = (*b as f64 - mean).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(mean.round() as u32)
    }

    /// Precision-weighted update with the fold's validation-optimal
    /// epoch, confidence-scaled by its WFE.
    pub fn update(
        &mut self,
        fold_index: usize,
        observed_epoch: u32,
        wfe: f64,
    ) -> Result<(), CarryForwardError> {
        if !self.read_this_fold {
            return Err(CarryForwardError::UpdateBeforeRead { fold_index });
        }
        self.read_this_fold = false;

        let wfe_clamped = if wfe.is_finite() {
            wfe.clamp(WFE_CLAMP.0, WFE_CLAMP.1)
        } else {
            WFE_CLAMP.0
        };

        // Higher transfer quality means a tighter effective variance,
        // so the observation pulls harder on the posterior.
        let effective_variance = self.observation_variance / wfe_clamped;

        let prior_mean = self.state.mean;
        let prior_variance = self.state.variance;
        let new_precision = 1.0 / prior_variance + 1.0 / effective_variance;
        let new_mean = (prior_mean / prior_variance
            + observed_epoch as f64 / effective_variance)
            / new_precision;
        let new_variance = 1.0 / new_precision;

        debug!(
            fold_index,
            observed_epoch,
            wfe_clamped,
            posterior_mean = new_mean,
            posterior_variance = new_variance,
            "posterior update"
        );

        self.state.mean = new_mean;
        self.state.variance = new_variance;
        self.state.history.push(PosteriorUpdate {
            fold_index,
            observed_epoch,
            wfe_clamped,
            posterior_mean: new_mean,
            posterior_variance: new_variance,
        });
        Ok(())
    }
}
