//! Cross-fold aggregation of walk-forward statistics.
//!
//! WFE under a zero-skill null is a ratio of two noisy statistics and
//! behaves like a Cauchy variable: its expectation is undefined, so a
//! raw arithmetic mean of per-fold WFE values is meaningless and is
//! deliberately not offered. Pooled, median, and weighted-mean
//! estimators are computed together for cross-checking.

use serde::{Deserialize, Serialize};

/// Euler–Mascheroni constant, used by the Gumbel expected-maximum
/// approximation.
const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;

/// One accepted fold's contribution to aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldStatistic {
    /// The fold's walk-forward efficiency.
    pub wfe: f64,
    /// In-sample Sharpe-like statistic.
    pub is_statistic: f64,
    /// Out-of-sample Sharpe-like statistic.
    pub oos_statistic: f64,
    /// In-sample (train) sample count.
    pub n_is: usize,
    /// Out-of-sample (validation) sample count.
    pub n_oos: usize,
}

/// The three WFE estimators, reported together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WfeAggregate {
    /// Precision-weighted pooled ratio; recommended for unequal fold
    /// sizes.
    pub pooled: Option<f64>,
    /// Median of per-fold WFE; robust default for reporting.
    pub median: Option<f64>,
    /// Weighted mean with `w = n_oos * n_is / (n_oos + n_is)`; optimal
    /// for homogeneous folds.
    pub weighted_mean: Option<f64>,
    /// Folds that contributed.
    pub folds_used: usize,
    /// Rejected folds excluded from the estimators.
    pub folds_excluded: usize,
}

/// Combines per-fold statistics across a run.
pub struct AggregationEngine;

impl AggregationEngine {
    /// Compute all three WFE estimators over the accepted folds.
    /// `excluded` is the count of rejected folds left out.
    pub fn aggregate_wfe(folds: &[FoldStatistic], excluded: usize) -> WfeAggregate {
        WfeAggregate {
            pooled: Self::pooled_wfe(folds),
            median: Self::median_wfe(folds),
            weighted_mean: Self::weighted_mean_wfe(folds),
            folds_used: folds.len(),
            folds_excluded: excluded,
        }
    }

    /// `Σ(n_oos · oos) / Σ(n_is · is)` across folds.
    pub fn pooled_wfe(folds: &[FoldStatistic]) -> Option<f64> {
        if folds.is_empty() {
            return None;
        }
        let numerator: f64 = folds
            .iter()
            .map(|f| f.n_oos as f64 * f.oos_statistic)
            .sum();
        let denominator: f64 = folds
            .iter()
            .map(|f| f.n_is as f64 * f.is_statistic)
            .sum();
        if denominator.abs() < f64::EPSILON {
            return None;
        }
        Some(numerator / denominator)
    }

    /// Median of per-fold WFE values.
    pub fn median_wfe(folds: &[FoldStatistic]) -> Option<f64> {
        let mut wfes: Vec<f64> = folds.iter().map(|f| f.wfe).collect();
        median(&mut wfes)
    }

    /// Weighted mean with `w = n_oos · n_is / (n_oos + n_is)` per fold.
    pub fn weighted_mean_wfe(folds: &[FoldStatistic]) -> Option<f64> {
        if folds.is_empty() {
            return None;
        }
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for f in folds {
            let denom = (f.n_oos + f.n_is) as f64;
            if denom <= 0.0 {
                continue;
            }
            let w = f.n_oos as f64 * f.n_is as f64 / denom;
            weighted_sum += w * f.wfe;
            total_weight += w;
        }
        if total_weight <= 0.0 {
            return None;
        }
        Some(weighted_sum / total_weight)
    }

    /// Expected maximum of `n_trials` independent standard normals,
    /// Gumbel extreme-value approximation.
    pub fn expected_max_z(n_trials: usize) -> f64 {
        if n_trials < 2 {
            return 0.0;
        }
        let ln_n = (n_trials as f64).ln();
        let scale = (2.0 * ln_n).sqrt();
        scale - (EULER_MASCHERONI + (std::f64::consts::PI / 2.0).ln()) / scale
    }

    /// Deflated Sharpe-like statistic: the observed statistic minus the
    /// expected maximum under the null over all trials, floored at zero.
    ///
    /// `n_trials` is folds × epoch candidates; `n_samples` drives the
    /// standard-error estimate (`1/sqrt(n)`), falling back to n = 400
    /// when unknown.
    pub fn deflated_sharpe(
        observed: f64,
        n_trials: usize,
        n_samples: Option<usize>,
    ) -> f64 {
        let n = n_samples.unwrap_or(400).max(1);
        let standard_error = 1.0 / (n as f64).sqrt();
        let inflation = Self::expected_max_z(n_trials) * standard_error;
        (observed - inflation).max(0.0)
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(wfe: f64, is: f64, oos: f64, n_is: usize, n_oos: usize) -> FoldStatistic {
        FoldStatistic {
            wfe,
            is_statistic: is,
            oos_statistic: oos,
            n_is,
            n_oos,
        }
    }

    fn five_folds() -> Vec<FoldStatistic> {
        vec![
            fold(0.40, 1.00, 0.40, 600, 200),
            fold(0.60, 0.80, 0.48, 600, 200),
            fold(0.70, 1.20, 0.84, 500, 250),
            fold(0.50, 0.90, 0.45, 500, 250),
            fold(0.65, 1.10, 0.715, 400, 300),
        ]
    }

    #[test]
    fn test_pooled_wfe_reference() {
        let folds = five_folds();
        // Hand-computed:
        // num = 200*0.40 + 200*0.48 + 250*0.84 + 250*0.45 + 300*0.715
        //     = 80 + 96 + 210 + 112.5 + 214.5 = 713
        // den = 600*1.0 + 600*0.8 + 500*1.2 + 500*0.9 + 400*1.1
        //     = 600 + 480 + 600 + 450 + 440 = 2570
        let pooled = AggregationEngine::pooled_wfe(&folds).unwrap();
        assert!((pooled - 713.0 / 2570.0).abs() < 1e-9);
    }

    #[test]
    fn test_median_wfe_reference() {
        let folds = five_folds();
        // Sorted WFE: 0.40, 0.50, 0.60, 0.65, 0.70 -> median 0.60.
        let median = AggregationEngine::median_wfe(&folds).unwrap();
        assert!((median - 0.60).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_mean_wfe_reference() {
        let folds = five_folds();
        // w = n_oos*n_is/(n_oos+n_is): 150, 150, 166.667, 166.667, 171.429
        let w = [150.0, 150.0, 500.0 * 250.0 / 750.0, 500.0 * 250.0 / 750.0, 400.0 * 300.0 / 700.0];
        let wfes = [0.40, 0.60, 0.70, 0.50, 0.65];
        let expected: f64 = w.iter().zip(&wfes).map(|(w, x)| w * x).sum::<f64>()
            / w.iter().sum::<f64>();
        let got = AggregationEngine::weighted_mean_wfe(&folds).unwrap();
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn test_median_even_count() {
        let mut values = vec![0.2, 0.8, 0.4, 0.6];
        assert!((median(&mut values).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_folds() {
        let agg = AggregationEngine::aggregate_wfe(&[], 3);
        assert!(agg.pooled.is_none());
        assert!(agg.median.is_none());
        assert!(agg.weighted_mean.is_none());
        assert_eq!(agg.folds_used, 0);
        assert_eq!(agg.folds_excluded, 3);
    }

    #[test]
    fn test_expected_max_z_grows_with_trials() {
        let few = AggregationEngine::expected_max_z(5);
        let many = AggregationEngine::expected_max_z(500);
        assert!(few > 0.0);
        assert!(many > few);
    }

    #[test]
    fn test_dsr_monotone_in_trials() {
        let observed = 0.8;
        let mut previous = f64::INFINITY;
        for n_trials in [1usize, 2, 5, 15, 50, 200, 1000] {
            let dsr = AggregationEngine::deflated_sharpe(observed, n_trials, Some(400));
            assert!(dsr <= previous);
            assert!(dsr >= 0.0);
            previous = dsr;
        }
    }

    #[test]
    fn test_dsr_floored_at_zero() {
        let dsr = AggregationEngine::deflated_sharpe(0.01, 10_000, Some(25));
        assert_eq!(dsr, 0.0);
    }

    #[test]
    fn test_dsr_without_correction() {
        // A single trial carries no selection bias.
        let dsr = AggregationEngine::deflated_sharpe(0.8, 1, Some(400));
        assert!((dsr - 0.8).abs() < 1e-12);
    }
}
