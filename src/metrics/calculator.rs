//! Out-of-sample metrics calculator.
//!
//! Scores a test partition from per-sample predictions and realized
//! returns. Everything here is a pure function of the input arrays.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Binomial, ContinuousCDF, DiscreteCDF, Normal};

/// Per-sample test data for one fold.
///
/// A sample's PnL is `signum(prediction) * actual`. Durations weight
/// irregularly-spaced samples; when absent they are derived from
/// timestamp gaps, and uniform weights are used when neither is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSeries {
    /// Model predictions, one per sample.
    pub predictions: Vec<f64>,
    /// Realized returns, one per sample.
    pub actuals: Vec<f64>,
    /// Sample timestamps, time-ordered.
    pub timestamps: Option<Vec<DateTime<Utc>>>,
    /// Per-sample duration weights.
    pub durations: Option<Vec<f64>>,
}

impl TestSeries {
    pub fn new(predictions: Vec<f64>, actuals: Vec<f64>) -> Self {
        Self {
            predictions,
            actuals,
            timestamps: None,
            durations: None,
        }
    }

    fn len(&self) -> usize {
        self.predictions.len().min(self.actuals.len())
    }

    /// Duration weights: explicit durations win, then timestamp gaps,
    /// then uniform.
    fn weights(&self, n: usize) -> Vec<f64> {
        if let Some(durations) = &self.durations {
            if durations.len() >= n {
                return durations[..n].to_vec();
            }
        }
        if let Some(timestamps) = &self.timestamps {
            if timestamps.len() >= n && n >= 2 {
                let mut gaps: Vec<f64> = timestamps[..n]
                    .windows(2)
                    .map(|w| ((w[1] - w[0]).num_seconds().max(0) as f64).max(1.0))
                    .collect();
                // The last sample has no forward gap; reuse the mean.
                let mean_gap = gaps.iter().sum::<f64>() / gaps.len() as f64;
                gaps.push(mean_gap);
                return gaps;
            }
        }
        vec![1.0; n]
    }
}

/// Metrics reported for one fold's test partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OosMetrics {
    /// Samples scored.
    pub sample_size: usize,
    /// Annualized, duration-weighted Sharpe-like statistic.
    pub sharpe_ratio: f64,
    /// Per-period (non-annualized) Sharpe-like statistic.
    pub sharpe_per_period: f64,
    /// Fraction of directional calls that were right.
    pub hit_rate: f64,
    /// Sum of per-sample PnL.
    pub cumulative_pnl: f64,
    /// Largest peak-to-trough drop of the cumulative PnL curve.
    pub max_drawdown: f64,
    /// Gross profit over gross loss.
    pub profit_factor: f64,
    /// Mean of the worst 10% of per-sample PnL.
    pub cvar_10: f64,
    /// Probability the true Sharpe-like statistic exceeds zero.
    pub probabilistic_sharpe: f64,
    /// One-sided binomial sign test p-value on per-sample PnL signs.
    pub sign_test_p_value: f64,
}

impl Default for OosMetrics {
    fn default() -> Self {
        Self {
            sample_size: 0,
            sharpe_ratio: 0.0,
            sharpe_per_period: 0.0,
            hit_rate: 0.0,
            cumulative_pnl: 0.0,
            max_drawdown: 0.0,
            profit_factor: 0.0,
            cvar_10: 0.0,
            probabilistic_sharpe: 0.5,
            sign_test_p_value: 1.0,
        }
    }
}

impl OosMetrics {
    /// Pretty report for one fold.
    pub fn summary(&self) -> String {
        format!(
            "OOS Metrics ({} samples)\n\
             Sharpe (annualized): {:.2}\n\
             Hit Rate: {:.1}%\n\
             Cumulative PnL: {:.4}\n\
             Max Drawdown: {:.4}\n\
             Profit Factor: {:.2}\n\
             CVaR (10%): {:.4}\n\
             PSR: {:.3}\n\
             Sign Test p: {:.3}",
            self.sample_size,
            self.sharpe_ratio,
            self.hit_rate * 100.0,
            self.cumulative_pnl,
            self.max_drawdown,
            self.profit_factor,
            self.cvar_10,
            self.probabilistic_sharpe,
            self.sign_test_p_value
        )
    }
}

/// Calculator for test-partition metrics.
pub struct OosMetricsCalculator;

impl OosMetricsCalculator {
    /// Score a test series. `annualization` is periods per year for the
    /// run's market calendar and time unit.
    pub fn calculate(series: &TestSeries, annualization: f64) -> OosMetrics {
        let n = series.len();
        if n == 0 {
            return OosMetrics::default();
        }

        let pnl: Vec<f64> = (0..n)
            .map(|i| series.predictions[i].signum() * series.actuals[i])
            .collect();
        let weights = series.weights(n);

        let (mean, std) = Self::weighted_mean_std(&pnl, &weights);
        let sharpe_per_period = if std > 0.0 { mean / std } else { 0.0 };
        let sharpe_ratio = sharpe_per_period * annualization.sqrt();

        let directional = (0..n).filter(|&i| series.predictions[i] != 0.0).count();
        let hits = (0..n)
            .filter(|&i| {
                series.predictions[i] != 0.0
                    && series.predictions[i].signum() == series.actuals[i].signum()
            })
            .count();
        let hit_rate = if directional > 0 {
            hits as f64 / directional as f64
        } else {
            0.0
        };

        let cumulative_pnl = pnl.iter().sum();

        OosMetrics {
            sample_size: n,
            sharpe_ratio,
            sharpe_per_period,
            hit_rate,
            cumulative_pnl,
            max_drawdown: Self::max_drawdown(&pnl),
            profit_factor: Self::profit_factor(&pnl),
            cvar_10: Self::cvar(&pnl, 0.10),
            probabilistic_sharpe: Self::probabilistic_sharpe(sharpe_per_period, n),
            sign_test_p_value: Self::sign_test(&pnl),
        }
    }

    /// Probabilistic Sharpe ratio: `Φ(statistic / SE)` with the standard
    /// error approximated as `1/sqrt(n)`.
    pub fn probabilistic_sharpe(sharpe_per_period: f64, n: usize) -> f64 {
        if n == 0 {
            return 0.5;
        }
        let normal = Normal::new(0.0, 1.0).unwrap();
        normal.cdf(sharpe_per_period * (n as f64).sqrt())
    }

    fn weighted_mean_std(values: &[f64], weights: &[f64]) -> (f64, f64) {
        let total_weight: f64 = weights.iter().sum();
        if total_weight <= 0.0 {
            return (0.0, 0.0);
        }
        let mean = values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total_weight;
        let variance = values
            .iter()
            .zip(weights)
            .map(|(v, w)| w * (v - mean) * (v - mean))
            .sum::<f64>()
            / total_weight;
        (mean, variance.sqrt())
    }

    /// Largest peak-to-trough drop of the running PnL sum.
    fn max_drawdown(pnl: &[f64]) -> f64 {
        let mut equity = 0.0;
        let mut peak = 0.0;
        let mut max_dd = 0.0;
        for p in pnl {
            equity += p;
            if equity > peak {
                peak = equity;
            }
            let dd = peak - equity;
            if dd > max_dd {
                max_dd = dd;
            }
        }
        max_dd
    }

    fn profit_factor(pnl: &[f64]) -> f64 {
        let gross_profit: f64 = pnl.iter().filter(|p| **p > 0.0).sum();
        let gross_loss: f64 = pnl.iter().filter(|p| **p < 0.0).sum::<f64>().abs();
        if gross_loss == 0.0 {
            return f64::INFINITY;
        }
        gross_profit / gross_loss
    }

    /// Conditional value at risk: mean of the worst `alpha` fraction of
    /// per-sample PnL.
    fn cvar(pnl: &[f64], alpha: f64) -> f64 {
        if pnl.is_empty() {
            return 0.0;
        }
        let mut sorted = pnl.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let tail = ((pnl.len() as f64 * alpha).ceil() as usize).max(1);
        sorted[..tail].iter().sum::<f64>() / tail as f64
    }

    /// One-sided binomial sign test: probability of at least the
    /// observed number of positive samples under a fair coin.
    fn sign_test(pnl: &[f64]) -> f64 {
        let nonzero: Vec<f64> = pnl.iter().copied().filter(|p| *p != 0.0).collect();
        if nonzero.is_empty() {
            return 1.0;
        }
        let n = nonzero.len() as u64;
        let wins = nonzero.iter().filter(|p| **p > 0.0).count() as u64;

        if wins == 0 {
            return 1.0;
        }
        let binomial = Binomial::new(0.5, n).unwrap();
        1.0 - binomial.cdf(wins - 1)
    }
}
