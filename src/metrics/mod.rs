//! Out-of-sample metrics for test partitions.
//!
//! Provides the per-fold test scoring:
//! - Time-weighted Sharpe-like statistic
//! - Hit rate, profit factor, max drawdown
//! - CVaR, probabilistic Sharpe ratio, sign test

pub mod calculator;

pub use calculator::{OosMetrics, OosMetricsCalculator, TestSeries};
