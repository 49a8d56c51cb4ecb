//! Nested train/validation/test partitioning with embargo gaps.
//!
//! Each fold is cut into five contiguous index ranges in temporal order:
//! train, embargo, validation, embargo, test. The embargo ranges are
//! buffers against information leakage across partition boundaries; they
//! are read by the trainer for feature warm-up but never scored.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("partition percentages sum to {0:.3}, must not exceed 1.0")]
    PercentagesExceedOne(f64),

    #[error("embargo fraction {0:.3} leaves no scorable data")]
    EmbargoTooLarge(f64),

    #[error("partition percentage must be positive: {0}")]
    NonPositivePercentage(&'static str),

    #[error("fold of {n} samples leaves the {partition} partition empty")]
    EmptyPartition { n: usize, partition: &'static str },
}

/// Partition fractions for one fold.
///
/// `train_pct`/`val_pct`/`test_pct` are proportions of the scorable
/// (non-embargo) span; each embargo takes `embargo_pct` of the whole fold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    pub train_pct: f64,
    pub val_pct: f64,
    pub test_pct: f64,
    pub embargo_pct: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_pct: 0.60,
            val_pct: 0.20,
            test_pct: 0.20,
            embargo_pct: 0.06,
        }
    }
}

/// One fold's computed index ranges.
///
/// Ranges are contiguous, non-overlapping, and cover `0..n` in temporal
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fold {
    n: usize,
    train: Range<usize>,
    embargo_1: Range<usize>,
    validation: Range<usize>,
    embargo_2: Range<usize>,
    test: Range<usize>,
}

impl Fold {
    /// Total samples in the fold.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Training range.
    pub fn train(&self) -> Range<usize> {
        self.train.clone()
    }

    /// Embargo between train and validation. Never scored.
    pub fn embargo_1(&self) -> Range<usize> {
        self.embargo_1.clone()
    }

    /// Validation range.
    pub fn validation(&self) -> Range<usize> {
        self.validation.clone()
    }

    /// Embargo between validation and test. Never scored.
    pub fn embargo_2(&self) -> Range<usize> {
        self.embargo_2.clone()
    }

    /// Held-out test range.
    pub fn test(&self) -> Range<usize> {
        self.test.clone()
    }
}

/// Splits a fold of time-ordered samples into embargoed partitions.
#[derive(Debug, Clone, Default)]
pub struct NestedSplitter {
    config: SplitConfig,
}

impl NestedSplitter {
    pub fn new(config: SplitConfig) -> Result<Self, SplitError> {
        let c = &config;
        for (pct, name) in [
            (c.train_pct, "train"),
            (c.val_pct, "validation"),
            (c.test_pct, "test"),
        ] {
            if pct <= 0.0 {
                return Err(SplitError::NonPositivePercentage(name));
            }
        }
        let scored = c.train_pct + c.val_pct + c.test_pct;
        if scored > 1.0 + 1e-9 {
            return Err(SplitError::PercentagesExceedOne(scored));
        }
        if c.embargo_pct < 0.0 || 2.0 * c.embargo_pct >= 1.0 {
            return Err(SplitError::EmbargoTooLarge(c.embargo_pct));
        }
        Ok(Self { config })
    }

    /// Partition a fold of `n` samples.
    pub fn split(&self, n: usize) -> Result<Fold, SplitError> {
        let c = &self.config;

        let embargo_len = (n as f64 * c.embargo_pct).round() as usize;
        let scorable = n
            .checked_sub(2 * embargo_len)
            .ok_or(SplitError::EmbargoTooLarge(c.embargo_pct))?;

        let total_pct = c.train_pct + c.val_pct + c.test_pct;
        let train_len = (scorable as f64 * c.train_pct / total_pct).round() as usize;
        let val_len = (scorable as f64 * c.val_pct / total_pct).round() as usize;
        // Remainder to test so the five ranges cover the fold exactly.
        let test_len = scorable
            .checked_sub(train_len + val_len)
            .ok_or(SplitError::EmptyPartition { n, partition: "test" })?;

        for (len, partition) in [
            (train_len, "train"),
            (val_len, "validation"),
            (test_len, "test"),
        ] {
            if len == 0 {
                return Err(SplitError::EmptyPartition { n, partition });
            }
        }

        let train_end = train_len;
        let val_start = train_end + embargo_len;
        let val_end = val_start + val_len;
        let test_start = val_end + embargo_len;

        Ok(Fold {
            n,
            train: 0..train_end,
            embargo_1: train_end..val_start,
            validation: val_start..val_end,
            embargo_2: val_end..test_start,
            test: test_start..n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_split_covers_fold() {
        let splitter = NestedSplitter::default();
        let fold = splitter.split(1000).unwrap();

        let total = fold.train().len()
            + fold.embargo_1().len()
            + fold.validation().len()
            + fold.embargo_2().len()
            + fold.test().len();
        assert_eq!(total, 1000);
    }

    #[test]
    fn test_ranges_are_contiguous_and_ordered() {
        let fold = NestedSplitter::default().split(1000).unwrap();

        assert_eq!(fold.train().start, 0);
        assert_eq!(fold.train().end, fold.embargo_1().start);
        assert_eq!(fold.embargo_1().end, fold.validation().start);
        assert_eq!(fold.validation().end, fold.embargo_2().start);
        assert_eq!(fold.embargo_2().end, fold.test().start);
        assert_eq!(fold.test().end, 1000);
    }

    #[test]
    fn test_default_proportions() {
        let fold = NestedSplitter::default().split(1000).unwrap();

        // 6% embargo on each side of validation.
        assert_eq!(fold.embargo_1().len(), 60);
        assert_eq!(fold.embargo_2().len(), 60);

        // Scorable span splits 60/20/20 within rounding.
        let scorable = 1000 - 120;
        let train_frac = fold.train().len() as f64 / scorable as f64;
        let val_frac = fold.validation().len() as f64 / scorable as f64;
        let test_frac = fold.test().len() as f64 / scorable as f64;
        assert!((train_frac - 0.60).abs() < 0.01);
        assert!((val_frac - 0.20).abs() < 0.01);
        assert!((test_frac - 0.20).abs() < 0.01);
    }

    #[test]
    fn test_rejects_oversubscribed_percentages() {
        let config = SplitConfig {
            train_pct: 0.70,
            val_pct: 0.25,
            test_pct: 0.20,
            embargo_pct: 0.06,
        };
        assert!(NestedSplitter::new(config).is_err());
    }

    #[test]
    fn test_rejects_embargo_consuming_fold() {
        let config = SplitConfig {
            embargo_pct: 0.50,
            ..SplitConfig::default()
        };
        assert!(NestedSplitter::new(config).is_err());
    }

    #[test]
    fn test_tiny_fold_yields_empty_partition() {
        let result = NestedSplitter::default().split(3);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_embargo_allowed() {
        let config = SplitConfig {
            embargo_pct: 0.0,
            ..SplitConfig::default()
        };
        let fold = NestedSplitter::new(config).unwrap().split(100).unwrap();
        assert_eq!(fold.embargo_1().len(), 0);
        assert_eq!(fold.train().len() + fold.validation().len() + fold.test().len(), 100);
    }
}
