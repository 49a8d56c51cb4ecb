//! Noise-floor thresholds and walk-forward efficiency.
//!
//! An in-sample statistic below the sample-size-adjusted noise floor is
//! indistinguishable from a zero-skill null, and any WFE ratio built on
//! it would be meaningless; such candidates carry `wfe = None`.

use serde::{Deserialize, Serialize};

/// Fallback noise floor when the sample size is unknown or too small.
/// Equivalent to assuming n ≈ 400.
pub const FALLBACK_THRESHOLD: f64 = 0.1;

/// How the IS-statistic noise floor is computed.
///
/// The source conventions diverge here: one variant uses the fixed
/// constant only, the other derives the floor from sample size with the
/// constant as fallback. The sample-size-derived form is the default;
/// `Fixed` is kept as a compatibility mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NoiseFloor {
    /// `2/sqrt(n)` with a 0.1 fallback below n = 10.
    #[default]
    SampleSize,
    /// Constant 0.1 regardless of sample size.
    Fixed,
}

impl NoiseFloor {
    /// Minimum magnitude an in-sample statistic must exceed to be
    /// distinguishable from noise at roughly 2 sigma.
    pub fn threshold(&self, sample_size: Option<usize>) -> f64 {
        match self {
            Self::Fixed => FALLBACK_THRESHOLD,
            Self::SampleSize => match sample_size {
                Some(n) if n >= 10 => 2.0 / (n as f64).sqrt(),
                _ => FALLBACK_THRESHOLD,
            },
        }
    }

    /// Walk-forward efficiency: OOS over IS performance.
    ///
    /// `None` when the in-sample statistic sits below the noise floor.
    pub fn wfe(
        &self,
        is_statistic: f64,
        oos_statistic: f64,
        sample_size: Option<usize>,
    ) -> Option<f64> {
        if is_statistic.abs() < self.threshold(sample_size) {
            return None;
        }
        Some(oos_statistic / is_statistic)
    }
}

/// Guideline bands for a WFE value. Guidance for a reviewer, not a hard
/// gate anywhere in the selection path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferQuality {
    /// WFE below 0.30: in-sample skill does not transfer.
    Reject,
    /// 0.30 to 0.50: marginal transfer, look closer.
    Investigate,
    /// 0.50 to 0.70: acceptable transfer.
    Acceptable,
    /// 0.70 and above: excellent transfer.
    Excellent,
}

impl TransferQuality {
    /// Band for a given WFE value.
    pub fn classify(wfe: f64) -> Self {
        if wfe < 0.30 {
            Self::Reject
        } else if wfe < 0.50 {
            Self::Investigate
        } else if wfe < 0.70 {
            Self::Acceptable
        } else {
            Self::Excellent
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Reject => "skill does not transfer out of sample",
            Self::Investigate => "marginal transfer, investigate before trusting",
            Self::Acceptable => "acceptable transfer",
            Self::Excellent => "excellent transfer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_sample_size_derived() {
        let floor = NoiseFloor::SampleSize;
        assert!((floor.threshold(Some(400)) - 0.1).abs() < 1e-12);
        assert!((floor.threshold(Some(100)) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_fallback() {
        let floor = NoiseFloor::SampleSize;
        assert!((floor.threshold(Some(5)) - 0.1).abs() < 1e-12);
        assert!((floor.threshold(None) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_fixed_mode_ignores_sample_size() {
        let floor = NoiseFloor::Fixed;
        assert!((floor.threshold(Some(100)) - 0.1).abs() < 1e-12);
        assert!((floor.threshold(Some(1_000_000)) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_wfe_below_noise_floor_is_none() {
        let floor = NoiseFloor::SampleSize;
        assert!(floor.wfe(0.05, 0.5, Some(400)).is_none());
    }

    #[test]
    fn test_wfe_ratio() {
        let floor = NoiseFloor::SampleSize;
        let wfe = floor.wfe(1.0, 0.6, Some(400)).unwrap();
        assert!((wfe - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_wfe_negative_is_statistic_uses_magnitude() {
        let floor = NoiseFloor::SampleSize;
        assert!(floor.wfe(-0.5, 0.3, Some(400)).is_some());
    }

    #[test]
    fn test_quality_bands() {
        assert_eq!(TransferQuality::classify(0.1), TransferQuality::Reject);
        assert_eq!(TransferQuality::classify(0.35), TransferQuality::Investigate);
        assert_eq!(TransferQuality::classify(0.60), TransferQuality::Acceptable);
        assert_eq!(TransferQuality::classify(0.70), TransferQuality::Excellent);
        assert_eq!(TransferQuality::classify(1.2), TransferQuality::Excellent);
    }
}
