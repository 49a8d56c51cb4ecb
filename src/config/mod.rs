//! Run configuration and derived search parameters.
//!
//! Turns a user-given epoch search range into a log-spaced candidate grid
//! and principled Bayesian prior/observation variances.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("min_epoch must be positive, got {0}")]
    NonPositiveMinEpoch(u32),

    #[error("max_epoch ({max}) must exceed min_epoch ({min})")]
    InvertedRange { min: u32, max: u32 },

    #[error("granularity must be at least 1, got {0}")]
    ZeroGranularity(usize),
}

/// Market calendar the samples come from.
///
/// Determines how many periods make up a year when annualizing
/// per-period statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketType {
    /// Crypto, trading around the clock.
    Crypto24_7,
    /// Crypto restricted to liquid sessions.
    CryptoSessionFiltered,
    /// Equities, exchange calendar.
    Equity,
    /// FX, roughly 24/5.
    Forex,
}

impl MarketType {
    /// Trading days per year for this market.
    pub fn trading_days_per_year(&self) -> f64 {
        match self {
            Self::Crypto24_7 => 365.0,
            Self::CryptoSessionFiltered => 365.0,
            Self::Equity => 252.0,
            Self::Forex => 260.0,
        }
    }

    /// Description of the market calendar.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Crypto24_7 => "Crypto, 24/7 trading",
            Self::CryptoSessionFiltered => "Crypto, session-filtered",
            Self::Equity => "Equities, exchange calendar",
            Self::Forex => "Forex, 24/5",
        }
    }
}

/// Granularity of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    /// Intraday bars; annualization left at the daily scale.
    Bar,
    /// One sample per trading day.
    Daily,
    /// One sample per week.
    Weekly,
}

impl TimeUnit {
    /// Periods per year under the given market calendar.
    pub fn periods_per_year(&self, market: MarketType) -> f64 {
        match self {
            Self::Bar | Self::Daily => market.trading_days_per_year(),
            Self::Weekly => 52.0,
        }
    }
}

/// Immutable configuration for one epoch-selection run.
///
/// Validated at construction; all derived quantities (grid, variances)
/// are pure functions of the validated fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Lower bound of the epoch search range (inclusive).
    pub min_epoch: u32,
    /// Upper bound of the epoch search range (inclusive).
    pub max_epoch: u32,
    /// Number of grid points before deduplication.
    pub granularity: usize,
    /// Market calendar.
    pub market_type: MarketType,
    /// Sample granularity.
    pub time_unit: TimeUnit,
}

impl Config {
    /// Create and validate a configuration.
    pub fn new(
        min_epoch: u32,
        max_epoch: u32,
        granularity: usize,
        market_type: MarketType,
        time_unit: TimeUnit,
    ) -> Result<Self, ConfigError> {
        if min_epoch == 0 {
            return Err(ConfigError::NonPositiveMinEpoch(min_epoch));
        }
        if max_epoch <= min_epoch {
            return Err(ConfigError::InvertedRange {
                min: min_epoch,
                max: max_epoch,
            });
        }
        if granularity < 1 {
            return Err(ConfigError::ZeroGranularity(granularity));
        }

        Ok(Self {
            min_epoch,
            max_epoch,
            granularity,
            market_type,
            time_unit,
        })
    }

    /// Log-spaced epoch candidate grid.
    ///
    /// `epoch_i = min * (max/min)^(i/(n-1))`, rounded to the nearest
    /// integer, deduplicated, ascending. A granularity below 2
    /// degenerates to `[min_epoch]`.
    pub fn epoch_grid(&self) -> Vec<u32> {
        if self.granularity < 2 {
            return vec![self.min_epoch];
        }

        let min = self.min_epoch as f64;
        let ratio = self.max_epoch as f64 / min;
        let last = (self.granularity - 1) as f64;

        let mut grid: Vec<u32> = (0..self.granularity)
            .map(|i| (min * ratio.powf(i as f64 / last)).round() as u32)
            .collect();
        grid.sort_unstable();
        grid.dedup();
        grid
    }

    /// Prior variance over the true optimal epoch.
    ///
    /// Treats `[min_epoch, max_epoch]` as a 95% credible interval of a
    /// Normal prior, so `prior_std = (max - min) / 3.92`.
    pub fn prior_variance(&self) -> f64 {
        let std = (self.max_epoch - self.min_epoch) as f64 / 3.92;
        std * std
    }

    /// Variance of a single fold's validation-optimal observation.
    ///
    /// A quarter of the prior variance: one observation moves the
    /// posterior meaningfully without dominating it.
    pub fn observation_variance(&self) -> f64 {
        self.prior_variance() / 4.0
    }

    /// Midpoint of the search range; the prior posterior mean.
    pub fn prior_mean(&self) -> f64 {
        (self.min_epoch as f64 + self.max_epoch as f64) / 2.0
    }
}
