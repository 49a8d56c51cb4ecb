//! Adaptive walk-forward epoch selection.
//!
//! Decides, per time-ordered fold, how many training epochs a
//! predictive model should use so that in-sample performance transfers
//! to unseen data. A fold's held-out test partition is always scored
//! with the epoch carried forward from *previous* folds' evidence,
//! never with the fold's own validation optimum — that ordering is the
//! engine's core guard against look-ahead bias.

pub mod aggregate;
pub mod bayes;
pub mod config;
pub mod engine;
pub mod frontier;
pub mod metrics;
pub mod split;
pub mod stats;

// Re-export commonly used types
pub use aggregate::{AggregationEngine, FoldStatistic, WfeAggregate};
pub use bayes::{BayesianCarryForward, CarryForwardError, PosteriorState, PosteriorUpdate};
pub use config::{Config, ConfigError, MarketType, TimeUnit};
pub use engine::{
    AggregateReport, EngineError, EpochSelectionEngine, EpochTrainer, FoldResult, FoldStatus,
    SelectionRun, TrainingOutcome,
};
pub use frontier::{EpochCandidate, FrontierSelection, FrontierSelector, SelectionPath};
pub use metrics::{OosMetrics, OosMetricsCalculator, TestSeries};
pub use split::{Fold, NestedSplitter, SplitConfig, SplitError};
pub use stats::{NoiseFloor, TransferQuality};
