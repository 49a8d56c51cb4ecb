//! Pareto-optimal epoch candidate selection.
//!
//! Trades walk-forward efficiency against training cost: the frontier is
//! the set of candidates no other candidate beats on both axes, and the
//! pick is a weighted score over the frontier.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One epoch candidate's sweep outcome for a single fold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochCandidate {
    /// Training epochs used.
    pub epoch: u32,
    /// In-sample Sharpe-like statistic.
    pub is_statistic: f64,
    /// Validation (out-of-sample) Sharpe-like statistic.
    pub oos_statistic: f64,
    /// Walk-forward efficiency; `None` when the IS statistic sits below
    /// the noise floor.
    pub wfe: Option<f64>,
    /// Validation sample count behind the statistics.
    pub sample_size: usize,
    /// Training-cost proxy. Defaults to the epoch count itself.
    pub training_cost: f64,
}

impl EpochCandidate {
    /// True if `other` is at least as good on both axes and strictly
    /// better on one. Only meaningful when both candidates carry a WFE.
    fn dominated_by(&self, other: &EpochCandidate) -> bool {
        let (Some(a), Some(b)) = (self.wfe, other.wfe) else {
            return false;
        };
        let as_good = b >= a && other.training_cost <= self.training_cost;
        let strictly = b > a || other.training_cost < self.training_cost;
        as_good && strictly
    }
}

/// How the chosen candidate was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPath {
    /// The frontier had a single member.
    SoleFrontierMember,
    /// Weighted score over a multi-member frontier.
    WeightedScore,
    /// No candidate had a valid WFE; best raw OOS statistic taken.
    BestOosFallback,
}

/// Outcome of frontier selection for one fold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierSelection {
    /// Non-dominated candidates, ascending by cost. Empty in the
    /// fallback path.
    pub frontier: Vec<EpochCandidate>,
    /// The candidate picked for this fold.
    pub chosen: EpochCandidate,
    pub path: SelectionPath,
}

/// Picks a fold's validation-optimal epoch from the swept candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierSelector {
    /// Weight on normalized WFE in the frontier score.
    pub wfe_weight: f64,
    /// Weight on normalized (inverted) training cost.
    pub cost_weight: f64,
}

impl Default for FrontierSelector {
    fn default() -> Self {
        Self {
            wfe_weight: 1.0,
            cost_weight: 0.1,
        }
    }
}

impl FrontierSelector {
    /// Non-dominated subset of the candidates with a valid WFE,
    /// ascending by training cost.
    pub fn frontier(&self, candidates: &[EpochCandidate]) -> Vec<EpochCandidate> {
        let mut frontier: Vec<EpochCandidate> = candidates
            .iter()
            .filter(|c| c.wfe.is_some())
            .filter(|c| !candidates.iter().any(|other| c.dominated_by(other)))
            .cloned()
            .collect();
        frontier.sort_by(|a, b| {
            a.training_cost
                .partial_cmp(&b.training_cost)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        frontier
    }

    /// Select the fold's validation-optimal candidate.
    ///
    /// Returns `None` only for an empty candidate set (every training
    /// run timed out).
    pub fn select(&self, candidates: &[EpochCandidate]) -> Option<FrontierSelection> {
        if candidates.is_empty() {
            return None;
        }

        let frontier = self.frontier(candidates);

        if frontier.is_empty() {
            // Nothing distinguishable from noise; take the best raw
            // validation statistic instead.
            let chosen = candidates
                .iter()
                .max_by(|a, b| {
                    a.oos_statistic
                        .partial_cmp(&b.oos_statistic)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })?
                .clone();
            debug!(epoch = chosen.epoch, "no valid WFE, falling back to best OOS");
            return Some(FrontierSelection {
                frontier,
                chosen,
                path: SelectionPath::BestOosFallback,
            });
        }

        if frontier.len() == 1 {
            return Some(FrontierSelection {
                chosen: frontier[0].clone(),
                frontier,
                path: SelectionPath::SoleFrontierMember,
            });
        }

        let chosen = self.score_frontier(&frontier);
        Some(FrontierSelection {
            frontier,
            chosen,
            path: SelectionPath::WeightedScore,
        })
    }

    /// Weighted score over a multi-member frontier: min-max normalize
    /// WFE and inverted cost, take the argmax of the weighted sum.
    fn score_frontier(&self, frontier: &[EpochCandidate]) -> EpochCandidate {
        let wfes: Vec<f64> = frontier.iter().map(|c| c.wfe.unwrap_or(0.0)).collect();
        let costs: Vec<f64> = frontier.iter().map(|c| c.training_cost).collect();

        let (wfe_min, wfe_max) = min_max(&wfes);
        let (cost_min, cost_max) = min_max(&costs);

        let mut best_idx = 0;
        let mut best_score = f64::NEG_INFINITY;
        for i in 0..frontier.len() {
            let wfe_norm = normalize(wfes[i], wfe_min, wfe_max);
            let cost_norm = 1.0 - normalize(costs[i], cost_min, cost_max);
            let score = self.wfe_weight * wfe_norm + self.cost_weight * cost_norm;
            if score > best_score {
                best_score = score;
                best_idx = i;
            }
        }

        frontier[best_idx].clone()
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    (min, max)
}

fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max - min <= f64::EPSILON {
        return 0.0;
    }
    (value - min) / (max - min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(epoch: u32, wfe: Option<f64>, oos: f64) -> EpochCandidate {
        EpochCandidate {
            epoch,
            is_statistic: 1.0,
            oos_statistic: oos,
            wfe,
            sample_size: 400,
            training_cost: epoch as f64,
        }
    }

    #[test]
    fn test_dominated_candidates_excluded() {
        // 200 epochs with lower WFE than 100 epochs is dominated.
        let candidates = vec![
            candidate(100, Some(0.6), 0.6),
            candidate(200, Some(0.5), 0.5),
            candidate(400, Some(0.8), 0.8),
        ];
        let selector = FrontierSelector::default();
        let frontier = selector.frontier(&candidates);

        let epochs: Vec<u32> = frontier.iter().map(|c| c.epoch).collect();
        assert_eq!(epochs, vec![100, 400]);
    }

    #[test]
    fn test_frontier_never_contains_dominated_member() {
        let candidates = vec![
            candidate(100, Some(0.30), 0.3),
            candidate(211, Some(0.55), 0.5),
            candidate(447, Some(0.45), 0.4),
            candidate(945, Some(0.70), 0.6),
            candidate(2000, Some(0.65), 0.7),
        ];
        let selector = FrontierSelector::default();
        let frontier = selector.frontier(&candidates);

        assert!(!frontier.is_empty());
        for member in &frontier {
            for other in &candidates {
                assert!(
                    !member.dominated_by(other),
                    "epoch {} dominated by epoch {}",
                    member.epoch,
                    other.epoch
                );
            }
        }
    }

    #[test]
    fn test_single_member_frontier_returned_directly() {
        // One candidate strictly dominates everything.
        let candidates = vec![
            candidate(100, Some(0.9), 0.9),
            candidate(200, Some(0.5), 0.5),
            candidate(400, Some(0.4), 0.4),
        ];
        let selection = FrontierSelector::default().select(&candidates).unwrap();
        assert_eq!(selection.path, SelectionPath::SoleFrontierMember);
        assert_eq!(selection.chosen.epoch, 100);
    }

    #[test]
    fn test_weighted_score_favors_wfe() {
        // Default weights (1.0 vs 0.1): the high-WFE, high-cost member
        // wins over the cheap, low-WFE one.
        let candidates = vec![
            candidate(100, Some(0.40), 0.4),
            candidate(2000, Some(0.80), 0.8),
        ];
        let selection = FrontierSelector::default().select(&candidates).unwrap();
        assert_eq!(selection.path, SelectionPath::WeightedScore);
        assert_eq!(selection.chosen.epoch, 2000);
    }

    #[test]
    fn test_cost_weight_breaks_near_ties() {
        let selector = FrontierSelector {
            wfe_weight: 1.0,
            cost_weight: 10.0,
        };
        let candidates = vec![
            candidate(100, Some(0.60), 0.6),
            candidate(2000, Some(0.61), 0.61),
        ];
        let selection = selector.select(&candidates).unwrap();
        assert_eq!(selection.chosen.epoch, 100);
    }

    #[test]
    fn test_fallback_to_best_oos() {
        let candidates = vec![
            candidate(100, None, 0.2),
            candidate(200, None, 0.5),
            candidate(400, None, 0.3),
        ];
        let selection = FrontierSelector::default().select(&candidates).unwrap();
        assert_eq!(selection.path, SelectionPath::BestOosFallback);
        assert_eq!(selection.chosen.epoch, 200);
        assert!(selection.frontier.is_empty());
    }

    #[test]
    fn test_empty_candidate_set() {
        assert!(FrontierSelector::default().select(&[]).is_none());
    }
}
