//! Counters and per-entity lists owned by the run reporter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::EntityType;

/// Mean over a stream of values, kept as sum and count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningMean {
    sum: f64,
    count: u64,
}

impl RunningMean {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// `None` until the first value arrives.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Monotonic counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    // Firewall
    pub heuristic_checks: u64,
    pub heuristic_rejected: u64,
    pub heuristic_passed: u64,
    pub heuristic_uncertain: u64,

    // Classification
    pub classifications: u64,
    pub classified_by_type: BTreeMap<EntityType, u64>,
    pub firewall_classifications: u64,
    pub llm_classifications: u64,
    pub classification_errors: u64,

    // Final status
    pub approved_count: u64,
    pub review_count: u64,
    pub rejected_count: u64,

    pub errors_count: u64,
    pub total_cost_usd: f64,

    pub confidence: RunningMean,
    pub match_score: RunningMean,
}

impl RunStats {
    /// Entities that reached a final status.
    pub fn finalized_count(&self) -> u64 {
        self.approved_count + self.review_count + self.rejected_count
    }
}

/// One entity's final disposition, as listed in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub company: String,
    pub match_score: Option<u8>,
    pub confidence: f64,
}

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub company: String,
    pub error: String,
}

/// Per-entity lists for one run.
///
/// `approved`, `review` and `rejected` grow in lockstep with the matching
/// counters in [`RunStats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDetails {
    pub approved: Vec<EntitySummary>,
    pub review: Vec<EntitySummary>,
    pub rejected: Vec<EntitySummary>,
    pub errors: Vec<ErrorEntry>,
}

impl RunDetails {
    pub fn finalized_len(&self) -> usize {
        self.approved.len() + self.review.len() + self.rejected.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_mean_empty() {
        assert_eq!(RunningMean::default().mean(), None);
    }

    #[test]
    fn test_running_mean_is_exact() {
        let mut mean = RunningMean::default();
        for v in [0.2, 0.4, 0.9] {
            mean.push(v);
        }
        assert_eq!(mean.count(), 3);
        assert!((mean.mean().unwrap() - 0.5).abs() < 1e-12);
    }
}
