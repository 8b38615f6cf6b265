//! Immutable end-of-run snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::stats::{EntitySummary, ErrorEntry, RunDetails, RunStats};
use crate::types::EntityType;

/// Firewall throughput for the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirewallSummary {
    pub checks: u64,
    pub rejected: u64,
    pub passed: u64,
    pub uncertain: u64,

    /// Fraction of checks rejected before any model call
    pub efficiency: f64,
}

/// Classification distribution for the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationSummary {
    pub total: u64,
    pub by_type: BTreeMap<EntityType, u64>,
    pub firewall_heuristic: u64,
    pub llm_classification: u64,
    pub errors: u64,
}

/// Final dispositions for the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeSummary {
    pub approved: u64,
    pub review: u64,
    pub rejected: u64,
    pub approval_rate: f64,
    pub review_rate: f64,
}

/// Spend for the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    pub total_usd: f64,

    /// `None` when nothing was approved
    pub per_approved_usd: Option<f64>,
}

/// Read-only summary of a run, produced by `RunReporter::finalize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub entities_processed: u64,
    pub firewall: FirewallSummary,
    pub classification: ClassificationSummary,
    pub outcomes: OutcomeSummary,
    pub average_confidence: Option<f64>,
    pub average_match_score: Option<f64>,
    pub cost: CostSummary,

    /// Best approved entities, highest score first
    pub top_approved: Vec<EntitySummary>,

    /// Best entities awaiting review, highest score first
    pub top_review: Vec<EntitySummary>,

    /// Most recent errors, newest last
    pub recent_errors: Vec<ErrorEntry>,
    pub errors_total: u64,
}

impl RunReport {
    pub(crate) fn build(
        label: &str,
        started_at: DateTime<Utc>,
        stats: &RunStats,
        details: &RunDetails,
        top_n: usize,
    ) -> Self {
        let processed = stats.finalized_count();

        let firewall = FirewallSummary {
            checks: stats.heuristic_checks,
            rejected: stats.heuristic_rejected,
            passed: stats.heuristic_passed,
            uncertain: stats.heuristic_uncertain,
            efficiency: ratio(stats.heuristic_rejected, stats.heuristic_checks),
        };

        let classification = ClassificationSummary {
            total: stats.classifications,
            by_type: stats.classified_by_type.clone(),
            firewall_heuristic: stats.firewall_classifications,
            llm_classification: stats.llm_classifications,
            errors: stats.classification_errors,
        };

        let outcomes = OutcomeSummary {
            approved: stats.approved_count,
            review: stats.review_count,
            rejected: stats.rejected_count,
            approval_rate: ratio(stats.approved_count, processed),
            review_rate: ratio(stats.review_count, processed),
        };

        let cost = CostSummary {
            total_usd: stats.total_cost_usd,
            per_approved_usd: (stats.approved_count > 0)
                .then(|| stats.total_cost_usd / stats.approved_count as f64),
        };

        let skip = details.errors.len().saturating_sub(top_n);

        Self {
            label: label.to_string(),
            started_at,
            finished_at: Utc::now(),
            entities_processed: processed,
            firewall,
            classification,
            outcomes,
            average_confidence: stats.confidence.mean(),
            average_match_score: stats.match_score.mean(),
            cost,
            top_approved: top_entities(&details.approved, top_n),
            top_review: top_entities(&details.review, top_n),
            recent_errors: details.errors[skip..].to_vec(),
            errors_total: stats.errors_count,
        }
    }

    /// Render as a Markdown report.
    pub fn to_markdown(&self) -> String {
        super::markdown::render(self)
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Highest score first, then confidence, then name for a stable order.
fn rank(a: &EntitySummary, b: &EntitySummary) -> Ordering {
    b.match_score
        .cmp(&a.match_score)
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.company.cmp(&b.company))
}

fn top_entities(entries: &[EntitySummary], n: usize) -> Vec<EntitySummary> {
    let mut ranked = entries.to_vec();
    ranked.sort_by(rank);
    ranked.truncate(n);
    ranked
}
