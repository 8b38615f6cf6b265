//! Run-level reporting.
//!
//! The [`RunReporter`] is an append-only accumulator for one batch. It is
//! the only shared mutable object in a run: every `record_*` call takes
//! `&self` and updates state under a single lock, so concurrent workers can
//! share one reporter through an `Arc`.
//!
//! Each call is O(1) and touches only the counters and list for its own
//! event. Nothing is re-derived from other state, so an entity is counted
//! exactly once per recorded event.

mod markdown;
mod report;
mod stats;

pub use report::{ClassificationSummary, CostSummary, FirewallSummary, OutcomeSummary, RunReport};
pub use stats::{EntitySummary, ErrorEntry, RunDetails, RunStats, RunningMean};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::types::{
    clamp_confidence, ClassificationResult, ClassificationSource, FirewallDecision,
    FirewallVerdict, FoStatus,
};

/// Default length of the top-N lists in a report.
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Default)]
struct ReporterState {
    stats: RunStats,
    details: RunDetails,
}

/// Batch-scoped accumulator of pipeline events.
#[derive(Debug)]
pub struct RunReporter {
    label: String,
    started_at: DateTime<Utc>,
    top_n: usize,
    state: Mutex<ReporterState>,
}

impl RunReporter {
    /// Start a new run.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started_at: Utc::now(),
            top_n: DEFAULT_TOP_N,
            state: Mutex::new(ReporterState::default()),
        }
    }

    /// Set the length of the top-N lists in the finalized report.
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Record one firewall decision.
    pub fn record_heuristic_check(&self, decision: &FirewallDecision) {
        let mut state = self.state.lock();
        let stats = &mut state.stats;
        stats.heuristic_checks += 1;
        match decision.decision {
            FirewallVerdict::Reject => stats.heuristic_rejected += 1,
            FirewallVerdict::Pass => stats.heuristic_passed += 1,
            FirewallVerdict::Uncertain => stats.heuristic_uncertain += 1,
        }
    }

    /// Record the classification of one entity.
    pub fn record_entity_classification(&self, company: &str, classification: &ClassificationResult) {
        tracing::trace!(
            company = company,
            entity_type = %classification.entity_type,
            source = classification.source.as_str(),
            "Recording classification"
        );

        let mut state = self.state.lock();
        let stats = &mut state.stats;
        stats.classifications += 1;
        *stats
            .classified_by_type
            .entry(classification.entity_type)
            .or_insert(0) += 1;
        match classification.source {
            ClassificationSource::FirewallHeuristic => stats.firewall_classifications += 1,
            ClassificationSource::LlmClassification => stats.llm_classifications += 1,
            ClassificationSource::Error => stats.classification_errors += 1,
        }
    }

    /// Record the final status of one entity.
    ///
    /// `match_score` is `None` for entities stopped before scoring or whose
    /// scoring failed. `confidence` is clamped to [0, 1].
    pub fn record_final_status(
        &self,
        company: &str,
        fo_status: FoStatus,
        match_score: Option<u8>,
        confidence: f64,
    ) {
        let confidence = clamp_confidence(confidence);
        let summary = EntitySummary {
            company: company.to_string(),
            match_score,
            confidence,
        };

        let mut state = self.state.lock();
        let ReporterState { stats, details } = &mut *state;

        match fo_status {
            FoStatus::Approved => {
                stats.approved_count += 1;
                details.approved.push(summary);
            }
            FoStatus::Review => {
                stats.review_count += 1;
                details.review.push(summary);
            }
            FoStatus::Rejected => {
                stats.rejected_count += 1;
                details.rejected.push(summary);
            }
        }

        stats.confidence.push(confidence);
        if let Some(score) = match_score {
            stats.match_score.push(f64::from(score));
        }
    }

    /// Record a failure for one entity.
    pub fn record_error(&self, company: &str, error: impl Into<String>) {
        let entry = ErrorEntry {
            company: company.to_string(),
            error: error.into(),
        };

        let mut state = self.state.lock();
        state.stats.errors_count += 1;
        state.details.errors.push(entry);
    }

    /// Record model spend in USD. Negative or non-finite amounts are ignored.
    pub fn record_cost(&self, usd: f64) {
        if !usd.is_finite() || usd < 0.0 {
            tracing::warn!(usd = usd, "Ignoring invalid cost");
            return;
        }
        self.state.lock().stats.total_cost_usd += usd;
    }

    /// Copy of the current counters.
    pub fn stats(&self) -> RunStats {
        self.state.lock().stats.clone()
    }

    /// Copy of the current per-entity lists.
    pub fn details(&self) -> RunDetails {
        self.state.lock().details.clone()
    }

    /// Snapshot the run into an immutable report.
    pub fn finalize(&self) -> RunReport {
        let state = self.state.lock();
        RunReport::build(
            &self.label,
            self.started_at,
            &state.stats,
            &state.details,
            self.top_n,
        )
    }

    /// Render the finalized report as Markdown.
    pub fn to_markdown(&self) -> String {
        self.finalize().to_markdown()
    }
}
