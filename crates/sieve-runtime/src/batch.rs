//! Concurrent batch runs.
//!
//! Entities are independent, so a batch fans out over a bounded number of
//! in-flight pipelines. Everything shared (reporter, pacer, circuit
//! breaker, budget) is internally synchronized.

use futures::stream::{self, StreamExt};
use std::sync::Arc;

use sieve_core::{PipelineOutcome, RunReport, RunReporter};

use crate::orchestrator::{EntityInput, OrchestratorError, PipelineOrchestrator};

/// Result of one batch.
#[derive(Debug)]
pub struct BatchSummary {
    /// One entry per input, in input order
    pub outcomes: Vec<Result<PipelineOutcome, OrchestratorError>>,

    pub report: RunReport,
}

impl BatchSummary {
    /// Outcomes that made it through the pipeline.
    pub fn completed(&self) -> impl Iterator<Item = &PipelineOutcome> {
        self.outcomes.iter().filter_map(|r| r.as_ref().ok())
    }
}

/// Runs a batch of entities through one orchestrator.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    orchestrator: Arc<PipelineOrchestrator>,
    concurrency: usize,
    top_n: usize,
}

impl BatchRunner {
    /// Concurrency and report size come from the orchestrator's config.
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        let concurrency = orchestrator.config().pipeline.concurrency;
        let top_n = orchestrator.config().report.top_n;
        Self {
            orchestrator,
            concurrency,
            top_n,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Process every input and finalize a report labelled `label`.
    pub async fn run(&self, label: &str, inputs: Vec<EntityInput>) -> BatchSummary {
        let reporter = Arc::new(RunReporter::new(label).with_top_n(self.top_n));
        let total = inputs.len();

        tracing::info!(
            label = label,
            entities = total,
            concurrency = self.concurrency,
            "Starting batch"
        );

        let mut indexed: Vec<(usize, Result<PipelineOutcome, OrchestratorError>)> =
            stream::iter(inputs.into_iter().enumerate())
                .map(|(index, input)| {
                    let orchestrator = Arc::clone(&self.orchestrator);
                    let reporter = Arc::clone(&reporter);
                    async move {
                        let result = orchestrator.process(&input, &reporter).await;
                        (index, result)
                    }
                })
                .buffer_unordered(self.concurrency.max(1))
                .collect()
                .await;

        indexed.sort_by_key(|(index, _)| *index);
        let outcomes = indexed.into_iter().map(|(_, result)| result).collect();

        let report = reporter.finalize();
        tracing::info!(
            label = label,
            entities = total,
            approved = report.outcomes.approved,
            review = report.outcomes.review,
            rejected = report.outcomes.rejected,
            errors = report.errors_total,
            total_cost_usd = report.cost.total_usd,
            "Batch complete"
        );

        BatchSummary { outcomes, report }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::resilience::{Pacer, RateLimit};
    use crate::testing::ScriptedProvider;
    use proptest::prelude::*;
    use sieve_core::FoStatus;
    use std::time::Duration;
    use tokio::time::Instant;

    const FAMILY_OFFICE: &str =
        r#"{"entity_type": "FAMILY_OFFICE", "entity_subtype": "SFO", "confidence": 0.9}"#;
    const APPROVED: &str = r#"{"match_score": 8, "confidence": 0.8, "recommendation": "APPROVED"}"#;

    fn runner(provider: ScriptedProvider) -> (Arc<ScriptedProvider>, BatchRunner) {
        let provider = Arc::new(provider);
        let orchestrator = PipelineOrchestrator::builder()
            .provider(provider.clone())
            .build()
            .unwrap();
        (provider, BatchRunner::new(Arc::new(orchestrator)))
    }

    fn mixed_inputs() -> Vec<EntityInput> {
        vec![
            EntityInput::new("Summit Advisors", "Wealth management for our clients"),
            EntityInput::new("Acme Holdings LLC", "Acme Holdings LLC"),
            EntityInput::new("", "nameless"),
            EntityInput::new("Vanguard-ish", "A family of mutual funds and ETFs"),
            EntityInput::new("Beta Holdings LLC", "Beta Holdings LLC"),
        ]
    }

    #[tokio::test]
    async fn test_outcomes_in_input_order() {
        let (_, runner) = runner(
            ScriptedProvider::new()
                .classify_with(FAMILY_OFFICE)
                .score_with(APPROVED),
        );

        let summary = runner.run("mixed", mixed_inputs()).await;

        assert_eq!(summary.outcomes.len(), 5);
        let names: Vec<_> = summary
            .outcomes
            .iter()
            .map(|r| r.as_ref().map(|o| o.company.as_str()).unwrap_or("-"))
            .collect();
        assert_eq!(
            names,
            vec!["Summit Advisors", "Acme Holdings LLC", "-", "Vanguard-ish", "Beta Holdings LLC"]
        );
        assert_eq!(summary.completed().count(), 4);
    }

    #[tokio::test]
    async fn test_report_sum_invariant() {
        let (provider, runner) = runner(
            ScriptedProvider::new()
                .classify_with(FAMILY_OFFICE)
                .score_with(APPROVED),
        );

        let summary = runner.run("mixed", mixed_inputs()).await;
        let report = &summary.report;

        let outcomes = &report.outcomes;
        assert_eq!(outcomes.approved + outcomes.review + outcomes.rejected, 4);
        assert_eq!(outcomes.approved, 2);
        assert_eq!(outcomes.rejected, 2);
        assert_eq!(report.errors_total, 1);
        assert_eq!(report.firewall.checks, 4);
        assert_eq!(report.firewall.rejected, 2);
        assert_eq!(provider.classification_calls(), 2);
        assert_eq!(provider.scoring_calls(), 2);
        assert!(report.cost.total_usd > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_pacer_bounds_call_rate() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .classify_with(FAMILY_OFFICE)
                .score_with(APPROVED),
        );
        let pacer = Arc::new(Pacer::new(RateLimit::FixedInterval {
            interval: Duration::from_secs(1),
        }));
        let orchestrator = PipelineOrchestrator::builder()
            .provider(provider.clone())
            .pacer(pacer)
            .build()
            .unwrap();
        let runner = BatchRunner::new(Arc::new(orchestrator)).with_concurrency(8);

        let inputs = (0..3)
            .map(|i| EntityInput::new(format!("Entity {}", i), "No signals here"))
            .collect();
        let start = Instant::now();
        let summary = runner.run("paced", inputs).await;

        // Six calls, one second apart after the first
        assert_eq!(provider.classification_calls() + provider.scoring_calls(), 6);
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(summary.report.outcomes.approved, 3);
    }

    #[test]
    fn test_concurrency_from_config() {
        let config = RuntimeConfig::from_yaml("pipeline: { concurrency: 16 }").unwrap();
        let orchestrator = PipelineOrchestrator::builder()
            .provider(Arc::new(ScriptedProvider::new()))
            .config(config)
            .build()
            .unwrap();

        let runner = BatchRunner::new(Arc::new(orchestrator));
        assert_eq!(runner.concurrency, 16);
        assert_eq!(runner.with_concurrency(0).concurrency, 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_every_named_entity_gets_one_status(
            names in proptest::collection::vec("[A-Za-z ]{0,12}", 0..12)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let (_, runner) = runner(
                ScriptedProvider::new()
                    .classify_with(FAMILY_OFFICE)
                    .score_with(APPROVED),
            );
            let inputs: Vec<_> = names
                .iter()
                .map(|n| EntityInput::new(n.clone(), "text"))
                .collect();
            let blank = names.iter().filter(|n| n.trim().is_empty()).count() as u64;

            let summary = rt.block_on(runner.run("prop", inputs));
            let o = &summary.report.outcomes;

            prop_assert_eq!(o.approved + o.review + o.rejected, names.len() as u64 - blank);
            prop_assert_eq!(summary.report.errors_total, blank);
            prop_assert!(summary
                .completed()
                .all(|outcome| outcome.fo_status == FoStatus::Approved));
        }
    }
}
