//! Per-entity pipeline: classify, gate, score.
//!
//! The orchestrator composes the classifier and the scorer with two early
//! exits:
//! - concrete non-family-office types are rejected without scoring
//! - UNKNOWN entities below the confidence floor are rejected without scoring
//!
//! Everything else is scored. Stage failures are already absorbed into
//! error-sourced results, so the only error surfaced here is a contract
//! violation by the caller.

use std::sync::Arc;
use thiserror::Error;

use sieve_core::{
    ClassificationResult, EntityType, FirewallDecision, FoStatus, Gate, HeuristicFirewall,
    PipelineOutcome, RunReporter, TargetProfile,
};

use crate::cache::ClassificationCache;
use crate::capability::ModelCapability;
use crate::classifier::EntityClassifier;
use crate::config::RuntimeConfig;
use crate::providers::LlmProvider;
use crate::resilience::{
    BudgetTracker, CallGuard, CircuitBreaker, CircuitState, LlmUsage, Pacer, RateLimit, Stage,
};
use crate::scorer::MatchScorer;

/// Errors from the orchestrator. Stage failures never show up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No {0} capability configured")]
    MissingCapability(&'static str),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// One entity to classify and score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityInput {
    pub name: String,

    /// Company text, usually scraped website copy
    pub text: String,

    pub domain: String,

    /// Free-text location hint for scoring
    pub geography: String,
}

impl EntityInput {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_geography(mut self, geography: impl Into<String>) -> Self {
        self.geography = geography.into();
        self
    }

    /// Name used in reports, even for invalid input.
    fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            "(unnamed)"
        } else {
            name
        }
    }
}

/// Runs the classify-and-score pipeline for one entity at a time.
///
/// Holds no per-entity state, so one orchestrator can serve a whole batch
/// concurrently.
#[derive(Debug)]
pub struct PipelineOrchestrator {
    classifier: EntityClassifier,
    scorer: MatchScorer,
    guard: CallGuard,
    config: RuntimeConfig,
}

impl PipelineOrchestrator {
    pub fn builder() -> PipelineOrchestratorBuilder {
        PipelineOrchestratorBuilder::default()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn classifier(&self) -> &EntityClassifier {
        &self.classifier
    }

    pub fn scorer(&self) -> &MatchScorer {
        &self.scorer
    }

    /// Token usage and estimated spend across every stage so far.
    pub fn usage(&self) -> LlmUsage {
        self.guard.budget().usage()
    }

    pub fn circuit_state(&self, stage: Stage) -> CircuitState {
        self.guard.circuit().state(stage)
    }

    /// Classify and, if the gates allow, score one entity.
    pub async fn classify_and_score(
        &self,
        input: &EntityInput,
    ) -> Result<PipelineOutcome, OrchestratorError> {
        self.run(input).await.map(|(_, outcome)| outcome)
    }

    /// Run one entity and record it in `reporter`.
    ///
    /// Recording order: firewall decision, classification, error (if a
    /// stage failed), spend (if any), final status. Invalid input is
    /// recorded as an error only.
    pub async fn process(
        &self,
        input: &EntityInput,
        reporter: &RunReporter,
    ) -> Result<PipelineOutcome, OrchestratorError> {
        let (decision, outcome) = match self.run(input).await {
            Ok(result) => result,
            Err(e) => {
                reporter.record_error(input.display_name(), e.to_string());
                return Err(e);
            }
        };

        let company = outcome.company.as_str();
        reporter.record_heuristic_check(&decision);
        reporter.record_entity_classification(company, &outcome.classification);
        if let Some(message) = stage_error(&outcome) {
            reporter.record_error(company, message);
        }
        if outcome.spend_usd > 0.0 {
            reporter.record_cost(outcome.spend_usd);
        }
        reporter.record_final_status(
            company,
            outcome.fo_status,
            outcome
                .score
                .as_ref()
                .filter(|score| !score.is_error())
                .map(|score| score.match_score),
            outcome.combined_confidence,
        );

        Ok(outcome)
    }

    async fn run(
        &self,
        input: &EntityInput,
    ) -> Result<(FirewallDecision, PipelineOutcome), OrchestratorError> {
        let company = input.name.trim();
        if company.is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "entity name must not be blank".to_string(),
            ));
        }

        let (decision, classification) = self
            .classifier
            .classify_with_decision(company, &input.text, &input.domain)
            .await;

        if let Some(gate) = self.gate(&classification) {
            tracing::debug!(
                company = company,
                entity_type = %classification.entity_type,
                confidence = classification.confidence,
                gate = ?gate,
                "Rejected before scoring"
            );
            return Ok((decision, rejected(company, classification, gate)));
        }

        let is_sfo = Some(classification.entity_subtype.implies_sfo());
        let score = self
            .scorer
            .score(company, &input.text, &input.geography, is_sfo)
            .await;

        let fo_status = score.disposition();
        let outcome = PipelineOutcome {
            company: company.to_string(),
            recommendation: score.recommendation,
            fo_status,
            gate: Gate::Scored,
            total_cost: format!("{}+{}", classification.cost, score.cost),
            combined_confidence: (classification.confidence + score.confidence) / 2.0,
            spend_usd: classification.spend_usd + score.spend_usd,
            classification,
            score: Some(score),
        };

        tracing::info!(
            company = company,
            fo_status = %outcome.fo_status,
            total_cost = %outcome.total_cost,
            "Entity scored"
        );

        Ok((decision, outcome))
    }

    fn gate(&self, classification: &ClassificationResult) -> Option<Gate> {
        if classification.entity_type.is_non_family_office() {
            return Some(Gate::EntityTypeGate);
        }
        if classification.entity_type == EntityType::Unknown
            && classification.confidence < self.config.pipeline.unknown_confidence_floor
        {
            return Some(Gate::LowConfidenceGate);
        }
        None
    }
}

fn rejected(company: &str, classification: ClassificationResult, gate: Gate) -> PipelineOutcome {
    PipelineOutcome {
        company: company.to_string(),
        recommendation: None,
        fo_status: FoStatus::Rejected,
        gate,
        total_cost: classification.cost.to_string(),
        combined_confidence: classification.confidence,
        spend_usd: classification.spend_usd,
        classification,
        score: None,
    }
}

fn stage_error(outcome: &PipelineOutcome) -> Option<String> {
    if let Some(message) = outcome.classification.error_message() {
        return Some(format!("classification: {}", message));
    }
    outcome
        .score
        .as_ref()
        .filter(|score| score.is_error())
        .map(|score| format!("scoring: {}", score.reasoning))
}

/// Builder for [`PipelineOrchestrator`].
///
/// Capabilities can be given whole, or as providers that are bound to the
/// stage settings in [`RuntimeConfig`]. A pacer is created from the
/// configured rate limit unless one is supplied, and is shared by both
/// stages.
#[derive(Default)]
pub struct PipelineOrchestratorBuilder {
    firewall: HeuristicFirewall,
    classification_provider: Option<Arc<dyn LlmProvider>>,
    scoring_provider: Option<Arc<dyn LlmProvider>>,
    classification: Option<ModelCapability>,
    scoring: Option<ModelCapability>,
    target: Option<TargetProfile>,
    config: RuntimeConfig,
    cache: Option<Arc<ClassificationCache>>,
    pacer: Option<Arc<Pacer>>,
}

impl PipelineOrchestratorBuilder {
    pub fn firewall(mut self, firewall: HeuristicFirewall) -> Self {
        self.firewall = firewall;
        self
    }

    /// Use one provider for both stages.
    pub fn provider(self, provider: Arc<dyn LlmProvider>) -> Self {
        self.classification_provider(provider.clone())
            .scoring_provider(provider)
    }

    pub fn classification_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.classification_provider = Some(provider);
        self
    }

    pub fn scoring_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.scoring_provider = Some(provider);
        self
    }

    /// Use a fully configured capability for classification, as is.
    pub fn classification_capability(mut self, capability: ModelCapability) -> Self {
        self.classification = Some(capability);
        self
    }

    /// Use a fully configured capability for scoring, as is.
    pub fn scoring_capability(mut self, capability: ModelCapability) -> Self {
        self.scoring = Some(capability);
        self
    }

    pub fn target_profile(mut self, target: TargetProfile) -> Self {
        self.target = Some(target);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cache(mut self, cache: Arc<ClassificationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn pacer(mut self, pacer: Arc<Pacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    /// Fails when the config does not validate or a stage has no model.
    pub fn build(self) -> Result<PipelineOrchestrator, OrchestratorError> {
        let config = self.config;
        config
            .validate()
            .map_err(|e| OrchestratorError::InvalidConfig(e.to_string()))?;

        let pacer = self.pacer.or_else(|| match config.rate_limit {
            RateLimit::Unlimited => None,
            ref limit => Some(Arc::new(Pacer::new(limit.clone()))),
        });

        let bind = |provider: Arc<dyn LlmProvider>, stage: &crate::config::StageConfig| {
            let capability = ModelCapability::new(provider, stage.completion_config())
                .with_retry(stage.retry.clone());
            match &pacer {
                Some(pacer) => capability.with_pacer(Arc::clone(pacer)),
                None => capability,
            }
        };

        let classification = match (self.classification, self.classification_provider) {
            (Some(capability), _) => capability,
            (None, Some(provider)) => bind(provider, &config.classification),
            (None, None) => return Err(OrchestratorError::MissingCapability("classification")),
        };
        let scoring = match (self.scoring, self.scoring_provider) {
            (Some(capability), _) => capability,
            (None, Some(provider)) => bind(provider, &config.scoring),
            (None, None) => return Err(OrchestratorError::MissingCapability("scoring")),
        };

        let guard = CallGuard::new(
            Arc::new(CircuitBreaker::new(config.circuit_breaker.clone())),
            Arc::new(BudgetTracker::new(
                config.budgets.global_max_tokens,
                config.budgets.per_stage_max_tokens,
            )),
        );

        let cache = self.cache.or_else(|| {
            config
                .cache
                .enabled
                .then(|| Arc::new(ClassificationCache::from_config(&config.cache)))
        });

        tracing::debug!(
            classification_provider = classification.provider_name(),
            scoring_provider = scoring.provider_name(),
            rate_limit = ?pacer.as_ref().map(|pacer| pacer.limit()),
            cached = cache.is_some(),
            "Building pipeline orchestrator"
        );

        let char_limit = config.pipeline.profile_char_limit;

        let mut classifier = EntityClassifier::new(classification)
            .with_firewall(self.firewall)
            .with_guard(guard.clone())
            .with_char_limit(char_limit);
        if let Some(cache) = cache {
            classifier = classifier.with_cache(cache);
        }

        let scorer = MatchScorer::new(scoring)
            .with_target(self.target.unwrap_or_default())
            .with_guard(guard.clone())
            .with_char_limit(char_limit);

        Ok(PipelineOrchestrator {
            classifier,
            scorer,
            guard,
            config,
        })
    }
}
