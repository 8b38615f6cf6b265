//! Entity classification: firewall first, model only when needed.
//!
//! The classifier never fails. Transport errors, open circuits, exhausted
//! budgets and unparseable responses all come back as an error-sourced
//! [`ClassificationResult`] that the orchestrator routes to REJECTED.

use std::sync::Arc;

use sieve_core::{parse_structured, ClassificationResult, FirewallDecision, HeuristicFirewall};

use crate::cache::{CacheKey, ClassificationCache};
use crate::capability::ModelCapability;
use crate::payload::ClassificationPayload;
use crate::prompts::{build_classification_prompt, CLASSIFICATION_SYSTEM_PROMPT};
use crate::resilience::{CallGuard, Stage};

/// Characters of company text sent to the model by default.
pub const DEFAULT_CHAR_LIMIT: usize = 2000;

/// Classifies entities using the heuristic firewall, escalating uncertain
/// cases to the classification capability.
#[derive(Debug, Clone)]
pub struct EntityClassifier {
    firewall: HeuristicFirewall,
    capability: ModelCapability,
    guard: CallGuard,
    cache: Option<Arc<ClassificationCache>>,
    char_limit: usize,
}

impl EntityClassifier {
    pub fn new(capability: ModelCapability) -> Self {
        Self {
            firewall: HeuristicFirewall::new(),
            capability,
            guard: CallGuard::default(),
            cache: None,
            char_limit: DEFAULT_CHAR_LIMIT,
        }
    }

    pub fn with_firewall(mut self, firewall: HeuristicFirewall) -> Self {
        self.firewall = firewall;
        self
    }

    /// Share a circuit breaker and budget with other stages.
    pub fn with_guard(mut self, guard: CallGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_cache(mut self, cache: Arc<ClassificationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_char_limit(mut self, char_limit: usize) -> Self {
        self.char_limit = char_limit;
        self
    }

    pub fn firewall(&self) -> &HeuristicFirewall {
        &self.firewall
    }

    /// Classify one entity.
    pub async fn classify(
        &self,
        company_name: &str,
        company_text: &str,
        domain: &str,
    ) -> ClassificationResult {
        self.classify_with_decision(company_name, company_text, domain)
            .await
            .1
    }

    /// Classify one entity, also returning the firewall decision that
    /// preceded it.
    pub async fn classify_with_decision(
        &self,
        company_name: &str,
        company_text: &str,
        domain: &str,
    ) -> (FirewallDecision, ClassificationResult) {
        let decision = self.firewall.check(company_name, company_text, domain);

        if let Some(result) = ClassificationResult::from_firewall(&decision) {
            tracing::debug!(
                company = company_name,
                verdict = ?decision.decision,
                entity_type = %result.entity_type,
                "Firewall decided, no model call"
            );
            return (decision, result);
        }

        let result = self
            .classify_with_model(company_name, company_text, domain)
            .await;
        (decision, result)
    }

    async fn classify_with_model(
        &self,
        company_name: &str,
        company_text: &str,
        domain: &str,
    ) -> ClassificationResult {
        let key = CacheKey::new(company_name, company_text, domain);
        if let Some(cache) = &self.cache {
            if let Some(mut hit) = cache.get(&key).await {
                tracing::debug!(company = company_name, "Classification cache hit");
                hit.spend_usd = 0.0;
                return hit;
            }
        }

        let prompt =
            build_classification_prompt(company_name, domain, company_text, self.char_limit);

        let completion = match self
            .guard
            .call(
                Stage::Classification,
                &self.capability,
                CLASSIFICATION_SYSTEM_PROMPT,
                &prompt,
            )
            .await
        {
            Ok(completion) => completion,
            Err(e) => {
                tracing::warn!(company = company_name, error = %e, "Classification call failed");
                return ClassificationResult::error(e.to_string());
            }
        };

        match parse_structured::<ClassificationPayload>(&completion.response.content) {
            Ok(parsed) => {
                let result = parsed.value.into_result(completion.spend_usd);
                tracing::debug!(
                    company = company_name,
                    entity_type = %result.entity_type,
                    confidence = result.confidence,
                    strategy = ?parsed.strategy,
                    "Model classification"
                );
                if let Some(cache) = &self.cache {
                    cache.insert(key, result.clone()).await;
                }
                result
            }
            Err(e) => {
                tracing::warn!(
                    company = company_name,
                    error = %e,
                    "Unparseable classification response"
                );
                let mut result = ClassificationResult::error(e.to_string());
                result.spend_usd = completion.spend_usd;
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use crate::resilience::{BudgetTracker, CircuitBreaker, CircuitBreakerConfig};
    use crate::testing::ScriptedProvider;
    use sieve_core::{ClassificationSource, CostTag, EntitySubtype, EntityType, FirewallVerdict};

    const OPERATOR_JSON: &str = r#"{"entity_type": "OPERATOR", "entity_subtype": "UNKNOWN",
        "confidence": 0.8, "signals_positive": [], "signals_negative": ["manages properties for owners"],
        "reason": "Property manager"}"#;

    #[tokio::test]
    async fn test_firewall_reject_skips_model() {
        let (provider, capability) = ScriptedProvider::new().into_capability();
        let classifier = EntityClassifier::new(capability);

        let (decision, result) = classifier
            .classify_with_decision(
                "Summit Advisors",
                "We provide wealth management services to high-net-worth clients",
                "summitadvisors.com",
            )
            .await;

        assert_eq!(decision.decision, FirewallVerdict::Reject);
        assert_eq!(result.entity_type, EntityType::WealthManager);
        assert_eq!(result.entity_subtype, EntitySubtype::Unknown);
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.source, ClassificationSource::FirewallHeuristic);
        assert_eq!(result.cost, CostTag::Free);
        assert_eq!(provider.classification_calls(), 0);
    }

    #[tokio::test]
    async fn test_firewall_pass_skips_model() {
        let (provider, capability) = ScriptedProvider::new().into_capability();
        let classifier = EntityClassifier::new(capability);

        let result = classifier
            .classify(
                "Smith Family Office",
                "The Smith Family Office invests proprietary capital directly in real estate",
                "",
            )
            .await;

        assert_eq!(result.entity_type, EntityType::FamilyOffice);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(provider.classification_calls(), 0);
    }

    #[tokio::test]
    async fn test_uncertain_escalates_to_model() {
        let (provider, capability) = ScriptedProvider::new()
            .classify_with(format!("```json\n{}\n```", OPERATOR_JSON))
            .into_capability();
        let classifier = EntityClassifier::new(capability);

        let (decision, result) = classifier
            .classify_with_decision("Acme Holdings LLC", "Acme Holdings LLC", "acme.com")
            .await;

        assert!(decision.is_uncertain());
        assert_eq!(result.entity_type, EntityType::Operator);
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.source, ClassificationSource::LlmClassification);
        assert_eq!(result.cost, CostTag::GeminiCall);
        assert!(result.spend_usd > 0.0);
        assert_eq!(provider.classification_calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_error_result() {
        let (_, capability) = ScriptedProvider::new()
            .fail_classification(ProviderError::HttpError("connection reset".to_string()))
            .into_capability();
        let classifier = EntityClassifier::new(capability);

        let result = classifier.classify("Acme Holdings LLC", "", "").await;

        assert!(result.is_error());
        assert_eq!(result.entity_type, EntityType::Unknown);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.cost, CostTag::Error);
        assert!(result.error_message().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_prose_response_is_error_with_spend() {
        let (_, capability) = ScriptedProvider::new()
            .classify_with("I think this is probably a family office.")
            .into_capability();
        let classifier = EntityClassifier::new(capability);

        let result = classifier.classify("Acme Holdings LLC", "", "").await;

        assert!(result.is_error());
        assert!(result.spend_usd > 0.0);
    }

    #[tokio::test]
    async fn test_open_circuit_returns_error_without_call() {
        let (provider, capability) = ScriptedProvider::new()
            .fail_classification(ProviderError::Timeout(std::time::Duration::from_secs(1)))
            .into_capability();
        let guard = CallGuard::new(
            Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
                failure_threshold: 1,
                ..Default::default()
            })),
            Arc::new(BudgetTracker::unlimited()),
        );
        let classifier = EntityClassifier::new(capability).with_guard(guard);

        classifier.classify("Acme Holdings LLC", "", "").await;
        let result = classifier.classify("Beta Holdings LLC", "", "").await;

        assert!(result.is_error());
        assert!(result.error_message().unwrap().contains("Circuit open"));
        assert_eq!(provider.classification_calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_avoids_second_call() {
        let (provider, capability) = ScriptedProvider::new()
            .classify_with(OPERATOR_JSON)
            .into_capability();
        let classifier =
            EntityClassifier::new(capability).with_cache(Arc::new(ClassificationCache::default()));

        let first = classifier.classify("Acme Holdings LLC", "Acme", "acme.com").await;
        let second = classifier.classify("Acme Holdings LLC", "Acme", "acme.com").await;

        assert_eq!(provider.classification_calls(), 1);
        assert_eq!(second.entity_type, first.entity_type);
        assert_eq!(second.source, ClassificationSource::LlmClassification);
        assert!(first.spend_usd > 0.0);
        assert_eq!(second.spend_usd, 0.0);
    }
}
