//! Fit scoring against the target profile.

use sieve_core::{parse_structured, ScoreResult, TargetProfile};

use crate::capability::ModelCapability;
use crate::classifier::DEFAULT_CHAR_LIMIT;
use crate::payload::ScorePayload;
use crate::prompts::{build_scoring_prompt, SCORING_SYSTEM_PROMPT};
use crate::resilience::{CallGuard, Stage};

/// Rates classified entities against a [`TargetProfile`].
///
/// Like the classifier, scoring never fails: every problem becomes an
/// error-sourced [`ScoreResult`] with score 0 and a REJECTED recommendation.
#[derive(Debug, Clone)]
pub struct MatchScorer {
    capability: ModelCapability,
    guard: CallGuard,
    target: TargetProfile,
    char_limit: usize,
}

impl MatchScorer {
    /// Scorer for the built-in family office profile.
    pub fn new(capability: ModelCapability) -> Self {
        Self {
            capability,
            guard: CallGuard::default(),
            target: TargetProfile::default(),
            char_limit: DEFAULT_CHAR_LIMIT,
        }
    }

    pub fn with_target(mut self, target: TargetProfile) -> Self {
        self.target = target;
        self
    }

    pub fn with_guard(mut self, guard: CallGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_char_limit(mut self, char_limit: usize) -> Self {
        self.char_limit = char_limit;
        self
    }

    pub fn target(&self) -> &TargetProfile {
        &self.target
    }

    /// Score one entity. `is_sfo` is the classifier's single-family hint.
    pub async fn score(
        &self,
        company_name: &str,
        company_profile: &str,
        geography: &str,
        is_sfo: Option<bool>,
    ) -> ScoreResult {
        let prompt = build_scoring_prompt(
            company_name,
            company_profile,
            geography,
            is_sfo,
            &self.target,
            self.char_limit,
        );

        let completion = match self
            .guard
            .call(Stage::Scoring, &self.capability, SCORING_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(completion) => completion,
            Err(e) => {
                tracing::warn!(company = company_name, error = %e, "Scoring call failed");
                return ScoreResult::error(e.to_string());
            }
        };

        let parsed = parse_structured::<ScorePayload>(&completion.response.content)
            .map_err(|e| e.to_string())
            .and_then(|parsed| parsed.value.into_result(completion.spend_usd));

        match parsed {
            Ok(score) => {
                if let Some(recommendation) = score.recommendation {
                    if recommendation != score.threshold_recommendation() {
                        tracing::debug!(
                            company = company_name,
                            match_score = score.match_score,
                            recommendation = %recommendation,
                            "Model recommendation differs from score thresholds"
                        );
                    }
                }
                tracing::debug!(
                    company = company_name,
                    match_score = score.match_score,
                    confidence = score.confidence,
                    "Scored"
                );
                score
            }
            Err(message) => {
                tracing::warn!(
                    company = company_name,
                    error = %message,
                    "Unusable scoring response"
                );
                let mut score = ScoreResult::error(message);
                score.spend_usd = completion.spend_usd;
                score
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use crate::testing::ScriptedProvider;
    use sieve_core::{CostTag, Recommendation, ScoreSource};

    #[tokio::test]
    async fn test_model_recommendation_is_kept() {
        let (provider, capability) = ScriptedProvider::new()
            .score_with(
                r#"{"match_score": 7, "confidence": 0.8, "fit_reasons": ["direct deals"],
                    "geo_match": true, "asset_focus": ["multifamily"],
                    "capital_indicators": ["co-invests"], "recommendation": "APPROVED",
                    "reasoning": "Direct investor."}"#,
            )
            .into_capability();
        let scorer = MatchScorer::new(capability);

        let score = scorer
            .score("Smith Family Office", "Invests in multifamily", "Texas", Some(true))
            .await;

        assert_eq!(score.match_score, 7);
        assert_eq!(score.recommendation, Some(Recommendation::Approved));
        assert_eq!(score.source, ScoreSource::LlmScoring);
        assert_eq!(score.cost, CostTag::GeminiCall);
        assert!(score.geo_match);
        assert!(score.spend_usd > 0.0);
        assert_eq!(provider.scoring_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_recommendation_falls_back_to_thresholds() {
        let (_, capability) = ScriptedProvider::new()
            .score_with(r#"Here you go: {"match_score": 5, "confidence": 0.6}"#)
            .into_capability();
        let scorer = MatchScorer::new(capability);

        let score = scorer.score("Acme", "", "", None).await;

        assert_eq!(score.recommendation, None);
        assert_eq!(score.disposition(), Recommendation::Review);
    }

    #[tokio::test]
    async fn test_failure_is_zero_and_rejected() {
        let (_, capability) = ScriptedProvider::new()
            .fail_scoring(ProviderError::ApiError {
                status: 503,
                message: "overloaded".to_string(),
            })
            .into_capability();
        let scorer = MatchScorer::new(capability);

        let score = scorer.score("Acme", "", "", Some(false)).await;

        assert!(score.is_error());
        assert_eq!(score.match_score, 0);
        assert_eq!(score.confidence, 0.0);
        assert_eq!(score.recommendation, Some(Recommendation::Rejected));
        assert_eq!(score.cost, CostTag::Error);
        assert!(score.reasoning.contains("overloaded"));
    }

    #[tokio::test]
    async fn test_scoreless_response_is_error() {
        let (_, capability) = ScriptedProvider::new()
            .score_with(r#"{"confidence": 0.9, "recommendation": "APPROVED"}"#)
            .into_capability();
        let scorer = MatchScorer::new(capability);

        let score = scorer.score("Acme", "", "", None).await;

        assert!(score.is_error());
        assert_eq!(score.disposition(), Recommendation::Rejected);
        assert!(score.spend_usd > 0.0);
    }
}
