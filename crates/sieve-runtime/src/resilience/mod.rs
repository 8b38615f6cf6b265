//! Resilience for model calls.
//!
//! - [`CircuitBreaker`]: stop calling a stage's model after repeated failures
//! - [`BudgetTracker`]: per-stage and global token budgets, plus spend
//! - [`Pacer`]: caller-configured spacing between call starts
//! - [`RetryPolicy`]: caller-configured retry of transient failures
//!
//! [`CallGuard`] bundles the breaker and the budget so the classifier and
//! scorer gate their calls the same way.

mod budget;
mod circuit_breaker;
mod pacing;
mod retry;

pub use budget::{BudgetTracker, LlmUsage, TokenBudget};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use pacing::{Pacer, RateLimit};
pub use retry::RetryPolicy;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::capability::ModelCapability;
use crate::providers::{CompletionResponse, ProviderError};

/// A pipeline stage that calls a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classification,
    Scoring,
}

impl Stage {
    pub const ALL: [Stage; 2] = [Stage::Classification, Stage::Scoring];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Classification => "classification",
            Stage::Scoring => "scoring",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completion that passed the guard, with its estimated spend.
#[derive(Debug, Clone)]
pub struct GuardedCompletion {
    pub response: CompletionResponse,
    pub spend_usd: f64,
}

/// Circuit breaker and token budget shared by every stage of a run.
#[derive(Debug, Clone, Default)]
pub struct CallGuard {
    circuit: Arc<CircuitBreaker>,
    budget: Arc<BudgetTracker>,
}

impl CallGuard {
    pub fn new(circuit: Arc<CircuitBreaker>, budget: Arc<BudgetTracker>) -> Self {
        Self { circuit, budget }
    }

    pub fn circuit(&self) -> &CircuitBreaker {
        &self.circuit
    }

    pub fn budget(&self) -> &BudgetTracker {
        &self.budget
    }

    /// Make one gated call for `stage`.
    ///
    /// Fails fast with [`ProviderError::CircuitOpen`] or
    /// [`ProviderError::BudgetExhausted`] without touching the provider.
    pub async fn call(
        &self,
        stage: Stage,
        capability: &ModelCapability,
        system: &str,
        prompt: &str,
    ) -> Result<GuardedCompletion, ProviderError> {
        if self.circuit.is_open(stage) {
            tracing::warn!(stage = %stage, "Circuit open, skipping model call");
            return Err(ProviderError::CircuitOpen(stage));
        }

        let estimated = capability
            .estimate_tokens(system)
            .saturating_add(capability.estimate_tokens(prompt))
            .saturating_add(capability.config().max_tokens);
        if !self.budget.can_afford(stage, u64::from(estimated)) {
            tracing::warn!(
                stage = %stage,
                estimated_tokens = estimated,
                "Token budget exhausted, skipping model call"
            );
            return Err(ProviderError::BudgetExhausted(stage));
        }

        match capability.complete(system, prompt).await {
            Ok(response) => {
                self.circuit.record_success(stage);
                let spend_usd = self
                    .budget
                    .record_usage(stage, &response.usage, &response.model);
                Ok(GuardedCompletion {
                    response,
                    spend_usd,
                })
            }
            Err(e) => {
                if e.counts_against_circuit() {
                    self.circuit.record_failure(stage);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        ChatMessage, CompletionConfig, LlmProvider, TokenUsage,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for Flaky {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderError::HttpError("connection reset".to_string()));
            }
            Ok(CompletionResponse {
                content: "{}".to_string(),
                usage: TokenUsage {
                    prompt_tokens: 1000,
                    completion_tokens: 100,
                    cached_tokens: 0,
                },
                model: config.model.clone(),
                stop_reason: None,
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn capability(fail: bool) -> (Arc<Flaky>, ModelCapability) {
        let provider = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            fail,
        });
        let capability = ModelCapability::new(provider.clone(), CompletionConfig::default());
        (provider, capability)
    }

    #[tokio::test]
    async fn test_success_records_spend() {
        let (_, capability) = capability(false);
        let guard = CallGuard::default();

        let completion = guard
            .call(Stage::Classification, &capability, "system", "prompt")
            .await
            .unwrap();
        assert!(completion.spend_usd > 0.0);
        assert_eq!(guard.budget().usage().llm_calls, 1);
    }

    #[tokio::test]
    async fn test_open_circuit_skips_provider() {
        let (provider, capability) = capability(true);
        let guard = CallGuard::new(
            Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
                failure_threshold: 2,
                ..Default::default()
            })),
            Arc::new(BudgetTracker::unlimited()),
        );

        for _ in 0..2 {
            assert!(guard
                .call(Stage::Scoring, &capability, "s", "p")
                .await
                .is_err());
        }
        let err = guard
            .call(Stage::Scoring, &capability, "s", "p")
            .await
            .unwrap_err();

        assert_eq!(err, ProviderError::CircuitOpen(Stage::Scoring));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        // The other stage is unaffected
        assert!(!guard.circuit().is_open(Stage::Classification));
    }

    #[tokio::test]
    async fn test_exhausted_budget_skips_provider() {
        let (provider, capability) = capability(false);
        let guard = CallGuard::new(
            Arc::new(CircuitBreaker::default()),
            Arc::new(BudgetTracker::new(Some(100), None)),
        );

        let err = guard
            .call(Stage::Classification, &capability, "s", "p")
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::BudgetExhausted(Stage::Classification));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
