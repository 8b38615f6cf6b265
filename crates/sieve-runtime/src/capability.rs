//! The text-completion capability handed to each stage.
//!
//! A [`ModelCapability`] is a provider bound to one stage's settings. The
//! classifier and the scorer each receive their own, so they can run on
//! different models or different backends entirely.

use std::fmt;
use std::sync::Arc;

use crate::providers::{ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError};
use crate::resilience::{Pacer, RetryPolicy};

/// Provider plus completion settings, pacing and retry for one stage.
#[derive(Clone)]
pub struct ModelCapability {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
    pacer: Option<Arc<Pacer>>,
    retry: RetryPolicy,
}

impl ModelCapability {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig) -> Self {
        Self {
            provider,
            config,
            pacer: None,
            retry: RetryPolicy::none(),
        }
    }

    /// Share a pacer with other capabilities hitting the same backend.
    pub fn with_pacer(mut self, pacer: Arc<Pacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn estimate_tokens(&self, text: &str) -> u32 {
        self.provider.estimate_tokens(text)
    }

    /// Send one system + user prompt pair and return the raw response.
    ///
    /// Every attempt is paced and bounded by the configured timeout.
    pub async fn complete(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<CompletionResponse, ProviderError> {
        self.retry.run(|| self.attempt(system, prompt)).await
    }

    async fn attempt(&self, system: &str, prompt: &str) -> Result<CompletionResponse, ProviderError> {
        if let Some(pacer) = &self.pacer {
            pacer.acquire().await;
        }

        let messages = vec![ChatMessage::system(system), ChatMessage::user(prompt)];
        let timeout = self.config.timeout;

        match tokio::time::timeout(timeout, self.provider.complete(messages, &self.config)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    model = %self.config.model,
                    timeout = ?timeout,
                    "Model call timed out"
                );
                Err(ProviderError::Timeout(timeout))
            }
        }
    }
}

impl fmt::Debug for ModelCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCapability")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .field("paced", &self.pacer.is_some())
            .field("retry", &self.retry)
            .finish()
    }
}
