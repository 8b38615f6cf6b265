//! Scripted provider shared by the stage tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::capability::ModelCapability;
use crate::prompts::CLASSIFICATION_SYSTEM_PROMPT;
use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Text(String),
    Fail(ProviderError),
}

/// Answers classification and scoring prompts with fixed replies and
/// counts the calls per stage.
pub(crate) struct ScriptedProvider {
    classification: Reply,
    scoring: Reply,
    classification_calls: AtomicU32,
    scoring_calls: AtomicU32,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        let unscripted = Reply::Fail(ProviderError::HttpError("unscripted call".to_string()));
        Self {
            classification: unscripted.clone(),
            scoring: unscripted,
            classification_calls: AtomicU32::new(0),
            scoring_calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn classify_with(mut self, content: impl Into<String>) -> Self {
        self.classification = Reply::Text(content.into());
        self
    }

    pub(crate) fn score_with(mut self, content: impl Into<String>) -> Self {
        self.scoring = Reply::Text(content.into());
        self
    }

    pub(crate) fn fail_classification(mut self, error: ProviderError) -> Self {
        self.classification = Reply::Fail(error);
        self
    }

    pub(crate) fn fail_scoring(mut self, error: ProviderError) -> Self {
        self.scoring = Reply::Fail(error);
        self
    }

    pub(crate) fn classification_calls(&self) -> u32 {
        self.classification_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn scoring_calls(&self) -> u32 {
        self.scoring_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn into_capability(self) -> (Arc<Self>, ModelCapability) {
        let provider = Arc::new(self);
        let capability = ModelCapability::new(provider.clone(), CompletionConfig::default());
        (provider, capability)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let is_classification = messages
            .first()
            .is_some_and(|m| m.content == CLASSIFICATION_SYSTEM_PROMPT);

        let reply = if is_classification {
            self.classification_calls.fetch_add(1, Ordering::SeqCst);
            &self.classification
        } else {
            self.scoring_calls.fetch_add(1, Ordering::SeqCst);
            &self.scoring
        };

        match reply {
            Reply::Text(content) => Ok(CompletionResponse {
                content: content.clone(),
                usage: TokenUsage {
                    prompt_tokens: 800,
                    completion_tokens: 120,
                    cached_tokens: 0,
                },
                model: config.model.clone(),
                stop_reason: Some("STOP".to_string()),
            }),
            Reply::Fail(error) => Err(error.clone()),
        }
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
