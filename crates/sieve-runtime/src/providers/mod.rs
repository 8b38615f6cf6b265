//! Text-completion providers for sieve-runtime.
//!
//! The pipeline depends on a single capability: send a system prompt and a
//! user prompt, get back free text that probably contains JSON. Everything
//! behind that capability sits behind [`LlmProvider`] so tests can script
//! responses and embedding applications can bring their own backend.
//!
//! ## Security
//!
//! Providers hold their keys in [`ApiCredential`], which never prints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::resilience::Stage;

mod factory;
pub mod secrets;

#[cfg(feature = "gemini")]
mod gemini;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "gemini")]
pub use gemini::{GeminiProvider, GeminiProviderFactory, GEMINI_API_KEY_ENV};

/// Errors from text-completion providers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Circuit open for {0} stage")]
    CircuitOpen(Stage),

    #[error("Token budget exhausted for {0} stage")]
    BudgetExhausted(Stage),
}

impl ProviderError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::HttpError(_)
            | ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_) => true,
            ProviderError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Failures that say something about the backend's health.
    ///
    /// Gating errors raised before a call is made do not count.
    pub fn counts_against_circuit(&self) -> bool {
        !matches!(
            self,
            ProviderError::CircuitOpen(_)
                | ProviderError::BudgetExhausted(_)
                | ProviderError::NotConfigured(_)
        )
    }
}

/// Configuration for a completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (0.0 for deterministic)
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,

    /// Ask the backend for a JSON response body where supported
    pub json_response: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            max_tokens: 512,
            temperature: 0.0,
            timeout: Duration::from_secs(20),
            json_response: true,
        }
    }
}

/// A chat message for completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,

    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Response from a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// Generated text, untrusted
    pub content: String,

    pub usage: TokenUsage,

    /// Model that actually served the request
    pub model: String,

    pub stop_reason: Option<String>,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Tokens in the prompt, including cached tokens
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,

    /// Prompt tokens served from the backend's context cache
    pub cached_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Provider abstraction so backends can be swapped.
///
/// This is the only place model calls are made. The firewall and the
/// reporter never see a provider.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Check if provider is healthy.
    async fn health_check(&self) -> bool;

    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Estimate tokens for a prompt.
    fn estimate_tokens(&self, text: &str) -> u32 {
        // ~4 chars per token
        u32::try_from(text.len() / 4).unwrap_or(u32::MAX)
    }
}
