//! # sieve-runtime
//!
//! Model-assisted classification, scoring and batch orchestration for
//! Sieve.
//!
//! `sieve-core` decides what it can for free. This crate owns every model
//! call: it escalates uncertain entities to a classification capability,
//! scores the survivors against a target profile, and runs batches with
//! shared pacing, circuit breaking and token budgets.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sieve_runtime::{BatchRunner, EntityInput, GeminiProvider, PipelineOrchestrator, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_yaml_file("sieve.yaml")?;
//! let orchestrator = PipelineOrchestrator::builder()
//!     .provider(Arc::new(GeminiProvider::from_env()?))
//!     .config(config)
//!     .build()?;
//!
//! let summary = BatchRunner::new(Arc::new(orchestrator))
//!     .run("weekly", vec![EntityInput::new("Acme Holdings LLC", website_text)])
//!     .await;
//! println!("{}", summary.report.to_markdown());
//! ```

pub mod batch;
pub mod cache;
pub mod capability;
pub mod classifier;
pub mod config;
pub mod orchestrator;
mod payload;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod scorer;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use batch::{BatchRunner, BatchSummary};
pub use cache::{CacheKey, ClassificationCache};
pub use capability::ModelCapability;
pub use classifier::EntityClassifier;
pub use config::{ConfigError, RuntimeConfig, StageConfig};
pub use orchestrator::{
    EntityInput, OrchestratorError, PipelineOrchestrator, PipelineOrchestratorBuilder,
};
pub use providers::{
    ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, LlmProvider,
    ProviderError, ProviderRegistry, TokenUsage,
};
pub use resilience::{
    BudgetTracker, CallGuard, CircuitBreaker, CircuitBreakerConfig, LlmUsage, Pacer, RateLimit,
    RetryPolicy, Stage,
};
pub use scorer::MatchScorer;
pub use telemetry::init_tracing;

#[cfg(feature = "gemini")]
pub use providers::{GeminiProvider, GeminiProviderFactory};
