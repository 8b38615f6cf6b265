//! Runtime configuration.
//!
//! Loaded from YAML. Every field has a default, so an empty document is a
//! valid configuration. Durations are written the human way (`"20s"`,
//! `"500ms"`, `"1m 30s"`).
//!
//! ```yaml
//! classification:
//!   model: gemini-2.0-flash
//!   timeout: 20s
//! scoring:
//!   model: gemini-2.5-flash
//!   retry: { max_retries: 2, min_delay: 1s, max_delay: 10s }
//! pipeline:
//!   unknown_confidence_floor: 0.6
//!   concurrency: 8
//! rate_limit:
//!   kind: fixed_interval
//!   interval: 1s
//! budgets:
//!   global_max_tokens: 2000000
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::providers::CompletionConfig;
use crate::resilience::{CircuitBreakerConfig, RateLimit, RetryPolicy};

/// Errors loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Model settings for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,

    #[serde(with = "human_duration")]
    pub timeout: Duration,

    pub retry: RetryPolicy,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            max_tokens: 768,
            temperature: 0.0,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::none(),
        }
    }
}

impl StageConfig {
    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
            json_response: true,
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::invalid(field, "model must not be empty"));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::invalid(field, "max_tokens must be positive"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::invalid(
                field,
                format!("temperature {} outside [0, 2]", self.temperature),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::invalid(field, "timeout must be positive"));
        }
        Ok(())
    }
}

/// Gating and batch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// UNKNOWN entities below this confidence are rejected without scoring
    pub unknown_confidence_floor: f64,

    /// Characters of company text embedded in prompts
    pub profile_char_limit: usize,

    /// Entities processed at once by the batch runner
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            unknown_confidence_floor: 0.6,
            profile_char_limit: 2000,
            concurrency: 4,
        }
    }
}

/// Token limits. Absent means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub global_max_tokens: Option<u64>,
    pub per_stage_max_tokens: Option<u64>,
}

/// Classification cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,

    #[serde(with = "human_duration")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Report settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub top_n: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub classification: StageConfig,
    pub scoring: StageConfig,
    pub pipeline: PipelineConfig,
    pub rate_limit: RateLimit,
    pub circuit_breaker: CircuitBreakerConfig,
    pub budgets: BudgetConfig,
    pub cache: CacheConfig,
    pub report: ReportConfig,
}

impl RuntimeConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.classification.validate("classification")?;
        self.scoring.validate("scoring")?;

        let floor = self.pipeline.unknown_confidence_floor;
        if !(0.0..=1.0).contains(&floor) {
            return Err(ConfigError::invalid(
                "pipeline.unknown_confidence_floor",
                format!("{} outside [0, 1]", floor),
            ));
        }
        if self.pipeline.concurrency == 0 {
            return Err(ConfigError::invalid(
                "pipeline.concurrency",
                "must be at least 1",
            ));
        }
        if self.pipeline.profile_char_limit == 0 {
            return Err(ConfigError::invalid(
                "pipeline.profile_char_limit",
                "must be positive",
            ));
        }

        if let RateLimit::TokenBucket {
            capacity,
            refill_every,
        } = &self.rate_limit
        {
            if *capacity == 0 {
                return Err(ConfigError::invalid("rate_limit.capacity", "must be positive"));
            }
            if refill_every.is_zero() {
                return Err(ConfigError::invalid(
                    "rate_limit.refill_every",
                    "must be positive",
                ));
            }
        }

        if self.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::invalid(
                "circuit_breaker.failure_threshold",
                "must be at least 1",
            ));
        }
        if self.circuit_breaker.success_threshold == 0 {
            return Err(ConfigError::invalid(
                "circuit_breaker.success_threshold",
                "must be at least 1",
            ));
        }

        Ok(())
    }
}

/// Serde adapter for human-readable durations.
pub(crate) mod human_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
