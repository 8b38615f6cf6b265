//! Credential handling for providers.
//!
//! Keys are wrapped in [`secrecy::SecretString`] as soon as they are read.
//! `Debug` and `Display` never include the key; the only way to the raw value
//! is [`ApiCredential::expose`], called at the point a request header is set.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

use super::ProviderError;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Config,
    Environment,
    Programmatic,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::Config => "config",
            CredentialSource::Environment => "environment",
            CredentialSource::Programmatic => "programmatic",
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-blank, trimmed value of `config[key]`.
fn config_value(config: &JsonValue, key: &str) -> Option<String> {
    config
        .get(key)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Non-blank, trimmed value of an environment variable.
fn env_value(env_var: &str) -> Option<String> {
    std::env::var(env_var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A provider API key that never prints.
///
/// Blank keys are treated as absent, so an empty `api_key` in config falls
/// through to the environment instead of producing a 401 later.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    label: &'static str,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, source: CredentialSource, label: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            label,
        }
    }

    /// Load from an environment variable.
    pub fn from_env(env_var: &str, label: &'static str) -> Result<Self, ProviderError> {
        env_value(env_var)
            .map(|v| Self::new(v, CredentialSource::Environment, label))
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!("{} missing: export {}", label, env_var))
            })
    }

    /// Load from `config[config_key]`, falling back to `env_var`.
    pub fn from_config_or_env(
        config: &JsonValue,
        config_key: &str,
        env_var: &str,
        label: &'static str,
    ) -> Result<Self, ProviderError> {
        config_value(config, config_key)
            .map(|v| Self::new(v, CredentialSource::Config, label))
            .or_else(|| {
                env_value(env_var).map(|v| Self::new(v, CredentialSource::Environment, label))
            })
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "{} missing: set \"{}\" in provider config or export {}",
                    label, config_key, env_var
                ))
            })
    }

    /// Whether a credential could be loaded, without loading it.
    pub fn is_available(config: &JsonValue, config_key: &str, env_var: &str) -> bool {
        config_value(config, config_key).is_some() || env_value(env_var).is_some()
    }

    /// The raw key. Call only where the request header is built.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().trim().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("label", &self.label)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, redacted)", self.label, self.source)
    }
}
