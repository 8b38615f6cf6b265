//! Google Gemini provider.
//!
//! Calls the `generateContent` REST endpoint. System messages become the
//! request's `systemInstruction`; the response MIME type is set to JSON when
//! [`CompletionConfig::json_response`] is on.

use super::{
    factory::ProviderFactory,
    secrets::{ApiCredential, CredentialSource},
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const CREDENTIAL_NAME: &str = "Gemini API key";

/// Gemini text-completion provider.
pub struct GeminiProvider {
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_credential(ApiCredential::new(
            api_key,
            CredentialSource::Programmatic,
            CREDENTIAL_NAME,
        ))
    }

    /// Read the key from `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_env(GEMINI_API_KEY_ENV, CREDENTIAL_NAME)?;
        Ok(Self::with_credential(credential))
    }

    /// Build from JSON config: `api_key` (falls back to `GEMINI_API_KEY`)
    /// and an optional `base_url`.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_config_or_env(
            config,
            "api_key",
            GEMINI_API_KEY_ENV,
            CREDENTIAL_NAME,
        )?;

        let mut provider = Self::with_credential(credential);
        if let Some(url) = config["base_url"].as_str() {
            provider.base_url = url.trim_end_matches('/').to_string();
        }
        Ok(provider)
    }

    fn with_credential(credential: ApiCredential) -> Self {
        Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

// Wire format

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: UsageMetadata,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    cached_content_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

fn build_request(messages: Vec<ChatMessage>, config: &CompletionConfig) -> GenerateRequest {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for msg in messages {
        let part = Part {
            text: Some(msg.content),
        };
        match msg.role.as_str() {
            "system" => system_parts.push(part),
            "assistant" => contents.push(Content {
                role: Some("model".to_string()),
                parts: vec![part],
            }),
            _ => contents.push(Content {
                role: Some("user".to_string()),
                parts: vec![part],
            }),
        }
    }

    GenerateRequest {
        system_instruction: (!system_parts.is_empty()).then(|| Content {
            role: None,
            parts: system_parts,
        }),
        contents,
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_tokens,
            response_mime_type: config.json_response.then_some("application/json"),
        },
    }
}

fn into_completion(body: GenerateResponse, requested_model: &str) -> CompletionResponse {
    let (content, stop_reason) = match body.candidates.into_iter().next() {
        Some(candidate) => {
            let text = candidate
                .content
                .map(|c| {
                    c.parts
                        .into_iter()
                        .filter_map(|p| p.text)
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default();
            (text, candidate.finish_reason)
        }
        None => (String::new(), None),
    };

    CompletionResponse {
        content,
        usage: TokenUsage {
            prompt_tokens: body.usage_metadata.prompt_token_count,
            completion_tokens: body.usage_metadata.candidates_token_count,
            cached_tokens: body.usage_metadata.cached_content_token_count,
        },
        model: body
            .model_version
            .unwrap_or_else(|| requested_model.to_string()),
        stop_reason,
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = build_request(messages, config);

        let response = self
            .client
            .post(self.endpoint(&config.model))
            .header("x-goog-api-key", self.credential.expose())
            .header("content-type", "application/json")
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(config.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::AuthError);
        }

        if !status.is_success() {
            let message = match response.json::<ErrorEnvelope>().await {
                Ok(envelope) => envelope.error.message,
                Err(_) => status.to_string(),
            };
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(into_completion(body, &config.model))
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Factory for [`GeminiProvider`].
///
/// ```json
/// {
///   "api_key": "...",
///   "base_url": "https://generativelanguage.googleapis.com/v1beta"
/// }
/// ```
///
/// Both fields are optional; the key falls back to `GEMINI_API_KEY`.
pub struct GeminiProviderFactory;

impl ProviderFactory for GeminiProviderFactory {
    fn provider_type(&self) -> &'static str {
        "gemini"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        self.validate_config(config)?;
        Ok(Arc::new(GeminiProvider::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if !ApiCredential::is_available(config, "api_key", GEMINI_API_KEY_ENV) {
            return Err(ProviderError::NotConfigured(format!(
                "{} required: set 'api_key' in config or {} env",
                CREDENTIAL_NAME, GEMINI_API_KEY_ENV
            )));
        }

        if let Some(url) = config["base_url"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({ "base_url": DEFAULT_BASE_URL })
    }

    fn description(&self) -> &'static str {
        "Google Gemini generateContent provider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_splits_system_instruction() {
        let messages = vec![
            ChatMessage::system("taxonomy"),
            ChatMessage::user("Acme Holdings"),
            ChatMessage::assistant("{}"),
        ];
        let request = build_request(messages, &CompletionConfig::default());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "taxonomy");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 512);
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_plain_text_mode_omits_mime_type() {
        let config = CompletionConfig {
            json_response: false,
            ..Default::default()
        };
        let request = build_request(vec![ChatMessage::user("hi")], &config);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["generationConfig"].get("responseMimeType").is_none());
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_mapping() {
        let body: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"entity_type\":"}, {"text": " \"REIT\"}"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 420,
                "candidatesTokenCount": 35,
                "cachedContentTokenCount": 100,
                "totalTokenCount": 455
            },
            "modelVersion": "gemini-2.0-flash-001"
        }))
        .unwrap();

        let completion = into_completion(body, "gemini-2.0-flash");
        assert_eq!(completion.content, "{\"entity_type\": \"REIT\"}");
        assert_eq!(completion.usage.prompt_tokens, 420);
        assert_eq!(completion.usage.completion_tokens, 35);
        assert_eq!(completion.usage.cached_tokens, 100);
        assert_eq!(completion.model, "gemini-2.0-flash-001");
        assert_eq!(completion.stop_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_empty_candidates_yield_empty_content() {
        let body: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        let completion = into_completion(body, "gemini-2.5-flash");
        assert!(completion.content.is_empty());
        assert_eq!(completion.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_endpoint_format() {
        let provider = GeminiProvider::new("k").with_base_url("http://localhost:8080");
        assert_eq!(
            provider.endpoint("gemini-2.0-flash"),
            "http://localhost:8080/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_factory_validation() {
        let factory = GeminiProviderFactory;
        assert_eq!(factory.provider_type(), "gemini");
        assert!(factory
            .validate_config(&serde_json::json!({"api_key": "k", "base_url": "ftp://x"}))
            .is_err());

        let provider = factory
            .create(&serde_json::json!({"api_key": "k"}))
            .unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret = "AIza-super-secret-key-12345";
        let provider = GeminiProvider::new(secret);
        let debug = format!("{:?}", provider);
        assert!(!debug.contains(secret));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_health_check_requires_key() {
        assert!(GeminiProvider::new("k").health_check().await);
        assert!(!GeminiProvider::new("").health_check().await);
    }
}
