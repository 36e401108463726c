//! Gemini Provider
//!
//! Implementation of the LlmProvider trait for Google's Gemini API
//! (`generateContent` over REST). Works against any Gemini-compatible
//! gateway via the `base_url` configuration option.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{
    GenerationRequest, GenerationResponse, LlmError, LlmResult, ProviderConfig, StopReason,
    UsageStats,
};
use crate::http_client::build_http_client;

/// Default Gemini API base URL.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider.
pub struct GeminiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

impl GeminiProvider {
    /// Create a new Gemini provider with the given configuration.
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client();
        Self { config, client }
    }

    /// Get the API base URL.
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(GEMINI_API_BASE)
    }

    /// Endpoint for `generateContent` on the configured model.
    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url(),
            self.config.model
        )
    }

    /// Build the request body for the API.
    fn build_request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "generationConfig": {
                "temperature": request.temperature.unwrap_or(self.config.temperature),
                "maxOutputTokens": request
                    .max_output_tokens
                    .unwrap_or(self.config.max_output_tokens),
            },
        });

        if let Some(system) = &request.system {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": system }],
            });
        }

        body
    }

    /// Pull a human-readable message out of a Gemini error body.
    fn extract_error_message(body_text: &str) -> String {
        // Structured errors look like {"error": {"code", "message", "status"}}.
        // Fall back to the raw body when that shape does not parse.
        serde_json::from_str::<GeminiErrorResponse>(body_text)
            .ok()
            .and_then(|r| r.error)
            .and_then(|d| d.message)
            .unwrap_or_else(|| body_text.to_string())
    }

    /// Parse a successful response into a `GenerationResponse`.
    fn parse_response(&self, response: GeminiResponse) -> LlmResult<GenerationResponse> {
        let model = response
            .model_version
            .unwrap_or_else(|| self.config.model.clone());

        let usage = response
            .usage_metadata
            .map(|u| UsageStats {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ParseError {
                message: "response contained no candidates".to_string(),
            })?;

        let stop_reason = candidate
            .finish_reason
            .as_deref()
            .map(StopReason::from)
            .unwrap_or(StopReason::EndTurn);

        // A safety-blocked candidate arrives with an empty parts list; that is
        // a valid (empty) response, not a parse failure.
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

        Ok(GenerationResponse {
            text,
            model,
            stop_reason,
            usage,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: GenerationRequest) -> LlmResult<GenerationResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("gemini"))?;

        let body = self.build_request_body(&request);
        debug!(model = %self.config.model, prompt_len = request.prompt.len(), "gemini generate");

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if status != 200 {
            let message = Self::extract_error_message(&body_text);
            return Err(parse_http_error(status, &message, "gemini"));
        }

        let gemini_response: GeminiResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        self.parse_response(gemini_response)
    }

    async fn health_check(&self) -> LlmResult<()> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("gemini"))?;

        // models.get is free and verifies both the key and the model name.
        let url = format!("{}/models/{}", self.base_url(), self.config.model);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", api_key)
            .send()
            .await
            .map_err(|e| LlmError::ProviderUnavailable {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.unwrap_or_default();
            let message = Self::extract_error_message(&body_text);
            return Err(parse_http_error(status, &message, "gemini"));
        }

        Ok(())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with(model: &str) -> GeminiProvider {
        GeminiProvider::new(ProviderConfig {
            model: model.to_string(),
            api_key: Some("test-key".to_string()),
            base_url: None,
            max_output_tokens: 1024,
            temperature: 0.5,
        })
    }

    #[test]
    fn generate_url_includes_model() {
        let provider = provider_with("gemini-2.5-flash");
        assert_eq!(
            provider.generate_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn base_url_override_respected() {
        let provider = GeminiProvider::new(ProviderConfig {
            base_url: Some("http://localhost:9999/v1beta".to_string()),
            ..ProviderConfig::default()
        });
        assert!(provider.generate_url().starts_with("http://localhost:9999/v1beta/models/"));
    }

    #[test]
    fn request_body_carries_prompt_and_limits() {
        let provider = provider_with("gemini-2.5-flash");
        let request = GenerationRequest::new("describe a duck").with_max_output_tokens(64);
        let body = provider.build_request_body(&request);

        assert_eq!(body["contents"][0]["parts"][0]["text"], "describe a duck");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 64);
        // No system instruction unless requested.
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn request_body_includes_system_instruction() {
        let provider = provider_with("gemini-2.5-flash");
        let request = GenerationRequest::new("hi").with_system("you are terse");
        let body = provider.build_request_body(&request);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "you are terse");
    }

    #[test]
    fn parse_response_joins_parts() {
        let provider = provider_with("gemini-2.5-flash");
        let raw = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "world" }] },
                "finishReason": "STOP",
            }],
            "usageMetadata": { "promptTokenCount": 3, "candidatesTokenCount": 2 },
            "modelVersion": "gemini-2.5-flash-001",
        });
        let parsed: GeminiResponse = serde_json::from_value(raw).unwrap();
        let response = provider.parse_response(parsed).unwrap();

        assert_eq!(response.text, "Hello world");
        assert_eq!(response.model, "gemini-2.5-flash-001");
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.usage.input_tokens, Some(3));
        assert_eq!(response.usage.output_tokens, Some(2));
    }

    #[test]
    fn parse_response_safety_block_is_empty_not_error() {
        let provider = provider_with("gemini-2.5-flash");
        let raw = serde_json::json!({
            "candidates": [{ "finishReason": "SAFETY" }],
        });
        let parsed: GeminiResponse = serde_json::from_value(raw).unwrap();
        let response = provider.parse_response(parsed).unwrap();

        assert!(response.is_empty());
        assert_eq!(response.stop_reason, StopReason::Safety);
    }

    #[test]
    fn parse_response_without_candidates_is_parse_error() {
        let provider = provider_with("gemini-2.5-flash");
        let parsed: GeminiResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        let err = provider.parse_response(parsed).unwrap_err();
        assert!(matches!(err, LlmError::ParseError { .. }));
    }

    #[test]
    fn extract_error_message_prefers_structured_detail() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(GeminiProvider::extract_error_message(body), "Quota exceeded");
        assert_eq!(GeminiProvider::extract_error_message("plain text"), "plain text");
    }

    #[tokio::test]
    async fn generate_without_api_key_fails_fast() {
        let provider = GeminiProvider::new(ProviderConfig::default());
        let err = provider
            .generate(GenerationRequest::new("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::AuthenticationFailed { .. }));
    }
}
