//! Text-Generation Provider Trait
//!
//! Defines the common interface for all generation providers.

use async_trait::async_trait;

use super::types::{GenerationRequest, GenerationResponse, LlmError, LlmResult, ProviderConfig};

/// Trait that all text-generation providers must implement.
///
/// Provides a unified interface for:
/// - Single-shot prompt completions (generate)
/// - Health checking
///
/// The trait is object-safe and `Send + Sync` so a provider can be shared
/// across concurrently executing pipeline tasks behind an `Arc`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Complete a prompt and return the full response.
    ///
    /// Providers may fail transiently (network, rate limits); callers are
    /// expected to catch the error at the task boundary and degrade to a
    /// structured error result rather than propagate it.
    async fn generate(&self, request: GenerationRequest) -> LlmResult<GenerationResponse>;

    /// Check if the provider is healthy and reachable.
    ///
    /// For API providers this validates connectivity and the API key without
    /// spending a full generation.
    async fn health_check(&self) -> LlmResult<()>;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;
}

/// Helper function to create an error for a missing API key.
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("{} API key is not configured", provider),
    }
}

/// Map an HTTP error status and body to a structured `LlmError`.
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{} rejected the API key: {}", provider, body),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{} denied access: {}", provider, body),
        },
        404 => LlmError::ModelNotFound {
            model: format!("{} (provider: {})", body, provider),
        },
        429 => LlmError::RateLimited {
            message: format!("{} rate limit exceeded: {}", provider, body),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: format!("{} bad request: {}", provider, body),
        },
        500..=599 => LlmError::ServerError {
            message: format!("{} server error: {}", provider, body),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("{} unexpected HTTP {}: {}", provider, status, body),
        },
    }
}
