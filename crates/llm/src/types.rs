//! Shared types for the text-generation provider layer.
//!
//! Defines the request/response model, usage accounting, provider
//! configuration, and the `LlmError` taxonomy. Kept dependency-light so the
//! main application crate can re-export these types without pulling in any
//! provider-specific SDK.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A single text-generation request.
///
/// The pipeline builds prompts as plain strings; multi-turn chat state is
/// out of scope for this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The user prompt to complete.
    pub prompt: String,
    /// Optional system instruction prepended by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Sampling temperature override. `None` uses the provider config value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum output tokens override. `None` uses the provider config value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create a request with just a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Attach a system instruction.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Override the output token budget.
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Why a generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model finished its turn normally.
    EndTurn,
    /// The output token budget was exhausted.
    MaxTokens,
    /// The provider's safety layer truncated or blocked the output.
    Safety,
    /// Any other provider-specific reason.
    Other,
}

impl From<&str> for StopReason {
    fn from(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "STOP" | "END_TURN" | "FINISH" => StopReason::EndTurn,
            "MAX_TOKENS" | "LENGTH" => StopReason::MaxTokens,
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => StopReason::Safety,
            _ => StopReason::Other,
        }
    }
}

/// Token usage statistics reported by the provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageStats {
    /// Tokens consumed by the prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,
    /// Tokens produced in the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u32>,
}

/// A completed text-generation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// The generated text. Empty when the provider blocked the output.
    pub text: String,
    /// The model that produced the response.
    pub model: String,
    /// Why the response ended.
    pub stop_reason: StopReason,
    /// Token usage statistics.
    pub usage: UsageStats,
}

impl GenerationResponse {
    /// Whether the response carries any usable text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Provider configuration
// ---------------------------------------------------------------------------

/// Configuration for a text-generation provider instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model identifier (e.g., "gemini-2.5-flash").
    pub model: String,
    /// API key. `None` is rejected at call time, not construction time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override for OpenAI/Gemini-compatible gateways.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Default maximum output tokens.
    pub max_output_tokens: u32,
    /// Default sampling temperature.
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            base_url: None,
            max_output_tokens: 4096,
            temperature: 0.7,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error types for text-generation operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmError {
    /// Authentication failed (invalid or missing API key).
    AuthenticationFailed { message: String },
    /// Rate limit exceeded.
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },
    /// Model not found or not available.
    ModelNotFound { model: String },
    /// Invalid request (bad parameters).
    InvalidRequest { message: String },
    /// Server error from the provider.
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// Network/connection error.
    NetworkError { message: String },
    /// Response parsing error.
    ParseError { message: String },
    /// Provider not reachable.
    ProviderUnavailable { message: String },
    /// Other error.
    Other { message: String },
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::AuthenticationFailed { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            LlmError::RateLimited { message, .. } => {
                write!(f, "Rate limited: {}", message)
            }
            LlmError::ModelNotFound { model } => {
                write!(f, "Model not found: {}", model)
            }
            LlmError::InvalidRequest { message } => {
                write!(f, "Invalid request: {}", message)
            }
            LlmError::ServerError { message, status } => {
                if let Some(s) = status {
                    write!(f, "Server error ({}): {}", s, message)
                } else {
                    write!(f, "Server error: {}", message)
                }
            }
            LlmError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            LlmError::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            LlmError::ProviderUnavailable { message } => {
                write!(f, "Provider unavailable: {}", message)
            }
            LlmError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    /// Whether this error is transient and the call may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. }
                | LlmError::ServerError { .. }
                | LlmError::NetworkError { .. }
                | LlmError::ProviderUnavailable { .. }
        )
    }
}

/// Result type for text-generation operations.
pub type LlmResult<T> = Result<T, LlmError>;
