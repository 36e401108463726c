//! Embedding provider abstraction.
//!
//! Defines the async `EmbeddingProvider` trait and supporting types for
//! pluggable embedding backends. Two backends implement it: a local
//! feature-hashing vectorizer for offline use and tests, and an
//! OpenAI-compatible HTTP adapter for hosted models.
//!
//! Embedding is a distinct responsibility from text generation, so this trait
//! lives apart from `LlmProvider` and stays object-safe (`Send + Sync`) for
//! use across Tokio tasks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::embedding_provider_hash::HashEmbeddingProvider;
use super::embedding_provider_openai::OpenAIEmbeddingProvider;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during embedding operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmbeddingError {
    /// Authentication failed (invalid or missing API key).
    AuthenticationFailed { message: String },

    /// The requested model was not found or is not available.
    ModelNotFound { model: String },

    /// The provider is not reachable or not running.
    ProviderUnavailable { message: String },

    /// The input batch exceeds the provider's maximum batch size.
    BatchSizeLimitExceeded {
        requested: usize,
        max_allowed: usize,
    },

    /// The input text exceeds the provider's maximum token/character limit.
    InputTooLong { message: String },

    /// A network or connection error occurred.
    NetworkError { message: String },

    /// The provider returned an unexpected or unparseable response.
    ParseError { message: String },

    /// The provider returned an HTTP error.
    ServerError {
        message: String,
        status: Option<u16>,
    },

    /// Rate limit exceeded.
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },

    /// Configuration is invalid or incomplete.
    InvalidConfig { message: String },

    /// Any other error.
    Other { message: String },
}

impl fmt::Display for EmbeddingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationFailed { message } => {
                write!(f, "authentication failed: {}", message)
            }
            Self::ModelNotFound { model } => write!(f, "model not found: {}", model),
            Self::ProviderUnavailable { message } => {
                write!(f, "provider unavailable: {}", message)
            }
            Self::BatchSizeLimitExceeded {
                requested,
                max_allowed,
            } => write!(
                f,
                "batch size {} exceeds maximum {}",
                requested, max_allowed
            ),
            Self::InputTooLong { message } => write!(f, "input too long: {}", message),
            Self::NetworkError { message } => write!(f, "network error: {}", message),
            Self::ParseError { message } => write!(f, "parse error: {}", message),
            Self::ServerError { message, status } => {
                if let Some(code) = status {
                    write!(f, "server error (HTTP {}): {}", code, message)
                } else {
                    write!(f, "server error: {}", message)
                }
            }
            Self::RateLimited { message, .. } => write!(f, "rate limited: {}", message),
            Self::InvalidConfig { message } => write!(f, "invalid config: {}", message),
            Self::Other { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for EmbeddingError {}

impl EmbeddingError {
    /// Whether this error is transient and the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EmbeddingError::NetworkError { .. }
                | EmbeddingError::RateLimited { .. }
                | EmbeddingError::ServerError { .. }
                | EmbeddingError::ProviderUnavailable { .. }
        )
    }

    /// For rate-limited errors, return the suggested wait time in seconds.
    pub fn retry_after_secs(&self) -> Option<u64> {
        if let EmbeddingError::RateLimited { retry_after, .. } = self {
            retry_after.map(|s| s as u64)
        } else {
            None
        }
    }
}

/// Convenience alias for embedding operation results.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

// ---------------------------------------------------------------------------
// Provider type enum
// ---------------------------------------------------------------------------

/// Identifies the embedding backend type.
///
/// Each variant corresponds to a concrete `EmbeddingProvider` implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// Local feature-hash vectorization (no network, deterministic).
    FeatureHash,
    /// OpenAI embedding models (text-embedding-3-small, etc.).
    #[serde(rename = "open_ai")]
    OpenAI,
}

impl EmbeddingProviderType {
    /// Parse a provider identifier as written in configuration.
    ///
    /// Accepts the serde name, the display form, and common shorthands,
    /// case-insensitively.
    pub fn parse_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "feature_hash" | "feature-hash" | "featurehash" | "hash" => Some(Self::FeatureHash),
            "open_ai" | "openai" => Some(Self::OpenAI),
            _ => None,
        }
    }

    /// Returns the default capability metadata for this provider type.
    pub fn default_capability(&self) -> EmbeddingProviderCapability {
        match self {
            Self::FeatureHash => EmbeddingProviderCapability {
                provider_type: *self,
                display_name: "Feature Hash (Local)".to_string(),
                is_local: true,
                requires_api_key: false,
                default_model: "feature-hash-v1".to_string(),
                default_dimension: 256,
                max_batch_size: 1024,
                supported_dimensions: None,
            },
            Self::OpenAI => EmbeddingProviderCapability {
                provider_type: *self,
                display_name: "OpenAI".to_string(),
                is_local: false,
                requires_api_key: true,
                default_model: "text-embedding-3-small".to_string(),
                default_dimension: 1536,
                max_batch_size: 2048,
                supported_dimensions: Some(vec![256, 512, 1024, 1536, 3072]),
            },
        }
    }

    /// Returns all supported provider types.
    pub fn all() -> &'static [EmbeddingProviderType] {
        &[Self::FeatureHash, Self::OpenAI]
    }
}

impl fmt::Display for EmbeddingProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FeatureHash => write!(f, "feature_hash"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider configuration
// ---------------------------------------------------------------------------

/// Configuration for an embedding provider instance.
///
/// Used to construct a concrete `EmbeddingProvider` implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingProviderConfig {
    /// The embedding backend type.
    pub provider: EmbeddingProviderType,

    /// Model identifier (e.g., "text-embedding-3-small", "feature-hash-v1").
    pub model: String,

    /// API key for remote providers. Not needed for the local provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override for the provider API. If `None`, the provider's
    /// default endpoint is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Desired embedding dimension. If `None`, the provider's default is used.
    /// OpenAI v3 models support Matryoshka dimension reduction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    /// Maximum number of texts to embed in a single request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    32
}

impl EmbeddingProviderConfig {
    /// Create a new configuration with defaults for the given provider type.
    pub fn new(provider: EmbeddingProviderType) -> Self {
        let capability = provider.default_capability();
        Self {
            provider,
            model: capability.default_model,
            api_key: None,
            base_url: None,
            dimension: None,
            batch_size: capability.max_batch_size.min(default_batch_size()),
        }
    }

    /// Validate the configuration.
    ///
    /// Returns `Ok(())` if the configuration is valid, or an `EmbeddingError`
    /// describing the first validation failure.
    pub fn validate(&self) -> EmbeddingResult<()> {
        let capability = self.provider.default_capability();

        if capability.requires_api_key && self.api_key.is_none() {
            return Err(EmbeddingError::InvalidConfig {
                message: format!(
                    "{} requires an API key but none was provided",
                    capability.display_name
                ),
            });
        }

        if self.model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                message: "model name must not be empty".to_string(),
            });
        }

        if self.batch_size == 0 {
            return Err(EmbeddingError::InvalidConfig {
                message: "batch_size must be at least 1".to_string(),
            });
        }
        if self.batch_size > capability.max_batch_size {
            return Err(EmbeddingError::InvalidConfig {
                message: format!(
                    "batch_size {} exceeds {} maximum of {}",
                    self.batch_size, capability.display_name, capability.max_batch_size
                ),
            });
        }

        if let Some(dim) = self.dimension {
            if dim == 0 {
                return Err(EmbeddingError::InvalidConfig {
                    message: "dimension must be at least 1".to_string(),
                });
            }
            if let Some(ref supported) = capability.supported_dimensions {
                if !supported.contains(&dim) {
                    return Err(EmbeddingError::InvalidConfig {
                        message: format!(
                            "dimension {} is not supported by {}; supported: {:?}",
                            dim, capability.display_name, supported
                        ),
                    });
                }
            }
        }

        Ok(())
    }

    /// Returns whether this configuration targets a local provider.
    pub fn is_local(&self) -> bool {
        self.provider.default_capability().is_local
    }

    /// Returns the effective dimension: the configured dimension or the
    /// provider's default.
    pub fn effective_dimension(&self) -> usize {
        self.dimension
            .unwrap_or(self.provider.default_capability().default_dimension)
    }

    /// Returns the effective model name (trimmed).
    pub fn effective_model(&self) -> &str {
        self.model.trim()
    }
}

// ---------------------------------------------------------------------------
// Provider capability metadata
// ---------------------------------------------------------------------------

/// Metadata describing a provider's capabilities and defaults.
///
/// Used for provider selection and config validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingProviderCapability {
    /// Which provider this describes.
    pub provider_type: EmbeddingProviderType,

    /// Human-readable display name (e.g., "OpenAI").
    pub display_name: String,

    /// Whether this provider runs locally (no network calls).
    pub is_local: bool,

    /// Whether this provider requires an API key.
    pub requires_api_key: bool,

    /// The default model identifier for this provider.
    pub default_model: String,

    /// Default embedding dimension for the default model.
    pub default_dimension: usize,

    /// Maximum number of texts that can be embedded in one batch.
    pub max_batch_size: usize,

    /// If the provider supports multiple output dimensions, list them here.
    /// `None` means any positive dimension is accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_dimensions: Option<Vec<usize>>,
}

// ---------------------------------------------------------------------------
// Embedding provider trait
// ---------------------------------------------------------------------------

/// Async trait for embedding providers.
///
/// Implementations produce dense vector representations of text. The trait is
/// object-safe and requires `Send + Sync` so providers can be shared across
/// Tokio tasks.
///
/// # Example
///
/// ```ignore
/// let provider: Box<dyn EmbeddingProvider> = create_provider(&config)?;
/// let vectors = provider.embed_documents(&["hello world", "foo bar"]).await?;
/// let query_vec = provider.embed_query("search term").await?;
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of document texts into dense vectors.
    ///
    /// Each input string produces one vector of `self.dimension()` length,
    /// returned in input order.
    async fn embed_documents(&self, documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Embed a single query text into a dense vector.
    ///
    /// The default implementation delegates to `embed_documents` with a
    /// single-element slice.
    async fn embed_query(&self, query: &str) -> EmbeddingResult<Vec<f32>> {
        let results = self.embed_documents(&[query]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Other {
                message: "embed_documents returned empty results for single query".to_string(),
            })
    }

    /// Returns the dimensionality of the embedding vectors produced.
    fn dimension(&self) -> usize;

    /// Check if the provider is healthy and reachable.
    ///
    /// Always succeeds for the local provider. API providers validate
    /// connectivity and credentials.
    async fn health_check(&self) -> EmbeddingResult<()>;

    /// Returns whether this provider runs locally without network calls.
    fn is_local(&self) -> bool;

    /// Returns the maximum number of texts accepted in a single batch call.
    fn max_batch_size(&self) -> usize;

    /// Returns the provider type identifier.
    fn provider_type(&self) -> EmbeddingProviderType;

    /// Returns a human-readable name for this provider instance.
    fn display_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Provider factory
// ---------------------------------------------------------------------------

/// Build a provider instance from its configuration.
///
/// # Errors
///
/// Returns `EmbeddingError::InvalidConfig` if config validation fails.
pub fn create_provider(
    config: &EmbeddingProviderConfig,
) -> EmbeddingResult<Box<dyn EmbeddingProvider>> {
    config.validate()?;
    match config.provider {
        EmbeddingProviderType::FeatureHash => Ok(Box::new(HashEmbeddingProvider::new(config))),
        EmbeddingProviderType::OpenAI => Ok(Box::new(OpenAIEmbeddingProvider::new(config))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
