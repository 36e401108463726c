//! Application Configuration
//!
//! Configuration loaded from environment variables, with an optional
//! `.env` file picked up from the working directory. Provider-specific
//! settings are converted into typed configs by the accessor methods.

use std::env;

use crate::services::rag::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_WINDOW};
use crate::services::rag::embedding_provider::{EmbeddingProviderConfig, EmbeddingProviderType};
use crate::utils::error::{AppError, AppResult};

/// Load .env file if it exists (called automatically when using `from_env`)
pub fn load_dotenv() {
    // Silently ignore errors (file might not exist)
    let _ = dotenvy::dotenv();
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini API key (generation stays disabled without it)
    pub gemini_api_key: Option<String>,
    /// Gemini model to use (default: gemini-2.5-flash)
    pub gemini_model: String,
    /// Gemini base URL override for gateways and test doubles
    pub gemini_base_url: Option<String>,
    /// Embedding backend: "feature_hash" (local) or "openai" (remote)
    pub embedding_provider: EmbeddingProviderType,
    /// Embedding model identifier; provider default when unset
    pub embedding_model: Option<String>,
    /// Embedding API key for remote providers
    pub embedding_api_key: Option<String>,
    /// Embedding base URL override
    pub embedding_base_url: Option<String>,
    /// Embedding dimension override
    pub embedding_dimension: Option<usize>,
    /// Chunk window size in words
    pub chunk_window: usize,
    /// Overlap between adjacent chunks in words
    pub chunk_overlap: usize,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function automatically loads a .env file from the working
    /// directory if present.
    pub fn from_env() -> AppResult<Self> {
        load_dotenv();
        Self::from_env_inner()
    }

    /// Internal method to load from env without loading .env
    fn from_env_inner() -> AppResult<Self> {
        let embedding_provider = match env::var("EMBEDDING_PROVIDER") {
            Ok(raw) => EmbeddingProviderType::parse_str(&raw).ok_or_else(|| {
                AppError::config(format!("Unknown embedding provider: {}", raw))
            })?,
            Err(_) => EmbeddingProviderType::FeatureHash,
        };

        let config = Self {
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL").ok().filter(|u| !u.is_empty()),
            embedding_provider,
            embedding_model: env::var("EMBEDDING_MODEL").ok().filter(|m| !m.is_empty()),
            embedding_api_key: env::var("EMBEDDING_API_KEY").ok().filter(|k| !k.is_empty()),
            embedding_base_url: env::var("EMBEDDING_BASE_URL").ok().filter(|u| !u.is_empty()),
            embedding_dimension: env::var("EMBEDDING_DIMENSION")
                .ok()
                .and_then(|d| d.parse().ok()),
            chunk_window: env::var("CHUNK_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CHUNK_WINDOW),
            chunk_overlap: env::var("CHUNK_OVERLAP")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CHUNK_OVERLAP),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate structural constraints that would break the pipeline later
    pub fn validate(&self) -> AppResult<()> {
        if let Some(dim) = self.embedding_dimension {
            if !(8..=4096).contains(&dim) {
                return Err(AppError::validation(format!(
                    "embedding dimension {} is out of range (8..=4096)",
                    dim
                )));
            }
        }
        if self.gemini_model.trim().is_empty() {
            return Err(AppError::validation("Gemini model must not be empty"));
        }
        if self.chunk_window == 0 {
            return Err(AppError::validation("chunk window must be positive"));
        }
        if self.chunk_overlap >= self.chunk_window {
            return Err(AppError::validation(format!(
                "chunk overlap {} must be smaller than window {}",
                self.chunk_overlap, self.chunk_window
            )));
        }
        Ok(())
    }

    /// Build the generation provider configuration
    pub fn llm_config(&self) -> prospector_llm::ProviderConfig {
        prospector_llm::ProviderConfig {
            model: self.gemini_model.clone(),
            api_key: self.gemini_api_key.clone(),
            base_url: self.gemini_base_url.clone(),
            ..prospector_llm::ProviderConfig::default()
        }
    }

    /// Build the embedding provider configuration
    pub fn embedding_config(&self) -> EmbeddingProviderConfig {
        let mut config = EmbeddingProviderConfig::new(self.embedding_provider);
        if let Some(model) = &self.embedding_model {
            config.model = model.clone();
        }
        config.api_key = self.embedding_api_key.clone();
        config.base_url = self.embedding_base_url.clone();
        if let Some(dim) = self.embedding_dimension {
            config.dimension = Some(dim);
        }
        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            gemini_base_url: None,
            embedding_provider: EmbeddingProviderType::FeatureHash,
            embedding_model: None,
            embedding_api_key: None,
            embedding_base_url: None,
            embedding_dimension: None,
            chunk_window: DEFAULT_CHUNK_WINDOW,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}
