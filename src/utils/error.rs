//! Error Handling
//!
//! Unified error types for the application.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// The engine or one of its components has not been initialized yet
    #[error("Not ready: {0}")]
    NotReady(String),

    /// File format the extraction layer does not support
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Text extraction failures (corrupt or unreadable documents)
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Search was attempted before any index exists
    #[error("No index: {0}")]
    NoIndex(String),

    /// Concurrent operation rejected (e.g. a run is already in progress)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Text generation errors
    #[error("Generation error: {0}")]
    Generation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a not-ready error
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    /// Create an unsupported-format error
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Create an extraction error
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create a no-index error
    pub fn no_index(msg: impl Into<String>) -> Self {
        Self::NoIndex(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Convert AppError to a string suitable for status payloads
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}

impl From<crate::services::rag::embedding_provider::EmbeddingError> for AppError {
    fn from(err: crate::services::rag::embedding_provider::EmbeddingError) -> Self {
        Self::Embedding(err.to_string())
    }
}

impl From<prospector_llm::LlmError> for AppError {
    fn from(err: prospector_llm::LlmError) -> Self {
        Self::Generation(err.to_string())
    }
}
