//! OpenAI-compatible embedding provider.
//!
//! Implements the `EmbeddingProvider` trait over the OpenAI embeddings API
//! using reqwest transport. Supports configurable output dimensions via the
//! Matryoshka `dimensions` parameter and batch embedding up to 2048 inputs
//! per request.
//!
//! - Endpoint: `POST https://api.openai.com/v1/embeddings`
//! - Auth: `Authorization: Bearer {api_key}`
//! - Body: `{ model, input: ["text1", ...], dimensions? }`
//! - Response: `{ data: [{ embedding, index }], model, usage }`
//!
//! A custom `base_url` points the adapter at any OpenAI-compatible server
//! (Azure, vLLM, LiteLLM).

use async_trait::async_trait;
use serde::Deserialize;

use super::embedding_provider::{
    EmbeddingError, EmbeddingProvider, EmbeddingProviderConfig, EmbeddingProviderType,
    EmbeddingResult,
};
use prospector_llm::build_http_client;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default OpenAI embedding API endpoint.
const OPENAI_EMBEDDING_API_URL: &str = "https://api.openai.com/v1/embeddings";

/// Default embedding model.
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Default embedding dimension for text-embedding-3-small.
const DEFAULT_DIMENSION: usize = 1536;

/// Maximum batch size supported by the OpenAI embedding API.
const MAX_BATCH_SIZE: usize = 2048;

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

/// OpenAI embedding API response.
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
    #[allow(dead_code)]
    model: Option<String>,
    #[allow(dead_code)]
    usage: Option<OpenAIUsage>,
}

/// Individual embedding result within the response.
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Token usage statistics from the API.
#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    #[allow(dead_code)]
    prompt_tokens: Option<u32>,
    #[allow(dead_code)]
    total_tokens: Option<u32>,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: Option<OpenAIErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// Remote embedding provider speaking the OpenAI embeddings protocol.
///
/// All fields are immutable after construction and the reqwest `Client` is
/// internally reference-counted, so the provider is `Send + Sync` and can be
/// shared across tasks without extra locking.
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    dimension: usize,
    display_name: String,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider from an `EmbeddingProviderConfig`.
    pub fn new(config: &EmbeddingProviderConfig) -> Self {
        let model = if config.model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_EMBEDDING_API_URL)
            .to_string();

        let dimension = config.dimension.unwrap_or(DEFAULT_DIMENSION);
        let display_name = format!("OpenAI ({})", model);
        let api_key = config.api_key.clone().unwrap_or_default();

        Self {
            client: build_http_client(),
            api_key,
            model,
            base_url,
            dimension,
            display_name,
        }
    }

    /// Build the JSON request body for the embedding API.
    fn build_request_body(&self, input: serde_json::Value) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "input": input,
        });

        // text-embedding-3-* accept the Matryoshka `dimensions` parameter.
        // Older models and some compatible servers reject it, so only send
        // it when the model supports it or the caller asked for a non-default
        // dimension explicitly.
        if self.dimension != DEFAULT_DIMENSION || self.model.contains("text-embedding-3") {
            body["dimensions"] = serde_json::json!(self.dimension);
        }

        body
    }

    /// Send a POST request to the embedding API and parse the response.
    async fn post_embeddings(
        &self,
        body: &serde_json::Value,
    ) -> EmbeddingResult<OpenAIEmbeddingResponse> {
        if self.api_key.is_empty() {
            return Err(EmbeddingError::AuthenticationFailed {
                message: "OpenAI API key is not configured. Set EMBEDDING_API_KEY.".to_string(),
            });
        }

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status().as_u16();

        if status == 200 {
            let resp_text = response
                .text()
                .await
                .map_err(|e| EmbeddingError::NetworkError {
                    message: format!("failed to read response body: {}", e),
                })?;

            serde_json::from_str::<OpenAIEmbeddingResponse>(&resp_text).map_err(|e| {
                EmbeddingError::ParseError {
                    message: format!("failed to parse embedding response: {}", e),
                }
            })
        } else {
            let body_text = response.text().await.unwrap_or_default();
            Err(self.map_http_error(status, &body_text))
        }
    }

    /// Map a reqwest transport error to `EmbeddingError`.
    fn map_reqwest_error(&self, err: reqwest::Error) -> EmbeddingError {
        let msg = err.to_string();

        if err.is_connect() || msg.contains("connect") || msg.contains("Connection refused") {
            EmbeddingError::ProviderUnavailable {
                message: format!("cannot connect to embedding API at {}", self.base_url),
            }
        } else if err.is_timeout() {
            EmbeddingError::NetworkError {
                message: format!("request to embedding API timed out: {}", msg),
            }
        } else {
            EmbeddingError::NetworkError { message: msg }
        }
    }

    /// Map an HTTP error response to `EmbeddingError`.
    fn map_http_error(&self, status: u16, body_text: &str) -> EmbeddingError {
        let error_detail = serde_json::from_str::<OpenAIErrorResponse>(body_text)
            .ok()
            .and_then(|r| r.error);

        let error_message = error_detail
            .as_ref()
            .and_then(|d| d.message.as_deref())
            .unwrap_or(body_text);

        match status {
            401 | 403 => EmbeddingError::AuthenticationFailed {
                message: format!("OpenAI authentication failed: {}", error_message),
            },
            429 => EmbeddingError::RateLimited {
                message: format!("OpenAI rate limit exceeded: {}", error_message),
                retry_after: None,
            },
            400 => {
                if error_message.contains("token") || error_message.contains("length") {
                    EmbeddingError::InputTooLong {
                        message: format!("OpenAI: {}", error_message),
                    }
                } else {
                    EmbeddingError::InvalidConfig {
                        message: format!("OpenAI bad request: {}", error_message),
                    }
                }
            }
            404 => EmbeddingError::ModelNotFound {
                model: format!(
                    "'{}' not found at {}. {}",
                    self.model, self.base_url, error_message
                ),
            },
            500..=599 => EmbeddingError::ServerError {
                message: format!("OpenAI server error (HTTP {}): {}", status, error_message),
                status: Some(status),
            },
            _ => EmbeddingError::ServerError {
                message: format!(
                    "OpenAI unexpected error (HTTP {}): {}",
                    status, error_message
                ),
                status: Some(status),
            },
        }
    }

    /// Sort and extract embedding vectors from the API response.
    fn extract_embeddings(
        &self,
        mut response: OpenAIEmbeddingResponse,
        expected_count: usize,
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        if response.data.len() != expected_count {
            return Err(EmbeddingError::ParseError {
                message: format!(
                    "expected {} embeddings but the API returned {}",
                    expected_count,
                    response.data.len()
                ),
            });
        }

        // Sort by index to preserve input order.
        response.data.sort_by_key(|d| d.index);

        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed_documents(&self, documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        if documents.len() > MAX_BATCH_SIZE {
            return Err(EmbeddingError::BatchSizeLimitExceeded {
                requested: documents.len(),
                max_allowed: MAX_BATCH_SIZE,
            });
        }

        let input = serde_json::json!(documents);
        let body = self.build_request_body(input);
        let response = self.post_embeddings(&body).await?;

        self.extract_embeddings(response, documents.len())
    }

    async fn embed_query(&self, query: &str) -> EmbeddingResult<Vec<f32>> {
        let input = serde_json::json!(query);
        let body = self.build_request_body(input);
        let response = self.post_embeddings(&body).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::ParseError {
                message: "the API returned no embedding for the query".to_string(),
            })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> EmbeddingResult<()> {
        if self.api_key.is_empty() {
            return Err(EmbeddingError::AuthenticationFailed {
                message: "OpenAI API key is not configured. Set EMBEDDING_API_KEY.".to_string(),
            });
        }

        let body = self.build_request_body(serde_json::json!("health check"));
        self.post_embeddings(&body).await?;

        Ok(())
    }

    fn is_local(&self) -> bool {
        false
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::OpenAI
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
