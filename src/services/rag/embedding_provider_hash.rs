//! Feature-hash embedding provider.
//!
//! Deterministic local vectorizer built on the hashing trick: each token is
//! FNV-1a hashed into one of `dimension` buckets with a sign bit, occurrence
//! counts are accumulated and the resulting vector is L2-normalized. No
//! vocabulary, no model files, no network. Vectors are stable across
//! processes and runs, which makes this the offline backend for indexing,
//! tests and air-gapped use.

use async_trait::async_trait;

use super::embedding_provider::{
    EmbeddingProvider, EmbeddingProviderConfig, EmbeddingProviderType, EmbeddingResult,
};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Local embedding provider with no external dependencies.
///
/// The mapping from text to vector is a pure function of the text and the
/// configured dimension. Tokens are case-folded, so "Rust" and "rust" land
/// in the same bucket.
pub struct HashEmbeddingProvider {
    model: String,
    dimension: usize,
    display_name: String,
}

impl HashEmbeddingProvider {
    /// Create a provider from configuration.
    ///
    /// Uses `config.effective_dimension()`; callers validate the config
    /// first, so the dimension is always positive here.
    pub fn new(config: &EmbeddingProviderConfig) -> Self {
        Self::with_model(config.effective_model(), config.effective_dimension())
    }

    /// Create a provider with an explicit dimension and the default model
    /// identifier. Dimension must be positive.
    pub fn with_dimension(dimension: usize) -> Self {
        let capability = EmbeddingProviderType::FeatureHash.default_capability();
        Self::with_model(&capability.default_model, dimension)
    }

    fn with_model(model: &str, dimension: usize) -> Self {
        Self {
            model: model.to_string(),
            dimension,
            display_name: format!("Feature Hash ({})", model),
        }
    }

    /// Returns the model identifier this provider reports.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed one text into a signed bucket-count vector, L2-normalized.
    ///
    /// Blank text embeds to the zero vector.
    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let hash = hash_token(token);
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        l2_normalize(&mut vector);
        vector
    }
}

/// Split on non-alphanumeric boundaries, dropping empty fragments.
fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

/// FNV-1a over the ASCII-lowercased bytes of a token.
fn hash_token(token: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in token.bytes() {
        hash ^= byte.to_ascii_lowercase() as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

// -------------------------------------------------------------------------
// EmbeddingProvider trait implementation
// -------------------------------------------------------------------------

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed_documents(&self, documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        Ok(documents.iter().map(|text| self.embed_one(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> EmbeddingResult<()> {
        Ok(())
    }

    fn is_local(&self) -> bool {
        true
    }

    fn max_batch_size(&self) -> usize {
        EmbeddingProviderType::FeatureHash
            .default_capability()
            .max_batch_size
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::FeatureHash
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}

// -------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------
