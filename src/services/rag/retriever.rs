//! Similarity search over the persisted vector index.
//!
//! The retriever loads the paired index artifacts the indexer saved and
//! answers queries against them. It never errors on the read path: before
//! the artifacts are loaded, or for blank queries, every search simply
//! returns no results, so callers can treat "no context available" and
//! "nothing relevant" the same way.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::{Chunk, DocType, DocumentStats, IndexMetadata, SearchResult};
use crate::services::rag::embedding_provider::EmbeddingProvider;
use crate::services::rag::vector_index::{l2_normalize, VectorIndex};

/// Results scoring at or below this are dropped unless a caller overrides
/// the threshold.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.1;

/// Loaded index artifacts: the vector graph and its parallel chunk list.
struct LoadedIndex {
    index: VectorIndex,
    chunks: Vec<Chunk>,
    embedding_model: String,
}

/// Answers similarity queries against a loaded vector index.
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    loaded: Option<LoadedIndex>,
}

impl Retriever {
    /// A retriever with no index loaded yet.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            loaded: None,
        }
    }

    /// Try to load the paired index artifacts.
    ///
    /// Returns `false` (not an error) when either artifact is missing or
    /// unreadable, or when the saved index does not fit the configured
    /// embedding provider; the retriever then stays not ready and all
    /// searches return empty.
    pub async fn load(&mut self, index_path: &Path, metadata_path: &Path) -> bool {
        let index_path = index_path.to_path_buf();
        let metadata_path = metadata_path.to_path_buf();
        let loaded =
            tokio::task::spawn_blocking(move || load_artifacts(&index_path, &metadata_path))
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "index load task panicked");
                    None
                });

        let Some(state) = loaded else {
            return false;
        };

        if state.index.dimension() != self.provider.dimension() {
            warn!(
                index_dim = state.index.dimension(),
                provider_dim = self.provider.dimension(),
                "saved index does not match the configured embedding provider"
            );
            return false;
        }

        info!(
            chunks = state.chunks.len(),
            model = %state.embedding_model,
            "retriever ready"
        );
        self.loaded = Some(state);
        true
    }

    /// True once index artifacts have been loaded.
    pub fn is_ready(&self) -> bool {
        self.loaded.is_some()
    }

    /// Identifier of the embedding backend that built the loaded index.
    pub fn embedding_model(&self) -> Option<&str> {
        self.loaded.as_ref().map(|s| s.embedding_model.as_str())
    }

    /// Top matches for `query` above the default score threshold.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        self.search_with_threshold(query, top_k, DEFAULT_SCORE_THRESHOLD)
            .await
    }

    /// Top matches for `query`, strictly above `score_threshold`, ordered
    /// by non-increasing score.
    ///
    /// Blank queries and a not-yet-loaded retriever return empty results
    /// rather than errors; so do embedding failures, which are logged once.
    pub async fn search_with_threshold(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f32,
    ) -> Vec<SearchResult> {
        if query.trim().is_empty() || top_k == 0 {
            return Vec::new();
        }
        let Some(state) = &self.loaded else {
            debug!("search before index load, returning no results");
            return Vec::new();
        };

        let mut query_vector = match self.provider.embed_query(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "query embedding failed");
                return Vec::new();
            }
        };
        l2_normalize(&mut query_vector);

        state
            .index
            .search(&query_vector, top_k)
            .into_iter()
            .filter(|(_, score)| *score > score_threshold)
            .filter_map(|(id, score)| {
                state.chunks.get(id).map(|chunk| SearchResult {
                    content: chunk.content.clone(),
                    metadata: chunk.metadata.clone(),
                    score,
                })
            })
            .collect()
    }

    /// Matches restricted to one document category.
    ///
    /// Over-fetches twice `top_k` before filtering, so fewer than `top_k`
    /// results may come back when the category is sparse.
    pub async fn search_by_type(
        &self,
        query: &str,
        doc_type: DocType,
        top_k: usize,
    ) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = self
            .search(query, top_k.saturating_mul(2))
            .await
            .into_iter()
            .filter(|r| r.metadata.doc_type == doc_type)
            .collect();
        results.truncate(top_k);
        results
    }

    /// Matches restricted to one source document.
    ///
    /// Same over-fetch trade-off as [`Retriever::search_by_type`].
    pub async fn search_by_source(
        &self,
        query: &str,
        source: &str,
        top_k: usize,
    ) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = self
            .search(query, top_k.saturating_mul(2))
            .await
            .into_iter()
            .filter(|r| r.metadata.source_id == source)
            .collect();
        results.truncate(top_k);
        results
    }

    /// Render results with their provenance for inclusion in a prompt.
    ///
    /// Empty input renders as an empty string.
    pub fn format_context(&self, results: &[SearchResult]) -> String {
        let parts: Vec<String> = results
            .iter()
            .enumerate()
            .map(|(i, r)| {
                format!(
                    "Document {} (Source: {}, Type: {}, Relevance: {:.3})\n{}",
                    i + 1,
                    r.metadata.source_id,
                    r.metadata.doc_type,
                    r.score,
                    r.content
                )
            })
            .collect();
        parts.join("\n\n")
    }

    /// One search per query, merged into a single deduplicated context.
    ///
    /// A chunk appears at most once even when it matches several queries;
    /// the merged set is re-sorted by score descending before formatting.
    pub async fn multi_query_context(&self, queries: &[String], top_k_per_query: usize) -> String {
        let mut seen: HashSet<String> = HashSet::new();
        let mut merged: Vec<SearchResult> = Vec::new();

        for query in queries {
            for result in self.search(query, top_k_per_query).await {
                if seen.insert(result.content.clone()) {
                    merged.push(result);
                }
            }
        }

        merged.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.format_context(&merged)
    }

    /// Aggregate statistics over the loaded index.
    pub fn document_stats(&self) -> DocumentStats {
        let Some(state) = &self.loaded else {
            return DocumentStats::default();
        };

        let mut by_doc_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
        for chunk in &state.chunks {
            *by_doc_type
                .entry(chunk.metadata.doc_type.as_str().to_string())
                .or_insert(0) += 1;
            *by_source
                .entry(chunk.metadata.source_id.clone())
                .or_insert(0) += 1;
        }

        DocumentStats {
            total_chunks: state.chunks.len(),
            by_doc_type,
            by_source,
            dimension: state.index.dimension(),
        }
    }
}

/// Read both artifacts from disk, verifying they describe each other.
fn load_artifacts(index_path: &Path, metadata_path: &Path) -> Option<LoadedIndex> {
    if !metadata_path.exists() {
        debug!(path = %metadata_path.display(), "index metadata not found");
        return None;
    }

    let raw = match std::fs::read_to_string(metadata_path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %metadata_path.display(), error = %e, "cannot read index metadata");
            return None;
        }
    };
    let metadata: IndexMetadata = match serde_json::from_str(&raw) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(path = %metadata_path.display(), error = %e, "cannot parse index metadata");
            return None;
        }
    };

    let index = VectorIndex::load(index_path, metadata.dimension)?;

    if index.len() != metadata.chunks.len() {
        warn!(
            vectors = index.len(),
            chunks = metadata.chunks.len(),
            "index artifacts disagree, ignoring them"
        );
        return None;
    }

    Some(LoadedIndex {
        index,
        chunks: metadata.chunks,
        embedding_model: metadata.embedding_model,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
