//! Document indexer.
//!
//! Builds the vector index and its parallel chunk list: extracts text from
//! source documents, splits it into overlapping word windows, embeds the
//! windows in batches and appends vector/chunk pairs in lockstep. Vector id
//! `i` always describes chunk `i`, so the two stores are saved and loaded
//! as paired artifacts.
//!
//! Per-document failures (unreadable or unsupported files) are recorded in
//! the [`IndexReport`] and do not stop the batch; embedding failures are
//! structural and abort the rebuild.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::{
    Chunk, DocType, IndexFailure, IndexMetadata, IndexReport, PaperRecord, RepositoryRecord,
    TranscriptEntry,
};
use crate::services::rag::chunker::{chunk_text, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_WINDOW};
use crate::services::rag::embedding_provider::EmbeddingProvider;
use crate::services::rag::extract::extract_text;
use crate::services::rag::vector_index::{l2_normalize, VectorIndex};
use crate::utils::{AppError, AppResult};

/// Window size for research artifact text (README / abstract sub-chunks).
const RESEARCH_CHUNK_WINDOW: usize = 300;

/// Overlap for research artifact sub-chunks.
const RESEARCH_CHUNK_OVERLAP: usize = 50;

/// Builds an embedding index over documents, transcripts and cached
/// research artifact text.
pub struct DocumentIndexer {
    provider: Arc<dyn EmbeddingProvider>,
    index: VectorIndex,
    chunks: Vec<Chunk>,
    chunk_window: usize,
    chunk_overlap: usize,
}

impl std::fmt::Debug for DocumentIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentIndexer")
            .field("chunks", &self.chunks.len())
            .field("chunk_window", &self.chunk_window)
            .field("chunk_overlap", &self.chunk_overlap)
            .finish_non_exhaustive()
    }
}

impl DocumentIndexer {
    /// Create an indexer that chunks documents with the given window and
    /// overlap, in words.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        chunk_window: usize,
        chunk_overlap: usize,
    ) -> AppResult<Self> {
        if chunk_window == 0 {
            return Err(AppError::validation("chunk window must be positive"));
        }
        if chunk_overlap >= chunk_window {
            return Err(AppError::validation(format!(
                "chunk overlap {} must be smaller than window {}",
                chunk_overlap, chunk_window
            )));
        }
        let dimension = provider.dimension();
        Ok(Self {
            provider,
            index: VectorIndex::new(dimension),
            chunks: Vec::new(),
            chunk_window,
            chunk_overlap,
        })
    }

    /// Indexer with the default chunking parameters.
    pub fn with_defaults(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let dimension = provider.dimension();
        Self {
            provider,
            index: VectorIndex::new(dimension),
            chunks: Vec::new(),
            chunk_window: DEFAULT_CHUNK_WINDOW,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }

    /// Rehydrate an indexer from previously saved artifacts so later calls
    /// append to the existing index instead of starting over.
    ///
    /// Returns `None` when the artifacts are missing, unreadable or
    /// inconsistent with each other, or when they were built for a
    /// different embedding dimension than `provider` produces.
    pub fn from_artifacts(
        provider: Arc<dyn EmbeddingProvider>,
        index_path: &Path,
        metadata_path: &Path,
        chunk_window: usize,
        chunk_overlap: usize,
    ) -> Option<Self> {
        if !metadata_path.exists() {
            debug!(path = %metadata_path.display(), "no index metadata to rehydrate from");
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

        if provider.dimension() != metadata.dimension {
            warn!(
                provider = provider.dimension(),
                artifacts = metadata.dimension,
                "saved artifacts use a different embedding dimension, starting fresh"
            );
            return None;
        }

        let index = VectorIndex::load(index_path, metadata.dimension)?;
        if index.len() != metadata.chunks.len() {
            warn!(
                vectors = index.len(),
                chunks = metadata.chunks.len(),
                "index artifacts disagree, starting fresh"
            );
            return None;
        }

        let mut indexer = Self::new(provider, chunk_window, chunk_overlap).ok()?;
        info!(chunks = metadata.chunks.len(), "rehydrated indexer from saved artifacts");
        indexer.index = index;
        indexer.chunks = metadata.chunks;
        Some(indexer)
    }

    /// Embed chunk contents and append vector/chunk pairs to the index.
    ///
    /// The whole batch is embedded before anything is appended, split into
    /// sub-batches no larger than the provider's maximum batch size with
    /// input order preserved. Every vector is L2-normalized before
    /// insertion. Returns the number of chunks added.
    pub async fn add_documents(&mut self, chunks: Vec<Chunk>) -> AppResult<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let max_batch = self.provider.max_batch_size().max(1);

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for batch in texts.chunks(max_batch) {
            let embedded = self.provider.embed_documents(batch).await?;
            vectors.extend(embedded);
        }

        if vectors.len() != chunks.len() {
            return Err(AppError::Embedding(format!(
                "provider returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        for vector in &mut vectors {
            l2_normalize(vector);
        }

        self.index.add(&vectors)?;
        self.chunks.extend(chunks);

        debug!(
            added = vectors.len(),
            total = self.chunks.len(),
            "appended chunk batch to index"
        );
        Ok(vectors.len())
    }

    /// Extract, chunk and index a set of document files.
    ///
    /// Files that cannot be read or parsed are skipped and recorded in the
    /// report; the rest of the batch continues.
    pub async fn index_files(&mut self, paths: &[PathBuf]) -> AppResult<IndexReport> {
        let mut report = IndexReport::default();

        for path in paths {
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let owned = path.clone();
            let extracted = tokio::task::spawn_blocking(move || extract_text(&owned))
                .await
                .map_err(|e| AppError::internal(format!("extraction task panicked: {}", e)))?;

            let text = match extracted {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping document");
                    report.failures.push(IndexFailure {
                        source,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let windows = chunk_text(&text, self.chunk_window, self.chunk_overlap)?;
            let chunks: Vec<Chunk> = windows
                .into_iter()
                .enumerate()
                .map(|(i, content)| Chunk::new(content, source.clone(), i, DocType::Document))
                .collect();

            report.chunks_indexed += self.add_documents(chunks).await?;
            report.files_processed += 1;
        }

        info!(
            files = report.files_processed,
            chunks = report.chunks_indexed,
            skipped = report.failures.len(),
            "indexed document files"
        );
        Ok(report)
    }

    /// Chunk and index already-extracted transcript text.
    pub async fn index_transcripts(&mut self, entries: &[TranscriptEntry]) -> AppResult<IndexReport> {
        let mut report = IndexReport::default();

        for entry in entries {
            let windows = chunk_text(&entry.content, self.chunk_window, self.chunk_overlap)?;
            let chunks: Vec<Chunk> = windows
                .into_iter()
                .enumerate()
                .map(|(i, content)| Chunk::new(content, entry.title.clone(), i, DocType::Transcript))
                .collect();

            report.chunks_indexed += self.add_documents(chunks).await?;
            report.transcripts_processed += 1;
        }

        info!(
            transcripts = report.transcripts_processed,
            chunks = report.chunks_indexed,
            "indexed transcripts"
        );
        Ok(report)
    }

    /// Index the cached text of discovered research artifacts.
    ///
    /// README and abstract text is sub-chunked with a smaller window than
    /// uploaded documents, and every chunk is prefixed with the artifact
    /// name so a retrieved chunk identifies its origin on its own. Returns
    /// the number of chunks added.
    pub async fn index_research_artifacts(
        &mut self,
        repositories: &[RepositoryRecord],
        papers: &[PaperRecord],
    ) -> AppResult<usize> {
        let mut added = 0;

        for repo in repositories {
            let Some(readme) = repo.readme.as_deref() else {
                continue;
            };
            let windows = chunk_text(readme, RESEARCH_CHUNK_WINDOW, RESEARCH_CHUNK_OVERLAP)?;
            let chunks: Vec<Chunk> = windows
                .into_iter()
                .enumerate()
                .map(|(i, content)| {
                    Chunk::new(
                        format!("README from {}: {}", repo.name, content),
                        repo.name.clone(),
                        i,
                        DocType::GithubRepository,
                    )
                })
                .collect();
            added += self.add_documents(chunks).await?;
        }

        for paper in papers {
            let Some(abstract_text) = paper.abstract_text.as_deref() else {
                continue;
            };
            let windows = chunk_text(abstract_text, RESEARCH_CHUNK_WINDOW, RESEARCH_CHUNK_OVERLAP)?;
            let chunks: Vec<Chunk> = windows
                .into_iter()
                .enumerate()
                .map(|(i, content)| {
                    Chunk::new(
                        format!("Abstract from '{}': {}", paper.title, content),
                        paper.title.clone(),
                        i,
                        DocType::ResearchPaper,
                    )
                })
                .collect();
            added += self.add_documents(chunks).await?;
        }

        if added > 0 {
            info!(chunks = added, "indexed research artifact text");
        }
        Ok(added)
    }

    /// Persist the index and its chunk metadata as paired artifacts.
    ///
    /// The vector graph lands in `<index_path>.hnsw.graph` and
    /// `<index_path>.hnsw.data`; the chunk list, embedding identifier and
    /// dimension go to `metadata_path` as JSON.
    ///
    /// # Errors
    ///
    /// `AppError::NoIndex` when nothing has been indexed yet.
    pub fn save(&self, index_path: &Path, metadata_path: &Path) -> AppResult<()> {
        if self.chunks.is_empty() {
            return Err(AppError::no_index("nothing has been indexed"));
        }

        self.index.save(index_path)?;

        let metadata = IndexMetadata {
            chunks: self.chunks.clone(),
            embedding_model: self.provider.display_name().to_string(),
            dimension: self.index.dimension(),
        };
        if let Some(parent) = metadata_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&metadata)?;
        std::fs::write(metadata_path, json)?;

        info!(
            chunks = self.chunks.len(),
            index = %index_path.display(),
            metadata = %metadata_path.display(),
            "saved vector index artifacts"
        );
        Ok(())
    }

    /// Chunks indexed so far, in vector id order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Number of indexed chunks (equals the vector count).
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Embedding dimension of the index being built.
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::rag::embedding_provider::{
        EmbeddingProviderType, EmbeddingResult,
    };
    use crate::services::rag::embedding_provider_hash::HashEmbeddingProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn hash_provider() -> Arc<dyn EmbeddingProvider> {
        Arc::new(HashEmbeddingProvider::with_dimension(64))
    }

    fn doc_chunk(content: &str, index: usize) -> Chunk {
        Chunk::new(content, "notes.txt", index, DocType::Document)
    }

    /// Delegates to the hashing provider but caps the batch size, counting
    /// how many embed calls were made.
    struct TinyBatchProvider {
        inner: HashEmbeddingProvider,
        max_batch: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for TinyBatchProvider {
        async fn embed_documents(&self, documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
            assert!(
                documents.len() <= self.max_batch,
                "batch of {} exceeds provider limit {}",
                documents.len(),
                self.max_batch
            );
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed_documents(documents).await
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        async fn health_check(&self) -> EmbeddingResult<()> {
            Ok(())
        }

        fn is_local(&self) -> bool {
            true
        }

        fn max_batch_size(&self) -> usize {
            self.max_batch
        }

        fn provider_type(&self) -> EmbeddingProviderType {
            EmbeddingProviderType::FeatureHash
        }

        fn display_name(&self) -> &str {
            "tiny batch"
        }
    }

    #[tokio::test]
    async fn add_documents_returns_count_and_grows_index() {
        let mut indexer = DocumentIndexer::with_defaults(hash_provider());

        let added = indexer
            .add_documents(vec![
                doc_chunk("rust async runtime design", 0),
                doc_chunk("vector similarity search", 1),
                doc_chunk("tiered agent orchestration", 2),
            ])
            .await
            .unwrap();

        assert_eq!(added, 3);
        assert_eq!(indexer.chunk_count(), 3);
    }

    #[tokio::test]
    async fn add_documents_with_empty_input_is_a_no_op() {
        let mut indexer = DocumentIndexer::with_defaults(hash_provider());
        assert_eq!(indexer.add_documents(vec![]).await.unwrap(), 0);
        assert_eq!(indexer.chunk_count(), 0);
    }

    #[tokio::test]
    async fn add_documents_splits_into_provider_sized_batches() {
        let provider = Arc::new(TinyBatchProvider {
            inner: HashEmbeddingProvider::with_dimension(32),
            max_batch: 2,
            calls: AtomicUsize::new(0),
        });
        let mut indexer = DocumentIndexer::with_defaults(provider.clone());

        let chunks: Vec<Chunk> = (0..5)
            .map(|i| doc_chunk(&format!("chunk number {}", i), i))
            .collect();
        let added = indexer.add_documents(chunks).await.unwrap();

        assert_eq!(added, 5);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn index_files_records_failures_and_continues() {
        let dir = tempdir().unwrap();
        let good_txt = dir.path().join("alpha.txt");
        let good_md = dir.path().join("beta.md");
        let bad = dir.path().join("gamma.xlsx");
        std::fs::write(&good_txt, "latency budget for the gateway").unwrap();
        std::fs::write(&good_md, "# Design\n\nretrieval layer notes").unwrap();
        std::fs::write(&bad, "not a supported format").unwrap();

        let mut indexer = DocumentIndexer::with_defaults(hash_provider());
        let report = indexer
            .index_files(&[good_txt, bad, good_md])
            .await
            .unwrap();

        assert_eq!(report.files_processed, 2);
        assert_eq!(report.chunks_indexed, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, "gamma.xlsx");
        assert_eq!(indexer.chunk_count(), 2);
    }

    #[tokio::test]
    async fn index_files_uses_file_name_as_source() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("requirements.txt");
        std::fs::write(&path, "the system shall retry failed calls").unwrap();

        let mut indexer = DocumentIndexer::with_defaults(hash_provider());
        indexer.index_files(&[path]).await.unwrap();

        assert_eq!(indexer.chunks()[0].metadata.source_id, "requirements.txt");
        assert_eq!(indexer.chunks()[0].metadata.doc_type, DocType::Document);
    }

    #[tokio::test]
    async fn index_transcripts_skips_blank_content_without_failing() {
        let mut indexer = DocumentIndexer::with_defaults(hash_provider());
        let entries = vec![
            TranscriptEntry::new("kickoff call", "we agreed on a october launch"),
            TranscriptEntry::new("empty call", "   "),
        ];

        let report = indexer.index_transcripts(&entries).await.unwrap();

        assert_eq!(report.transcripts_processed, 2);
        assert_eq!(report.chunks_indexed, 1);
        assert!(report.failures.is_empty());
        assert_eq!(indexer.chunks()[0].metadata.doc_type, DocType::Transcript);
        assert_eq!(indexer.chunks()[0].metadata.source_id, "kickoff call");
    }

    #[tokio::test]
    async fn research_artifacts_are_subchunked_with_name_prefixes() {
        let mut indexer = DocumentIndexer::with_defaults(hash_provider());

        // 350 words forces two windows at the 300/50 research chunking.
        let readme: String = (0..350)
            .map(|i| format!("w{} ", i))
            .collect::<String>()
            .trim_end()
            .to_string();
        let repo = RepositoryRecord {
            name: "flowkit".to_string(),
            url: Some("https://github.com/x/flowkit".to_string()),
            readme: Some(readme),
            ..RepositoryRecord::default()
        };
        let paper = PaperRecord {
            title: "Streaming Graphs".to_string(),
            url: Some("https://arxiv.org/abs/1234.5678".to_string()),
            abstract_text: Some("We present a streaming graph engine.".to_string()),
            ..PaperRecord::default()
        };
        let bare_repo = RepositoryRecord {
            name: "noreadme".to_string(),
            ..RepositoryRecord::default()
        };

        let added = indexer
            .index_research_artifacts(&[repo, bare_repo], &[paper])
            .await
            .unwrap();

        assert_eq!(added, 3);
        let chunks = indexer.chunks();
        assert!(chunks[0].content.starts_with("README from flowkit: w0 "));
        assert!(chunks[1].content.starts_with("README from flowkit: w250 "));
        assert_eq!(chunks[0].metadata.doc_type, DocType::GithubRepository);
        assert!(chunks[2]
            .content
            .starts_with("Abstract from 'Streaming Graphs':"));
        assert_eq!(chunks[2].metadata.doc_type, DocType::ResearchPaper);
        assert_eq!(chunks[2].metadata.source_id, "Streaming Graphs");
    }

    #[tokio::test]
    async fn save_rejects_empty_index() {
        let dir = tempdir().unwrap();
        let indexer = DocumentIndexer::with_defaults(hash_provider());

        let err = indexer
            .save(&dir.path().join("vector_index"), &dir.path().join("meta.json"))
            .unwrap_err();
        assert!(matches!(err, AppError::NoIndex(_)));
    }

    #[tokio::test]
    async fn save_writes_paired_artifacts() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("store").join("vector_index");
        let metadata_path = dir.path().join("store").join("chunks.json");

        let mut indexer = DocumentIndexer::with_defaults(hash_provider());
        indexer
            .add_documents(vec![
                doc_chunk("first indexed text", 0),
                doc_chunk("second indexed text", 1),
            ])
            .await
            .unwrap();
        indexer.save(&index_path, &metadata_path).unwrap();

        let (graph, data) = crate::services::rag::vector_index::sidecar_paths(&index_path);
        assert!(graph.exists());
        assert!(data.exists());

        let metadata: IndexMetadata =
            serde_json::from_str(&std::fs::read_to_string(&metadata_path).unwrap()).unwrap();
        assert_eq!(metadata.chunks.len(), 2);
        assert_eq!(metadata.dimension, 64);
        assert!(metadata.embedding_model.contains("Feature Hash"));
    }

    #[tokio::test]
    async fn from_artifacts_resumes_and_appends() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("vector_index");
        let metadata_path = dir.path().join("chunks.json");

        let mut indexer = DocumentIndexer::with_defaults(hash_provider());
        indexer
            .add_documents(vec![doc_chunk("original indexed text", 0)])
            .await
            .unwrap();
        indexer.save(&index_path, &metadata_path).unwrap();
        drop(indexer);

        let mut resumed = DocumentIndexer::from_artifacts(
            hash_provider(),
            &index_path,
            &metadata_path,
            DEFAULT_CHUNK_WINDOW,
            DEFAULT_CHUNK_OVERLAP,
        )
        .unwrap();
        assert_eq!(resumed.chunk_count(), 1);

        resumed
            .add_documents(vec![doc_chunk("appended after reload", 1)])
            .await
            .unwrap();
        resumed.save(&index_path, &metadata_path).unwrap();

        let metadata: IndexMetadata =
            serde_json::from_str(&std::fs::read_to_string(&metadata_path).unwrap()).unwrap();
        assert_eq!(metadata.chunks.len(), 2);
        assert_eq!(metadata.chunks[0].content, "original indexed text");
        assert_eq!(metadata.chunks[1].content, "appended after reload");
    }

    #[test]
    fn from_artifacts_without_files_returns_none() {
        let dir = tempdir().unwrap();
        let resumed = DocumentIndexer::from_artifacts(
            hash_provider(),
            &dir.path().join("vector_index"),
            &dir.path().join("chunks.json"),
            DEFAULT_CHUNK_WINDOW,
            DEFAULT_CHUNK_OVERLAP,
        );
        assert!(resumed.is_none());
    }

    #[tokio::test]
    async fn from_artifacts_rejects_other_dimension() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("vector_index");
        let metadata_path = dir.path().join("chunks.json");

        let mut indexer = DocumentIndexer::with_defaults(hash_provider());
        indexer
            .add_documents(vec![doc_chunk("sixty four dims", 0)])
            .await
            .unwrap();
        indexer.save(&index_path, &metadata_path).unwrap();

        let other = Arc::new(HashEmbeddingProvider::with_dimension(32));
        let resumed = DocumentIndexer::from_artifacts(
            other,
            &index_path,
            &metadata_path,
            DEFAULT_CHUNK_WINDOW,
            DEFAULT_CHUNK_OVERLAP,
        );
        assert!(resumed.is_none());
    }

    #[tokio::test]
    async fn vector_count_tracks_chunk_count_across_sources() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("doc.txt");
        std::fs::write(&file, "alpha beta gamma").unwrap();

        let mut indexer = DocumentIndexer::with_defaults(hash_provider());
        indexer.index_files(&[file]).await.unwrap();
        indexer
            .index_transcripts(&[TranscriptEntry::new("standup", "delta epsilon")])
            .await
            .unwrap();

        assert_eq!(indexer.chunk_count(), 2);
        assert_eq!(indexer.dimension(), 64);
    }

    #[test]
    fn constructor_rejects_bad_chunking() {
        let err = DocumentIndexer::new(hash_provider(), 0, 0).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = DocumentIndexer::new(hash_provider(), 100, 100).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert!(DocumentIndexer::new(hash_provider(), 100, 20).is_ok());
    }
}
