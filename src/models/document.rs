//! Document Models
//!
//! Data structures for the retrieval layer: text chunks with provenance
//! metadata, similarity search results, and indexing reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category of an indexed document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    /// Uploaded project document (txt/md/pdf/docx)
    Document,
    /// Meeting or interview transcript supplied as raw text
    Transcript,
    /// Cached text of a discovered GitHub repository
    GithubRepository,
    /// Cached text of a discovered research paper
    ResearchPaper,
}

impl DocType {
    /// Stable string form used in metadata and context formatting
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Document => "document",
            DocType::Transcript => "transcript",
            DocType::GithubRepository => "github_repository",
            DocType::ResearchPaper => "research_paper",
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DocType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(DocType::Document),
            "transcript" => Ok(DocType::Transcript),
            "github_repository" => Ok(DocType::GithubRepository),
            "research_paper" => Ok(DocType::ResearchPaper),
            _ => Err(format!("Unknown doc type: {}", s)),
        }
    }
}

/// Provenance metadata attached to every chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Where the chunk came from (file path, transcript title, or URL)
    pub source_id: String,
    /// Position of this chunk within its source document
    pub chunk_index: usize,
    /// Document category
    pub doc_type: DocType,
}

/// One indexed unit of text with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text content
    pub content: String,
    /// Provenance metadata
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a chunk with the given provenance
    pub fn new(
        content: impl Into<String>,
        source_id: impl Into<String>,
        chunk_index: usize,
        doc_type: DocType,
    ) -> Self {
        Self {
            content: content.into(),
            metadata: ChunkMetadata {
                source_id: source_id.into(),
                chunk_index,
                doc_type,
            },
        }
    }
}

/// Raw transcript text supplied directly to the indexer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Transcript title, used as the chunk source
    pub title: String,
    /// Already-extracted transcript text
    pub content: String,
}

impl TranscriptEntry {
    /// Create a transcript entry
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// A similarity search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matched chunk content
    pub content: String,
    /// Provenance of the matched chunk
    pub metadata: ChunkMetadata,
    /// Cosine similarity of query and chunk (-1..1)
    pub score: f32,
}

/// Outcome of one indexing request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexReport {
    /// Number of files successfully processed
    pub files_processed: usize,
    /// Number of transcripts successfully processed
    pub transcripts_processed: usize,
    /// Total chunks written to the index
    pub chunks_indexed: usize,
    /// Sources that were skipped, with the reason
    pub failures: Vec<IndexFailure>,
}

impl IndexReport {
    /// Fold another report's counts and failures into this one
    pub fn absorb(&mut self, other: IndexReport) {
        self.files_processed += other.files_processed;
        self.transcripts_processed += other.transcripts_processed;
        self.chunks_indexed += other.chunks_indexed;
        self.failures.extend(other.failures);
    }
}

/// A source skipped during indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexFailure {
    /// File path or transcript title
    pub source: String,
    /// Why it was skipped
    pub reason: String,
}

/// Persisted chunk metadata saved next to the vector index sidecars
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Every indexed chunk, in vector id order
    pub chunks: Vec<Chunk>,
    /// Identifier of the embedding backend that produced the vectors
    pub embedding_model: String,
    /// Embedding dimension of the index
    pub dimension: usize,
}

/// Aggregate statistics over the loaded index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStats {
    /// Total indexed chunks
    pub total_chunks: usize,
    /// Chunk counts per document category
    pub by_doc_type: BTreeMap<String, usize>,
    /// Chunk counts per source
    pub by_source: BTreeMap<String, usize>,
    /// Embedding dimension of the index
    pub dimension: usize,
}
