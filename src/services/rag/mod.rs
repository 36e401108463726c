//! Retrieval Pipeline
//!
//! Everything between raw documents and ranked context snippets:
//! - `extract`: plain-text extraction from txt, md, pdf and docx files
//! - `chunker`: sliding-window word chunking
//! - `embedding_provider`: the embedding abstraction and its configuration
//! - `embedding_provider_hash`: offline feature-hashing embeddings
//! - `embedding_provider_openai`: OpenAI-compatible HTTP embeddings
//! - `vector_index`: the HNSW index with its on-disk artifacts
//! - `indexer`: batches chunks through a provider into the index
//! - `retriever`: similarity search and prompt context formatting

pub mod chunker;
pub mod embedding_provider;
pub mod embedding_provider_hash;
pub mod embedding_provider_openai;
pub mod extract;
pub mod indexer;
pub mod retriever;
pub mod vector_index;

pub use chunker::{chunk_text, chunk_text_default};
pub use embedding_provider::{
    create_provider, EmbeddingProvider, EmbeddingProviderConfig, EmbeddingProviderType,
};
pub use embedding_provider_hash::HashEmbeddingProvider;
pub use embedding_provider_openai::OpenAIEmbeddingProvider;
pub use extract::{extract_text, is_supported_extension, SUPPORTED_EXTENSIONS};
pub use indexer::DocumentIndexer;
pub use retriever::Retriever;
pub use vector_index::VectorIndex;
