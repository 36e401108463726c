//! Services
//!
//! The working layers of the pipeline, bottom up:
//! - `rag`: document extraction, chunking, embeddings and retrieval
//! - `knowledge`: the persistent catalog of discovered research
//! - `engine`: the agents and the orchestration engine over both

pub mod engine;
pub mod knowledge;
pub mod rag;

pub use engine::AnalysisEngine;
pub use knowledge::KnowledgeStore;
pub use rag::{DocumentIndexer, Retriever};
