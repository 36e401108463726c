//! Integration Tests Module
//!
//! End-to-end tests over the public crate surface: the retrieval pipeline
//! from raw files to scored context, the knowledge catalog's persistence
//! behavior, and full engine runs against scripted providers.

// Extraction -> chunking -> indexing -> retrieval round trips
mod rag_test;

// Knowledge catalog dedup, search, prune and persistence
mod knowledge_test;

// Full pipeline runs, degradation, conflicts and reset
mod engine_test;
