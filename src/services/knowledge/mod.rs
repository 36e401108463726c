//! Knowledge Catalog
//!
//! Persistent storage for research findings across runs:
//! - `store`: the hash-deduplicated JSON catalog of repositories, papers
//!   and finished analyses

pub mod store;

pub use store::KnowledgeStore;
