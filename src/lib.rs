//! Prospector
//!
//! Multi-agent project analysis pipeline. Takes a project description,
//! retrieves context from an embedding index over the project's own
//! documents, fans out over a fixed set of analysis agents backed by a
//! text-generation provider, and folds their outputs into one report
//! while cataloguing every discovered repository and paper.
//!
//! The crate splits into:
//! - [`config`]: environment-driven configuration
//! - [`models`]: documents, knowledge records and pipeline payloads
//! - [`services`]: retrieval, the knowledge catalog and the engine
//! - [`utils`]: the error type and filesystem locations

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use services::engine::AnalysisEngine;
pub use utils::{AppError, AppResult};
