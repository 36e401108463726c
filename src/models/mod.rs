//! Data Models
//!
//! Contains all data structures used throughout the application.

pub mod document;
pub mod knowledge;
pub mod pipeline;

pub use document::*;
pub use knowledge::*;
pub use pipeline::*;
