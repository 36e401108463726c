//! Prospector LLM
//!
//! Provider abstraction for text generation. Ships a single concrete
//! provider (Google Gemini) behind the [`LlmProvider`] trait so the
//! analysis engine can swap in scripted providers for tests.

pub mod gemini;
pub mod http_client;
pub mod provider;
pub mod types;

// Re-export main types
pub use gemini::GeminiProvider;
pub use http_client::build_http_client;
pub use provider::{missing_api_key_error, parse_http_error, LlmProvider};
pub use types::*;
