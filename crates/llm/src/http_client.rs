//! HTTP Client Factory
//!
//! Provides a factory function for building reqwest clients with the request
//! timeout all generation calls share.

use std::time::Duration;

/// Per-request timeout. Long synthesis prompts can take minutes to
/// generate.
const REQUEST_TIMEOUT_SECS: u64 = 180;

/// Build a `reqwest::Client` configured for generation API calls.
pub fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .expect("failed to build reqwest client")
}
