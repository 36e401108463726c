//! Word-window text chunking.
//!
//! Splits extracted document text into fixed-size overlapping windows of
//! whitespace-separated words. Chunking is deterministic: the same text and
//! parameters always produce the same windows, which keeps chunk/vector
//! pairing stable across rebuilds.

use crate::utils::{AppError, AppResult};

/// Default window size in words.
pub const DEFAULT_CHUNK_WINDOW: usize = 500;

/// Default overlap between adjacent windows, in words.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Split `text` into overlapping word windows.
///
/// Windows start every `window - overlap` words and span up to `window`
/// words; the final partial window is retained. Whitespace-only text
/// produces zero chunks. Words inside a chunk are re-joined with single
/// spaces, so original whitespace runs are not preserved.
///
/// # Errors
///
/// Returns `AppError::Validation` when `window` is zero or `overlap` is not
/// strictly smaller than `window` (the step would be zero or negative).
pub fn chunk_text(text: &str, window: usize, overlap: usize) -> AppResult<Vec<String>> {
    if window == 0 {
        return Err(AppError::validation("chunk window must be positive"));
    }
    if overlap >= window {
        return Err(AppError::validation(format!(
            "chunk overlap {} must be smaller than window {}",
            overlap, window
        )));
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let step = window - overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + window).min(words.len());
        chunks.push(words[start..end].join(" "));
        start += step;
    }

    Ok(chunks)
}

/// `chunk_text` with the default 500-word window and 50-word overlap.
pub fn chunk_text_default(text: &str) -> AppResult<Vec<String>> {
    chunk_text(text, DEFAULT_CHUNK_WINDOW, DEFAULT_CHUNK_OVERLAP)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
