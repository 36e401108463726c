//! Cross-Platform Path Utilities
//!
//! Functions for resolving application directories across platforms.
//! All persistent artifacts live under ~/.prospector/ by default; the
//! data root can be relocated with PROSPECTOR_DATA_DIR.

use std::path::PathBuf;

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Prospector data directory (~/.prospector/ unless overridden)
pub fn data_dir() -> AppResult<PathBuf> {
    if let Ok(dir) = std::env::var("PROSPECTOR_DATA_DIR") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    Ok(home_dir()?.join(".prospector"))
}

/// Get the knowledge base file path (~/.prospector/knowledge_base.json)
pub fn knowledge_base_path() -> AppResult<PathBuf> {
    Ok(data_dir()?.join("knowledge_base.json"))
}

/// Get the vector index directory (~/.prospector/index/)
pub fn index_dir() -> AppResult<PathBuf> {
    Ok(data_dir()?.join("index"))
}

/// Get the analysis reports directory (~/.prospector/reports/)
pub fn reports_dir() -> AppResult<PathBuf> {
    Ok(data_dir()?.join("reports"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &PathBuf) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the data directory, creating if it doesn't exist
pub fn ensure_data_dir() -> AppResult<PathBuf> {
    let path = data_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}

/// Get the vector index directory, creating if it doesn't exist
pub fn ensure_index_dir() -> AppResult<PathBuf> {
    let path = index_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}

/// Get the reports directory, creating if it doesn't exist
pub fn ensure_reports_dir() -> AppResult<PathBuf> {
    let path = reports_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
