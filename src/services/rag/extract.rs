//! Document text extraction.
//!
//! Pulls plain text out of the document formats the indexer accepts:
//! UTF-8 text and Markdown, PDF via `pdf-extract`, and DOCX by unpacking
//! the ZIP archive and collecting text runs from `word/document.xml`.

use std::path::Path;

use crate::utils::{AppError, AppResult};

/// File extensions the extraction layer understands (lowercase, no dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "docx"];

/// Maximum file size for document extraction (50MB)
const MAX_DOC_SIZE: u64 = 50 * 1024 * 1024;

/// True when `ext` names a format [`extract_text`] can handle.
pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

/// Extract plain text from a document on disk, dispatching on extension.
///
/// A readable document that happens to contain no text yields an empty
/// string rather than an error.
///
/// # Errors
///
/// Returns `AppError::UnsupportedFormat` for extensions outside
/// [`SUPPORTED_EXTENSIONS`] and `AppError::Extraction` for files that
/// cannot be read or parsed.
pub fn extract_text(path: &Path) -> AppResult<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" | "md" => read_plain_text(path),
        "pdf" => extract_pdf(path),
        "docx" => extract_docx(path),
        "" => Err(AppError::unsupported_format(format!(
            "file has no extension: {}",
            path.display()
        ))),
        other => Err(AppError::unsupported_format(format!(
            "unsupported file type: .{}",
            other
        ))),
    }
}

/// Check file size against the extraction limit
fn check_file_size(path: &Path) -> AppResult<u64> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        AppError::extraction(format!(
            "failed to read metadata for {}: {}",
            path.display(),
            e
        ))
    })?;
    let size = metadata.len();
    if size > MAX_DOC_SIZE {
        return Err(AppError::extraction(format!(
            "file too large: {:.1} MB (max {:.1} MB)",
            size as f64 / (1024.0 * 1024.0),
            MAX_DOC_SIZE as f64 / (1024.0 * 1024.0)
        )));
    }
    Ok(size)
}

fn read_plain_text(path: &Path) -> AppResult<String> {
    check_file_size(path)?;
    std::fs::read_to_string(path)
        .map_err(|e| AppError::extraction(format!("failed to read {}: {}", path.display(), e)))
}

fn extract_pdf(path: &Path) -> AppResult<String> {
    check_file_size(path)?;
    pdf_extract::extract_text(path).map_err(|e| {
        AppError::extraction(format!(
            "failed to extract PDF text from {}: {}",
            path.display(),
            e
        ))
    })
}

/// Extract DOCX text by reading `word/document.xml` out of the ZIP archive.
///
/// One output paragraph per `<w:p>` element, paragraphs separated by a
/// blank line. Non-text content (tables of properties, drawings) is
/// skipped.
fn extract_docx(path: &Path) -> AppResult<String> {
    check_file_size(path)?;

    let file = std::fs::File::open(path)
        .map_err(|e| AppError::extraction(format!("failed to open {}: {}", path.display(), e)))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| AppError::extraction(format!("failed to read DOCX as ZIP: {}", e)))?;

    let mut doc_xml = String::new();
    {
        let mut doc_entry = archive
            .by_name("word/document.xml")
            .map_err(|_| AppError::extraction("invalid DOCX: missing word/document.xml"))?;
        std::io::Read::read_to_string(&mut doc_entry, &mut doc_xml)
            .map_err(|e| AppError::extraction(format!("failed to read document.xml: {}", e)))?;
    }

    // Collect text from <w:t> runs, one output paragraph per <w:p>.
    let mut reader = quick_xml::Reader::from_str(&doc_xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut paragraph_text = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(ref e)) => {
                let local_name = e.local_name();
                let name = std::str::from_utf8(local_name.as_ref()).unwrap_or("");
                if name == "p" {
                    paragraph_text.clear();
                } else if name == "t" {
                    in_text_run = true;
                }
            }
            Ok(quick_xml::events::Event::End(ref e)) => {
                let local_name = e.local_name();
                let name = std::str::from_utf8(local_name.as_ref()).unwrap_or("");
                if name == "p" {
                    if !paragraph_text.is_empty() {
                        paragraphs.push(std::mem::take(&mut paragraph_text));
                    }
                } else if name == "t" {
                    in_text_run = false;
                }
            }
            Ok(quick_xml::events::Event::Text(ref e)) => {
                if in_text_run {
                    if let Ok(text) = e.unescape() {
                        paragraph_text.push_str(&text);
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => {
                return Err(AppError::extraction(format!(
                    "XML parse error in {}: {}",
                    path.display(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs.join("\n\n"))
}
