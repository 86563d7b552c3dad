//! Local file reader.
//!
//! Reads one file into a single document. PDF and DOCX go through
//! [`crate::extract`]; HTML is converted to markdown text; everything else is read as
//! (lossy) UTF-8. The content kind is derived from the MIME type and the
//! file extension.

use std::path::Path;

use crate::config::FilesConfig;
use crate::connector_web::html_to_text;
use crate::error::{IngestError, IngestResult};
use crate::extract;
use crate::language::Language;
use crate::models::{ContentKind, Fetched, FetchedDocument};

/// MIME type for a path, from its extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "md" | "markdown" => "text/markdown",
        "txt" | "text" | "log" => "text/plain",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "js" | "jsx" => "text/javascript",
        "ts" | "tsx" => "text/typescript",
        "py" => "text/x-python",
        "rs" => "text/x-rust",
        "pdf" => extract::MIME_PDF,
        "docx" => extract::MIME_DOCX,
        _ => "text/plain",
    }
}

/// Content kind for a file: markdown is documentation, a recognised
/// source language is code, anything else is text.
pub fn content_kind_for(mime: &str, path: &Path) -> ContentKind {
    if mime.contains("text/markdown") {
        ContentKind::Documentation
    } else if Language::from_locator(&path.to_string_lossy()).is_code() {
        ContentKind::Code
    } else {
        ContentKind::Text
    }
}

/// Read `path` into a [`Fetched`] with MIME type and byte size recorded.
pub fn read_file(config: &FilesConfig, path: &Path) -> IngestResult<Fetched> {
    let size = std::fs::metadata(path)?.len();
    if size > config.max_bytes {
        return Err(IngestError::FileTooLarge {
            path: path.display().to_string(),
            size,
            limit: config.max_bytes,
        });
    }

    let mime = mime_for_path(path);
    let bytes = std::fs::read(path)?;
    let content = if extract::is_extractable(mime) {
        extract::extract_text(&bytes, mime)?
    } else if mime == "text/html" {
        html_to_text(&String::from_utf8_lossy(&bytes))?
    } else {
        String::from_utf8_lossy(&bytes).into_owned()
    };

    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(Fetched {
        title,
        documents: vec![FetchedDocument {
            locator: path.display().to_string(),
            content,
            kind: content_kind_for(mime, path),
        }],
        file_type: Some(mime.to_string()),
        size: Some(size),
    })
}
