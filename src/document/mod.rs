//! Ambient document-reader layer: turns a file on disk into
//! `(document_name, raw_text, source_uri)` for `Pipeline::submit`.
//!
//! spec.md treats ingestion as "raw_text already in hand"; the CLI
//! still needs something to hand it that text, so this module ports
//! the teacher's `parser::{text,markdown,html,pdf}` format adapters
//! behind a single `read_document` dispatch, dropping the teacher's
//! `DocumentParser` (which also chunked — chunking is C5's job here).

mod html;
mod markdown;
mod pdf;
mod text;

use std::path::Path;

use crate::error::{FactCheckError, Result};

/// A document ready for `submit`: `document_name` defaults to the
/// file's name, `source_uri` is a `file://` URI of its path.
pub struct ReadDocument {
    pub document_name: String,
    pub raw_text: String,
    pub source_uri: String,
}

/// Read `path`, dispatching on extension to the matching format
/// adapter. Unsupported extensions surface as `UnsupportedFormat`,
/// matching spec.md §7's input-error class.
pub fn read_document(path: &Path) -> Result<ReadDocument> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let raw_text = match extension.as_str() {
        "txt" => text::extract_text(path)?,
        "md" | "markdown" => markdown::extract_text(path)?,
        "html" | "htm" => html::extract_text(path)?,
        "pdf" => pdf::extract_text(path)?,
        other => return Err(FactCheckError::UnsupportedFormat(other.to_string())),
    };

    let document_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());

    Ok(ReadDocument {
        document_name,
        source_uri: format!("file://{}", path.display()),
        raw_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xyz");
        std::fs::write(&path, "content").unwrap();
        let err = read_document(&path).unwrap_err();
        assert!(matches!(err, FactCheckError::UnsupportedFormat(_)));
    }

    #[test]
    fn reads_plain_text_with_derived_name() {
        let mut file = NamedTempFile::with_suffix(".txt").unwrap();
        writeln!(file, "Hello, world!").unwrap();
        let doc = read_document(file.path()).unwrap();
        assert!(doc.raw_text.contains("Hello, world!"));
        assert!(doc.source_uri.starts_with("file://"));
    }
}
