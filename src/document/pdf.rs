use std::path::Path;

use crate::error::{FactCheckError, Result};

pub fn extract_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(FactCheckError::Io)?;
    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| FactCheckError::UnsupportedFormat(format!("pdf: {e}")))?;
    Ok(clean_pdf_text(&text))
}

fn clean_pdf_text(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .replace("  ", " ")
        .replace('\u{0}', "")
        .replace('\u{FEFF}', "")
}
