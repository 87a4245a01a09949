//! Core record types shared by every store and by the pipeline coordinator.
//!
//! Mirrors the teacher's flat, serde-derived record style (see
//! `llm::Relation`), but typed around chunks and facts instead of
//! graph relations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    Pending,
    Processing,
    Processed,
    Error,
}

impl std::fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChunkStatus::Pending => "pending",
            ChunkStatus::Processing => "processing",
            ChunkStatus::Processed => "processed",
            ChunkStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Verified,
    Rejected,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// A word-bounded slice of a document's raw text, the unit of LLM extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub document_name: String,
    pub document_hash: String,
    pub chunk_index: usize,
    pub content: String,
    pub start_offset: usize,
    pub status: ChunkStatus,
    pub contains_facts: bool,
    pub all_facts_extracted: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chunk {
    pub fn key(&self) -> (String, usize) {
        (self.document_hash.clone(), self.chunk_index)
    }
}

/// A verified or rejected candidate statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub fact_id: String,
    pub statement: String,
    pub document_name: String,
    pub source_chunk_index: usize,
    pub original_text: String,
    pub verification_status: VerificationStatus,
    pub verification_reason: String,
    pub extracted_at: DateTime<Utc>,
    pub verified_at: DateTime<Utc>,
    pub fact_hash: String,
}

/// Normalize a statement the way `fact_hash` is computed: trim, case-fold.
pub fn normalize_statement(statement: &str) -> String {
    statement.trim().to_lowercase()
}

pub fn fact_hash(statement: &str) -> String {
    format!("{:x}", md5::compute(normalize_statement(statement).as_bytes()))
}

pub fn document_hash(raw_text: &str) -> String {
    format!("{:x}", md5::compute(raw_text.as_bytes()))
}

/// Outcome of a `submit` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub chunks_processed: usize,
    pub candidates_extracted: usize,
    pub verified: usize,
    pub rejected: usize,
    pub errors: Vec<String>,
    pub already_complete: bool,
}

/// A vector-index entry's metadata, kept alongside the embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub document_name: String,
    pub chunk_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_hash_is_case_and_whitespace_insensitive() {
        assert_eq!(fact_hash("  Acme shipped 12 units.  "), fact_hash("acme shipped 12 units."));
    }

    #[test]
    fn document_hash_is_deterministic() {
        assert_eq!(document_hash("hello world"), document_hash("hello world"));
        assert_ne!(document_hash("hello world"), document_hash("hello there"));
    }

    #[test]
    fn chunk_key_combines_hash_and_index() {
        let chunk = Chunk {
            document_name: "doc".into(),
            document_hash: "abc".into(),
            chunk_index: 3,
            content: String::new(),
            start_offset: 0,
            status: ChunkStatus::Pending,
            contains_facts: false,
            all_facts_extracted: false,
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(chunk.key(), ("abc".to_string(), 3));
    }
}
