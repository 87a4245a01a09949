//! C4 — semantic index over verified fact statements.
//!
//! Flat-file JSON store keyed by `fact_id`, grounded on the
//! `vector_store.rs` reference example's `IndexStore`/`cosine_similarity`
//! shape, simplified since this domain embeds one vector per fact rather
//! than a multi-chunk-per-file fan-out.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{FactCheckError, Result};
use crate::model::VectorMetadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    pub vector: Vec<f32>,
    pub metadata: VectorMetadata,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    entries: HashMap<String, VectorEntry>,
}

pub struct VectorIndex {
    path: PathBuf,
    inner: Mutex<IndexFile>,
}

#[derive(Debug, Clone)]
pub struct ScoredFact {
    pub fact_id: String,
    pub similarity: f32,
}

impl VectorIndex {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(FactCheckError::Io)?;
            serde_json::from_str(&text).map_err(|e| {
                FactCheckError::StoreUnavailable(format!("corrupt vector index {}: {e}", path.display()))
            })?
        } else {
            IndexFile::default()
        };
        Ok(Self {
            path,
            inner: Mutex::new(inner),
        })
    }

    /// Add or replace the entry for `fact_id`.
    pub fn add(&self, fact_id: &str, vector: Vec<f32>, metadata: VectorMetadata) -> Result<()> {
        let mut guard = self.inner.lock().unwrap();
        guard.entries.insert(fact_id.to_string(), VectorEntry { vector, metadata });
        self.flush(&guard)
    }

    /// Replace the vector/metadata for an existing entry (delete+add).
    pub fn update(&self, fact_id: &str, vector: Vec<f32>, metadata: VectorMetadata) -> Result<()> {
        self.add(fact_id, vector, metadata)
    }

    pub fn delete(&self, fact_id: &str) -> Result<()> {
        let mut guard = self.inner.lock().unwrap();
        guard.entries.remove(fact_id);
        self.flush(&guard)
    }

    /// Top-`k` fact ids ranked by cosine similarity to `query_vector`.
    pub fn query(&self, query_vector: &[f32], k: usize) -> Vec<ScoredFact> {
        let guard = self.inner.lock().unwrap();
        let mut scored: Vec<ScoredFact> = guard
            .entries
            .iter()
            .map(|(fact_id, entry)| ScoredFact {
                fact_id: fact_id.clone(),
                similarity: cosine_similarity(query_vector, &entry.vector),
            })
            .collect();
        scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn contains(&self, fact_id: &str) -> bool {
        self.inner.lock().unwrap().entries.contains_key(fact_id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.inner.lock().unwrap().entries.keys().cloned().collect()
    }

    /// Overwrite the whole index, used by C9 to restore a pre-mutation
    /// snapshot when a multi-store transaction fails invariant checks.
    pub fn replace_all(&self, entries: HashMap<String, VectorEntry>) -> Result<()> {
        let mut guard = self.inner.lock().unwrap();
        guard.entries = entries;
        self.flush(&guard)
    }

    pub fn entries_snapshot(&self) -> HashMap<String, VectorEntry> {
        self.inner.lock().unwrap().entries.clone()
    }

    fn flush(&self, file: &IndexFile) -> Result<()> {
        let text = serde_json::to_string(file)
            .map_err(|e| FactCheckError::StoreUnavailable(format!("failed to serialize vector index: {e}")))?;
        std::fs::write(&self.path, text).map_err(FactCheckError::Io)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
