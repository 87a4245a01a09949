//! C3 — tabular persistence of chunks with per-chunk extraction-progress
//! flags and document-level content hash.
//!
//! `set_status` is a targeted merge keyed by `(document_hash,
//! chunk_index)`, serialized under the same mutex as every other
//! mutation, so concurrent flag updates to distinct chunks cannot
//! clobber one another.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::{FactCheckError, Result};
use crate::model::{Chunk, ChunkStatus};
use crate::store::csv_util::{read_rows, write_rows};

const HEADER: &str = "document_name,document_hash,chunk_index,content,start_offset,status,contains_facts,all_facts_extracted,error_message,created_at,updated_at";

struct Inner {
    rows: Vec<Chunk>,
}

pub struct ChunkStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl ChunkStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let rows = load(&path)?;
        Ok(Self {
            path,
            inner: Mutex::new(Inner { rows }),
        })
    }

    /// Idempotent upsert keyed by `(document_hash, chunk_index)`.
    pub fn upsert(&self, chunk: Chunk) -> Result<()> {
        let mut guard = self.inner.lock().unwrap();
        let key = chunk.key();
        if let Some(existing) = guard.rows.iter_mut().find(|c| c.key() == key) {
            *existing = chunk;
        } else {
            guard.rows.push(chunk);
        }
        self.flush(&guard.rows)
    }

    /// Targeted merge of progress flags for one chunk.
    pub fn set_status(
        &self,
        document_hash: &str,
        chunk_index: usize,
        status: ChunkStatus,
        contains_facts: Option<bool>,
        error_message: Option<String>,
        all_facts_extracted: Option<bool>,
    ) -> Result<()> {
        let mut guard = self.inner.lock().unwrap();
        let chunk = guard
            .rows
            .iter_mut()
            .find(|c| c.document_hash == document_hash && c.chunk_index == chunk_index)
            .ok_or_else(|| {
                FactCheckError::StoreUnavailable(format!(
                    "no chunk ({document_hash}, {chunk_index}) to update"
                ))
            })?;

        chunk.status = status;
        if let Some(v) = contains_facts {
            chunk.contains_facts = v;
        }
        if let Some(v) = all_facts_extracted {
            chunk.all_facts_extracted = v;
        }
        chunk.error_message = error_message;
        chunk.updated_at = Utc::now();

        self.flush(&guard.rows)
    }

    pub fn is_processed(&self, document_hash: &str, chunk_index: usize) -> bool {
        let guard = self.inner.lock().unwrap();
        guard
            .rows
            .iter()
            .any(|c| c.document_hash == document_hash && c.chunk_index == chunk_index && c.all_facts_extracted)
    }

    pub fn list_by_document(&self, document_name: &str) -> Result<Vec<Chunk>> {
        let guard = self.inner.lock().unwrap();
        Ok(guard
            .rows
            .iter()
            .filter(|c| c.document_name == document_name)
            .cloned()
            .collect())
    }

    pub fn list_by_hash(&self, document_hash: &str) -> Result<Vec<Chunk>> {
        let guard = self.inner.lock().unwrap();
        Ok(guard
            .rows
            .iter()
            .filter(|c| c.document_hash == document_hash)
            .cloned()
            .collect())
    }

    pub fn purge_document(&self, document_name: &str) -> Result<usize> {
        let mut guard = self.inner.lock().unwrap();
        let before = guard.rows.len();
        guard.rows.retain(|c| c.document_name != document_name);
        let removed = before - guard.rows.len();
        self.flush(&guard.rows)?;
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn flush(&self, rows: &[Chunk]) -> Result<()> {
        let csv_rows: Vec<Vec<String>> = rows.iter().map(chunk_to_row).collect();
        write_rows(&self.path, HEADER, &csv_rows)
    }
}

fn chunk_to_row(chunk: &Chunk) -> Vec<String> {
    vec![
        chunk.document_name.clone(),
        chunk.document_hash.clone(),
        chunk.chunk_index.to_string(),
        chunk.content.clone(),
        chunk.start_offset.to_string(),
        chunk.status.to_string(),
        chunk.contains_facts.to_string(),
        chunk.all_facts_extracted.to_string(),
        chunk.error_message.clone().unwrap_or_default(),
        chunk.created_at.to_rfc3339(),
        chunk.updated_at.to_rfc3339(),
    ]
}

fn load(path: &Path) -> Result<Vec<Chunk>> {
    let rows = read_rows(path)?;
    let mut chunks = Vec::with_capacity(rows.len());
    for row in rows {
        if row.len() != 11 {
            return Err(FactCheckError::StoreUnavailable(format!(
                "corrupt chunk row in {}: expected 11 fields, got {}",
                path.display(),
                row.len()
            )));
        }
        let status = match row[5].as_str() {
            "pending" => ChunkStatus::Pending,
            "processing" => ChunkStatus::Processing,
            "processed" => ChunkStatus::Processed,
            "error" => ChunkStatus::Error,
            other => {
                return Err(FactCheckError::StoreUnavailable(format!(
                    "corrupt chunk status '{other}' in {}",
                    path.display()
                )))
            }
        };
        chunks.push(Chunk {
            document_name: row[0].clone(),
            document_hash: row[1].clone(),
            chunk_index: row[2]
                .parse()
                .map_err(|_| FactCheckError::StoreUnavailable(format!("corrupt chunk_index in {}", path.display())))?,
            content: row[3].clone(),
            start_offset: row[4]
                .parse()
                .map_err(|_| FactCheckError::StoreUnavailable(format!("corrupt start_offset in {}", path.display())))?,
            status,
            contains_facts: row[6].parse().unwrap_or(false),
            all_facts_extracted: row[7].parse().unwrap_or(false),
            error_message: if row[8].is_empty() { None } else { Some(row[8].clone()) },
            created_at: parse_timestamp(&row[9])?,
            updated_at: parse_timestamp(&row[10])?,
        });
    }
    Ok(chunks)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FactCheckError::StoreUnavailable(format!("corrupt timestamp '{s}': {e}")))
}
