//! C1 FactStore / C2 RejectedFactStore.
//!
//! Both verified and rejected facts share the `Fact` schema (§3) but
//! never share a mutex or a file — invariant 2 requires the two
//! tables to be independently lockable so a status-flip move can hold
//! both locks without deadlocking itself. `FactTable` is the shared
//! implementation; `FactStore`/`RejectedFactStore` are thin typed
//! wrappers fixing the on-disk path and the expected
//! `verification_status`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::{FactCheckError, Result};
use crate::model::{fact_hash, Fact, VerificationStatus};
use crate::store::csv_util::{read_rows, write_rows};

const HEADER: &str = "fact_id,statement,document_name,source_chunk_index,original_text,verification_status,verification_reason,extracted_at,verified_at,fact_hash";

struct Inner {
    rows: Vec<Fact>,
}

/// A single mutex-guarded, file-backed table of facts.
pub struct FactTable {
    path: PathBuf,
    expected_status: VerificationStatus,
    inner: Mutex<Inner>,
}

impl FactTable {
    pub fn open(path: impl AsRef<Path>, expected_status: VerificationStatus) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let rows = load(&path)?;
        Ok(Self {
            path,
            expected_status,
            inner: Mutex::new(Inner { rows }),
        })
    }

    /// Store a fact, returning its `fact_id`. If a fact with the same
    /// `fact_hash` already exists, returns the existing id without
    /// inserting a duplicate row.
    pub fn store(&self, fact: Fact) -> Result<String> {
        let mut guard = self.inner.lock().unwrap();
        if let Some(existing) = guard.rows.iter().find(|f| f.fact_hash == fact.fact_hash) {
            return Ok(existing.fact_id.clone());
        }
        let id = fact.fact_id.clone();
        guard.rows.push(fact);
        self.flush(&guard.rows)?;
        Ok(id)
    }

    /// Remove the row matching `(document_name, fact_hash)` of `statement`.
    /// Returns the removed fact, if any.
    pub fn remove(&self, document_name: &str, statement: &str) -> Result<Option<Fact>> {
        let hash = fact_hash(statement);
        let mut guard = self.inner.lock().unwrap();
        let pos = guard
            .rows
            .iter()
            .position(|f| f.document_name == document_name && f.fact_hash == hash);
        let removed = pos.map(|i| guard.rows.remove(i));
        if removed.is_some() {
            self.flush(&guard.rows)?;
        }
        Ok(removed)
    }

    /// Remove by `fact_id` directly (used by C9 moves, where the caller
    /// already holds the row).
    pub fn remove_by_id(&self, fact_id: &str) -> Result<Option<Fact>> {
        let mut guard = self.inner.lock().unwrap();
        let pos = guard.rows.iter().position(|f| f.fact_id == fact_id);
        let removed = pos.map(|i| guard.rows.remove(i));
        if removed.is_some() {
            self.flush(&guard.rows)?;
        }
        Ok(removed)
    }

    /// Atomic remove+insert preserving `fact_id`, updating the statement,
    /// reason, and `verified_at` timestamp.
    pub fn update(
        &self,
        fact_id: &str,
        new_statement: Option<String>,
        new_reason: Option<String>,
    ) -> Result<Fact> {
        let mut guard = self.inner.lock().unwrap();
        let pos = guard
            .rows
            .iter()
            .position(|f| f.fact_id == fact_id)
            .ok_or_else(|| FactCheckError::FactNotFound(fact_id.to_string()))?;

        let mut updated = guard.rows.remove(pos);
        if let Some(statement) = new_statement {
            updated.fact_hash = fact_hash(&statement);
            updated.statement = statement;
        }
        if let Some(reason) = new_reason {
            updated.verification_reason = reason;
        }
        updated.verified_at = Utc::now();
        guard.rows.push(updated.clone());
        self.flush(&guard.rows)?;
        Ok(updated)
    }

    pub fn get_all(&self) -> Vec<Fact> {
        let guard = self.inner.lock().unwrap();
        guard.rows.clone()
    }

    pub fn get_by_document(&self, document_name: &str) -> Vec<Fact> {
        let guard = self.inner.lock().unwrap();
        guard
            .rows
            .iter()
            .filter(|f| f.document_name == document_name)
            .cloned()
            .collect()
    }

    pub fn get_by_id(&self, fact_id: &str) -> Option<Fact> {
        let guard = self.inner.lock().unwrap();
        guard.rows.iter().find(|f| f.fact_id == fact_id).cloned()
    }

    pub fn contains_hash(&self, hash: &str) -> bool {
        let guard = self.inner.lock().unwrap();
        guard.rows.iter().any(|f| f.fact_hash == hash)
    }

    /// Remove every row for a document; returns the count removed.
    pub fn purge_document(&self, document_name: &str) -> Result<Vec<Fact>> {
        let mut guard = self.inner.lock().unwrap();
        let (removed, kept): (Vec<Fact>, Vec<Fact>) = guard
            .rows
            .drain(..)
            .partition(|f| f.document_name == document_name);
        guard.rows = kept;
        self.flush(&guard.rows)?;
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn expected_status(&self) -> VerificationStatus {
        self.expected_status
    }

    /// Overwrite the whole table, used by C9 to restore a pre-mutation
    /// snapshot when a multi-store transaction fails invariant checks.
    pub fn replace_all(&self, rows: Vec<Fact>) -> Result<()> {
        let mut guard = self.inner.lock().unwrap();
        guard.rows = rows;
        self.flush(&guard.rows)
    }

    fn flush(&self, rows: &[Fact]) -> Result<()> {
        let csv_rows: Vec<Vec<String>> = rows.iter().map(fact_to_row).collect();
        write_rows(&self.path, HEADER, &csv_rows)
    }
}

fn fact_to_row(fact: &Fact) -> Vec<String> {
    vec![
        fact.fact_id.clone(),
        fact.statement.clone(),
        fact.document_name.clone(),
        fact.source_chunk_index.to_string(),
        fact.original_text.clone(),
        fact.verification_status.to_string(),
        fact.verification_reason.clone(),
        fact.extracted_at.to_rfc3339(),
        fact.verified_at.to_rfc3339(),
        fact.fact_hash.clone(),
    ]
}

fn load(path: &Path) -> Result<Vec<Fact>> {
    let rows = read_rows(path)?;
    let mut facts = Vec::with_capacity(rows.len());
    for row in rows {
        if row.len() != 10 {
            return Err(FactCheckError::StoreUnavailable(format!(
                "corrupt fact row in {}: expected 10 fields, got {}",
                path.display(),
                row.len()
            )));
        }
        let verification_status = match row[5].as_str() {
            "verified" => VerificationStatus::Verified,
            "rejected" => VerificationStatus::Rejected,
            other => {
                return Err(FactCheckError::StoreUnavailable(format!(
                    "corrupt verification_status '{other}' in {}",
                    path.display()
                )))
            }
        };
        facts.push(Fact {
            fact_id: row[0].clone(),
            statement: row[1].clone(),
            document_name: row[2].clone(),
            source_chunk_index: row[3].parse().map_err(|_| {
                FactCheckError::StoreUnavailable(format!("corrupt chunk index in {}", path.display()))
            })?,
            original_text: row[4].clone(),
            verification_status,
            verification_reason: row[6].clone(),
            extracted_at: parse_timestamp(&row[7])?,
            verified_at: parse_timestamp(&row[8])?,
            fact_hash: row[9].clone(),
        });
    }
    Ok(facts)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FactCheckError::StoreUnavailable(format!("corrupt timestamp '{s}': {e}")))
}

/// C1 — verified fact store.
pub struct FactStore(FactTable);

impl FactStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self(FactTable::open(path, VerificationStatus::Verified)?))
    }
}

impl std::ops::Deref for FactStore {
    type Target = FactTable;
    fn deref(&self) -> &FactTable {
        &self.0
    }
}

/// C2 — rejected fact store.
pub struct RejectedFactStore(FactTable);

impl RejectedFactStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self(FactTable::open(path, VerificationStatus::Rejected)?))
    }
}

impl std::ops::Deref for RejectedFactStore {
    type Target = FactTable;
    fn deref(&self) -> &FactTable {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_fact(statement: &str) -> Fact {
        let now = Utc::now();
        Fact {
            fact_id: uuid::Uuid::new_v4().to_string(),
            statement: statement.to_string(),
            document_name: "doc-1".to_string(),
            source_chunk_index: 0,
            original_text: "In 2023, ACME shipped 12,345 units.".to_string(),
            verification_status: VerificationStatus::Verified,
            verification_reason: "supported by context".to_string(),
            extracted_at: now,
            verified_at: now,
            fact_hash: fact_hash(statement),
        }
    }

    #[test]
    fn store_then_get_all_roundtrips() {
        let dir = tempdir().unwrap();
        let store = FactStore::open(dir.path().join("facts.csv")).unwrap();
        let fact = sample_fact("ACME shipped 12,345 units in 2023.");
        let id = store.store(fact.clone()).unwrap();
        assert_eq!(id, fact.fact_id);
        let all = store.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].statement, fact.statement);
    }

    #[test]
    fn duplicate_store_returns_existing_id_without_new_row() {
        let dir = tempdir().unwrap();
        let store = FactStore::open(dir.path().join("facts.csv")).unwrap();
        let fact = sample_fact("Same statement.");
        let id1 = store.store(fact.clone()).unwrap();
        let mut dup = sample_fact("same statement.  ");
        dup.fact_id = "different-id".to_string();
        dup.fact_hash = fact_hash(&dup.statement);
        let id2 = store.store(dup).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_preserves_fact_id() {
        let dir = tempdir().unwrap();
        let store = FactStore::open(dir.path().join("facts.csv")).unwrap();
        let fact = sample_fact("Original statement.");
        let id = store.store(fact.clone()).unwrap();
        let updated = store.update(&id, Some("New statement.".to_string()), None).unwrap();
        assert_eq!(updated.fact_id, id);
        assert_eq!(updated.statement, "New statement.");
    }

    #[test]
    fn persists_and_reloads_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("facts.csv");
        {
            let store = FactStore::open(&path).unwrap();
            store.store(sample_fact("Persisted fact.")).unwrap();
        }
        let reloaded = FactStore::open(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get_all()[0].statement, "Persisted fact.");
    }

    #[test]
    fn purge_document_removes_only_its_rows() {
        let dir = tempdir().unwrap();
        let store = FactStore::open(dir.path().join("facts.csv")).unwrap();
        store.store(sample_fact("Fact A.")).unwrap();
        let mut other_doc = sample_fact("Fact B.");
        other_doc.document_name = "doc-2".to_string();
        store.store(other_doc).unwrap();

        let removed = store.purge_document("doc-1").unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_all()[0].document_name, "doc-2");
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = FactStore::open(dir.path().join("nope.csv")).unwrap();
        assert!(store.is_empty());
    }
}
