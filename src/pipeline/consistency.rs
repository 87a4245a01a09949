//! C9 — snapshot/restore around multi-store mutations.
//!
//! No teacher equivalent exists (Neo4j is the teacher's only store, so
//! it never had a cross-store consistency problem). Grounded on the
//! general Rust guard/snapshot pattern combined with the teacher's own
//! `Result`-propagation style, and on spec.md §9's explicit call-out
//! that cross-store drift after edits is a recurring bug resolved by
//! snapshot/verify/restore.

use std::collections::{HashMap, HashSet};

use crate::error::{FactCheckError, Result};
use crate::model::Fact;
use crate::store::fact_store::FactTable;
use crate::vector::{VectorEntry, VectorIndex};

/// In-memory copy of the three stores' state, taken before a
/// multi-store mutation, used to roll back on failure. Durability is
/// provided by each store's own post-mutation flush, not by this
/// snapshot.
pub struct ConsistencySnapshot {
    fact_rows: Vec<Fact>,
    rejected_rows: Vec<Fact>,
    vector_entries: HashMap<String, VectorEntry>,
}

impl ConsistencySnapshot {
    pub fn capture(facts: &FactTable, rejected: &FactTable, vectors: &VectorIndex) -> Self {
        Self {
            fact_rows: facts.get_all(),
            rejected_rows: rejected.get_all(),
            vector_entries: vectors.entries_snapshot(),
        }
    }

    pub fn restore(self, facts: &FactTable, rejected: &FactTable, vectors: &VectorIndex) -> Result<()> {
        facts.replace_all(self.fact_rows)?;
        rejected.replace_all(self.rejected_rows)?;
        vectors.replace_all(self.vector_entries)?;
        Ok(())
    }
}

/// Verify invariants 1–3 (§3): unique fact hashes per store, no fact in
/// both stores, and VectorIndex ≡ verified FactStore by `fact_id`.
pub fn verify_invariants(facts: &FactTable, rejected: &FactTable, vectors: &VectorIndex) -> Result<()> {
    let fact_rows = facts.get_all();
    let rejected_rows = rejected.get_all();

    let fact_hashes: HashSet<&str> = fact_rows.iter().map(|f| f.fact_hash.as_str()).collect();
    if fact_hashes.len() != fact_rows.len() {
        return Err(FactCheckError::ConsistencyViolation(
            "duplicate fact_hash within verified store".to_string(),
        ));
    }

    let rejected_hashes: HashSet<&str> = rejected_rows.iter().map(|f| f.fact_hash.as_str()).collect();
    if rejected_hashes.len() != rejected_rows.len() {
        return Err(FactCheckError::ConsistencyViolation(
            "duplicate fact_hash within rejected store".to_string(),
        ));
    }

    if fact_hashes.intersection(&rejected_hashes).next().is_some() {
        return Err(FactCheckError::ConsistencyViolation(
            "fact_hash present in both verified and rejected stores".to_string(),
        ));
    }

    let fact_ids: HashSet<&str> = fact_rows.iter().map(|f| f.fact_id.as_str()).collect();
    let vector_ids: HashSet<String> = vectors.ids().into_iter().collect();
    let vector_ids: HashSet<&str> = vector_ids.iter().map(|s| s.as_str()).collect();
    if fact_ids != vector_ids {
        return Err(FactCheckError::ConsistencyViolation(
            "VectorIndex fact_ids do not match verified FactStore fact_ids".to_string(),
        ));
    }

    Ok(())
}

/// Snapshot, run `mutate`, verify invariants, and roll back on any
/// failure (either `mutate`'s own error or a post-mutation invariant
/// violation).
pub fn with_consistency_guard<F>(
    facts: &FactTable,
    rejected: &FactTable,
    vectors: &VectorIndex,
    mutate: F,
) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let snapshot = ConsistencySnapshot::capture(facts, rejected, vectors);

    match mutate() {
        Ok(()) => match verify_invariants(facts, rejected, vectors) {
            Ok(()) => Ok(()),
            Err(e) => {
                snapshot.restore(facts, rejected, vectors)?;
                Err(e)
            }
        },
        Err(e) => {
            snapshot.restore(facts, rejected, vectors)?;
            Err(e)
        }
    }
}
