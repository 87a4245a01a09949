//! C8 — the state-machine driver: runs C5, schedules chunks under a
//! concurrency semaphore, and routes each verified/rejected decision
//! through C9's dual-store commit. This is the crate's public API
//! surface (§6.3): `submit`, `get_facts`, `search`, `update_fact`,
//! `purge_document`.
//!
//! Grounded in the *shape* of the teacher's `BatchProcessor`
//! (per-chunk processing loop, retry-with-fallback, stats
//! accumulation), generalized to the document/chunk dual state
//! machine and given a real `tokio::sync::Semaphore` concurrency
//! bound — the teacher's own `concurrency: usize` field was
//! `#[allow(dead_code)]` and never actually throttled anything.

pub mod consistency;
pub mod state;

use std::path::Path;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::chunker::Chunker;
use crate::config::Config;
use crate::embed::Embedder;
use crate::error::{FactCheckError, LlmError, Result};
use crate::llm::LlmClient;
use crate::model::{fact_hash, Chunk, ChunkStatus, Fact, Report, VectorMetadata, VerificationStatus};
use crate::pipeline::state::{ChunkState, DocumentState};
use crate::store::chunk_store::ChunkStore;
use crate::store::fact_store::{FactStore, RejectedFactStore};
use crate::vector::VectorIndex;

#[derive(Debug, Default)]
struct ChunkOutcome {
    candidates: usize,
    verified: usize,
    rejected: usize,
    error: Option<String>,
}

/// The crate's public entry point: owns all nine components and
/// exposes the operations in §6.3.
pub struct Pipeline {
    config: Config,
    chunker: Chunker,
    chunk_store: ChunkStore,
    fact_store: FactStore,
    rejected_store: RejectedFactStore,
    vector_index: VectorIndex,
    llm: LlmClient,
    embedder: Box<dyn Embedder>,
}

impl Pipeline {
    /// Open (or create) the on-disk stores under `config.data_dir` and
    /// wire up the real LLM/embedder collaborators.
    pub fn open(config: Config) -> Result<Self> {
        let llm = LlmClient::new(&config)?;
        let embedder = crate::embed::FastEmbedEmbedder::new(&config.embedding_model)?;
        Self::with_collaborators(config, llm, Box::new(embedder))
    }

    /// Construct with injected collaborators — the seam tests use to
    /// avoid a network call or a model download.
    pub fn with_collaborators(config: Config, llm: LlmClient, embedder: Box<dyn Embedder>) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).map_err(FactCheckError::Io)?;

        let chunk_store = ChunkStore::open(data_path(&config.data_dir, "all_chunks.csv"))?;
        let fact_store = FactStore::open(data_path(&config.data_dir, "all_facts.csv"))?;
        let rejected_store = RejectedFactStore::open(data_path(&config.data_dir, "rejected_facts.csv"))?;
        let vector_index = VectorIndex::open(data_path(&config.data_dir, "vector_index.json"))?;
        let chunker = Chunker::new(config.chunk_size_words, config.chunk_overlap_words);

        Ok(Self {
            config,
            chunker,
            chunk_store,
            fact_store,
            rejected_store,
            vector_index,
            llm,
            embedder,
        })
    }

    /// §6.3 `submit`.
    pub async fn submit(&self, document_name: &str, raw_text: &str, _source_uri: &str) -> Result<Report> {
        let mut doc_state = DocumentState::Init;
        tracing::debug!(document_name, ?doc_state, "submit: start");

        doc_state = DocumentState::Chunking;
        tracing::debug!(document_name, ?doc_state, "submit: chunking");
        let chunk_result = self.chunker.chunk_document(document_name, raw_text, &self.chunk_store)?;

        if chunk_result.already_complete {
            doc_state = DocumentState::Done;
            tracing::debug!(document_name, ?doc_state, "submit: already complete");
            return Ok(Report {
                already_complete: true,
                ..Default::default()
            });
        }

        let total_chunks = chunk_result.chunks.len();
        let semaphore = Semaphore::new(self.config.max_concurrent_chunks.max(1));

        doc_state = DocumentState::Extracting;
        tracing::debug!(document_name, ?doc_state, total_chunks, "submit: dispatching chunks");
        let mut futures = FuturesUnordered::new();
        for chunk in chunk_result.chunks {
            futures.push(async {
                let _permit = semaphore.acquire().await.expect("semaphore is never closed");
                self.process_chunk(chunk).await
            });
        }

        let mut report = Report {
            chunks_processed: total_chunks,
            ..Default::default()
        };
        doc_state = DocumentState::Verifying;
        tracing::debug!(document_name, ?doc_state, "submit: awaiting chunk outcomes");
        while let Some(outcome) = futures.next().await {
            report.candidates_extracted += outcome.candidates;
            report.verified += outcome.verified;
            report.rejected += outcome.rejected;
            if let Some(e) = outcome.error {
                report.errors.push(e);
            }
        }

        doc_state = if report.errors.is_empty() {
            DocumentState::Done
        } else {
            DocumentState::Error
        };
        tracing::debug!(document_name, ?doc_state, errors = report.errors.len(), "submit: finished");

        Ok(report)
    }

    /// §6.3 `get_facts`.
    pub fn get_facts(&self, document_name: Option<&str>, verified_only: bool) -> Vec<Fact> {
        let mut facts = match document_name {
            Some(name) => self.fact_store.get_by_document(name),
            None => self.fact_store.get_all(),
        };
        if !verified_only {
            let mut rejected = match document_name {
                Some(name) => self.rejected_store.get_by_document(name),
                None => self.rejected_store.get_all(),
            };
            facts.append(&mut rejected);
        }
        facts
    }

    /// §6.3 `search` — delegates to C4 and hydrates with C1 rows,
    /// dropping any vector result whose `fact_id` is missing from the
    /// tabular side (repair-on-read).
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<(Fact, f32)>> {
        let vector = self.embed_one(query).await?;
        let scored = self.vector_index.query(&vector, k);

        let mut results = Vec::with_capacity(scored.len());
        for s in scored {
            match self.fact_store.get_by_id(&s.fact_id) {
                Some(fact) => results.push((fact, s.similarity)),
                None => tracing::warn!(
                    fact_id = %s.fact_id,
                    "vector index entry has no matching fact row; dropping from search results"
                ),
            }
        }
        Ok(results)
    }

    /// §6.3 `update_fact`, routed through C9.
    pub async fn update_fact(
        &self,
        fact_id: &str,
        new_statement: Option<String>,
        new_status: Option<VerificationStatus>,
        reason: Option<String>,
    ) -> Result<()> {
        let current_status = self
            .fact_store
            .get_by_id(fact_id)
            .map(|f| f.verification_status)
            .or_else(|| self.rejected_store.get_by_id(fact_id).map(|f| f.verification_status))
            .ok_or_else(|| FactCheckError::FactNotFound(fact_id.to_string()))?;

        match (current_status, new_status) {
            (VerificationStatus::Verified, Some(VerificationStatus::Rejected)) => {
                consistency::with_consistency_guard(&self.fact_store, &self.rejected_store, &self.vector_index, || {
                    let mut fact = self
                        .fact_store
                        .remove_by_id(fact_id)?
                        .ok_or_else(|| FactCheckError::FactNotFound(fact_id.to_string()))?;
                    self.vector_index.delete(fact_id)?;
                    fact.verification_status = VerificationStatus::Rejected;
                    if let Some(r) = &reason {
                        fact.verification_reason = r.clone();
                    }
                    if let Some(s) = &new_statement {
                        fact.statement = s.clone();
                        fact.fact_hash = fact_hash(&fact.statement);
                    }
                    self.rejected_store.store(fact)?;
                    Ok(())
                })
            }
            (VerificationStatus::Rejected, Some(VerificationStatus::Verified)) => {
                let current = self
                    .rejected_store
                    .get_by_id(fact_id)
                    .ok_or_else(|| FactCheckError::FactNotFound(fact_id.to_string()))?;
                let statement_for_embedding = new_statement.clone().unwrap_or_else(|| current.statement.clone());
                let vector = self.embed_one(&statement_for_embedding).await?;

                consistency::with_consistency_guard(&self.fact_store, &self.rejected_store, &self.vector_index, || {
                    let mut fact = self
                        .rejected_store
                        .remove_by_id(fact_id)?
                        .ok_or_else(|| FactCheckError::FactNotFound(fact_id.to_string()))?;
                    fact.verification_status = VerificationStatus::Verified;
                    if let Some(r) = &reason {
                        fact.verification_reason = r.clone();
                    }
                    if let Some(s) = &new_statement {
                        fact.statement = s.clone();
                        fact.fact_hash = fact_hash(&fact.statement);
                    }
                    let metadata = VectorMetadata {
                        document_name: fact.document_name.clone(),
                        chunk_index: fact.source_chunk_index,
                    };
                    let id = self.fact_store.store(fact)?;
                    self.vector_index.add(&id, vector.clone(), metadata)?;
                    Ok(())
                })
            }
            (VerificationStatus::Verified, _) => {
                let new_vector = match &new_statement {
                    Some(s) => Some(self.embed_one(s).await?),
                    None => None,
                };
                consistency::with_consistency_guard(&self.fact_store, &self.rejected_store, &self.vector_index, || {
                    let updated = self.fact_store.update(fact_id, new_statement.clone(), reason.clone())?;
                    if let Some(v) = &new_vector {
                        let metadata = VectorMetadata {
                            document_name: updated.document_name.clone(),
                            chunk_index: updated.source_chunk_index,
                        };
                        self.vector_index.update(fact_id, v.clone(), metadata)?;
                    }
                    Ok(())
                })
            }
            (VerificationStatus::Rejected, _) => {
                consistency::with_consistency_guard(&self.fact_store, &self.rejected_store, &self.vector_index, || {
                    self.rejected_store.update(fact_id, new_statement.clone(), reason.clone())?;
                    Ok(())
                })
            }
        }
    }

    /// §6.3 `purge_document`.
    pub fn purge_document(&self, document_name: &str) -> Result<usize> {
        let mut removed_facts = 0usize;
        let mut removed_rejected = 0usize;

        consistency::with_consistency_guard(&self.fact_store, &self.rejected_store, &self.vector_index, || {
            let facts = self.fact_store.purge_document(document_name)?;
            for f in &facts {
                self.vector_index.delete(&f.fact_id)?;
            }
            removed_facts = facts.len();
            removed_rejected = self.rejected_store.purge_document(document_name)?.len();
            Ok(())
        })?;

        let removed_chunks = self.chunk_store.purge_document(document_name)?;
        Ok(removed_facts + removed_rejected + removed_chunks)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embedder.embed(&[text.to_string()]).await?;
        Ok(embeddings.into_iter().next().unwrap_or_default())
    }

    /// Per-chunk state machine: `PENDING -> EXTRACTING -> (NO_CANDIDATES
    /// | HAS_CANDIDATES) -> VERIFYING -> DONE | ERROR`. Errors here are
    /// contained: they mark the chunk `error` and return, but never
    /// propagate out of `submit`.
    async fn process_chunk(&self, chunk: Chunk) -> ChunkOutcome {
        let mut state = ChunkState::Pending;
        tracing::trace!(chunk_index = chunk.chunk_index, ?state, "chunk: start");
        let _ = self.chunk_store.set_status(
            &chunk.document_hash,
            chunk.chunk_index,
            ChunkStatus::Processing,
            None,
            None,
            None,
        );

        state = ChunkState::Extracting;
        tracing::trace!(chunk_index = chunk.chunk_index, ?state, "chunk: extracting");
        let candidates = match self.extract_with_retry(&chunk.content).await {
            Ok(c) => c,
            Err(e) => {
                state = ChunkState::Error;
                tracing::warn!(chunk_index = chunk.chunk_index, ?state, error = %e, "chunk extraction failed");
                let _ = self.chunk_store.set_status(
                    &chunk.document_hash,
                    chunk.chunk_index,
                    ChunkStatus::Error,
                    Some(false),
                    Some(e.to_string()),
                    Some(false),
                );
                return ChunkOutcome {
                    error: Some(format!("chunk {}: {e}", chunk.chunk_index)),
                    ..Default::default()
                };
            }
        };

        if candidates.is_empty() {
            state = ChunkState::NoCandidates;
            tracing::debug!(chunk_index = chunk.chunk_index, ?state, "chunk has no candidates");
            state = ChunkState::Done;
            let _ = self.chunk_store.set_status(
                &chunk.document_hash,
                chunk.chunk_index,
                ChunkStatus::Processed,
                Some(false),
                None,
                Some(true),
            );
            debug_assert!(state.is_terminal());
            return ChunkOutcome::default();
        }

        state = ChunkState::HasCandidates;
        tracing::trace!(chunk_index = chunk.chunk_index, ?state, count = candidates.len(), "chunk has candidates");
        let mut outcome = ChunkOutcome {
            candidates: candidates.len(),
            ..Default::default()
        };

        state = ChunkState::Verifying;
        tracing::trace!(chunk_index = chunk.chunk_index, ?state, "chunk: verifying");
        for statement in candidates {
            match self.verify_with_retry(&statement, &chunk.content).await {
                Ok((status, reason)) => {
                    let fact = crate::llm::new_fact_skeleton(
                        statement.clone(),
                        chunk.document_name.clone(),
                        chunk.chunk_index,
                        chunk.content.clone(),
                        status,
                        reason,
                    );
                    match self.commit_decision(fact).await {
                        Ok(VerificationStatus::Verified) => outcome.verified += 1,
                        Ok(VerificationStatus::Rejected) => outcome.rejected += 1,
                        Err(e) => outcome.error = Some(format!("chunk {} commit: {e}", chunk.chunk_index)),
                    }
                }
                Err(e) => {
                    outcome.error = Some(format!(
                        "chunk {} candidate '{statement}': {e}",
                        chunk.chunk_index
                    ));
                }
            }
        }

        let had_error = outcome.error.is_some();
        state = if had_error { ChunkState::Error } else { ChunkState::Done };
        tracing::debug!(chunk_index = chunk.chunk_index, ?state, "chunk finished");
        debug_assert!(state.is_terminal());
        let _ = self.chunk_store.set_status(
            &chunk.document_hash,
            chunk.chunk_index,
            if had_error { ChunkStatus::Error } else { ChunkStatus::Processed },
            Some(outcome.verified + outcome.rejected > 0),
            outcome.error.clone(),
            Some(!had_error),
        );

        outcome
    }

    /// Dual-store commit for a single decision (§4.7), wrapped in C9.
    async fn commit_decision(&self, fact: Fact) -> Result<VerificationStatus> {
        match fact.verification_status {
            VerificationStatus::Verified => {
                let vector = self.embed_one(&fact.statement).await?;
                let document_name = fact.document_name.clone();
                let chunk_index = fact.source_chunk_index;

                consistency::with_consistency_guard(&self.fact_store, &self.rejected_store, &self.vector_index, || {
                    let id = self.fact_store.store(fact.clone())?;
                    self.vector_index.add(
                        &id,
                        vector.clone(),
                        VectorMetadata {
                            document_name: document_name.clone(),
                            chunk_index,
                        },
                    )?;
                    Ok(())
                })?;
                Ok(VerificationStatus::Verified)
            }
            VerificationStatus::Rejected => {
                consistency::with_consistency_guard(&self.fact_store, &self.rejected_store, &self.vector_index, || {
                    self.rejected_store.store(fact.clone())?;
                    Ok(())
                })?;
                Ok(VerificationStatus::Rejected)
            }
        }
    }

    /// C6 with retry: rate-limit/timeout/transient errors are retried
    /// with `backoff_base_s.pow(attempt)` seconds of delay up to
    /// `max_retries`; a permanent (unparseable-response) failure
    /// surfaces immediately as `ExtractionParseError`.
    async fn extract_with_retry(&self, content: &str) -> Result<Vec<String>> {
        let mut attempt = 0u32;
        loop {
            match self.llm.extract_candidates(content).await {
                Ok(candidates) => return Ok(candidates),
                Err(LlmError::Permanent(msg)) => return Err(FactCheckError::ExtractionParseError(msg)),
                Err(e) if e.is_retriable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    self.sleep_backoff(attempt).await;
                }
                Err(e) => return Err(FactCheckError::Llm(e)),
            }
        }
    }

    /// C7 with the same retry/backoff discipline as extraction.
    async fn verify_with_retry(&self, statement: &str, original_text: &str) -> Result<(VerificationStatus, String)> {
        let mut attempt = 0u32;
        loop {
            match self.llm.verify_candidate(statement, original_text).await {
                Ok(v) => return Ok(v),
                Err(LlmError::Permanent(msg)) => return Err(FactCheckError::VerificationParseError(msg)),
                Err(e) if e.is_retriable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    self.sleep_backoff(attempt).await;
                }
                Err(e) => return Err(FactCheckError::Llm(e)),
            }
        }
    }

    async fn sleep_backoff(&self, attempt: u32) {
        let secs = self.config.backoff_base_s.saturating_pow(attempt);
        if secs > 0 {
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }
    }
}

fn data_path(data_dir: &Path, file_name: &str) -> std::path::PathBuf {
    data_dir.join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::test_support::FakeEmbedder;
    use crate::llm::test_support::FakeProvider;
    use tempfile::tempdir;

    fn test_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.data_dir = dir.to_path_buf();
        config.backoff_base_s = 0; // keep tests fast; real default is 2
        config.max_retries = 3;
        config
    }

    fn pipeline_with_responses(dir: &Path, responses: Vec<std::result::Result<String, LlmError>>) -> Pipeline {
        let config = test_config(dir);
        let llm = LlmClient::with_provider(Box::new(FakeProvider::new(responses)), config.llm_timeout_s);
        Pipeline::with_collaborators(config, llm, Box::new(FakeEmbedder::new())).unwrap()
    }

    #[tokio::test]
    async fn scenario_single_chunk_one_verified_fact() {
        let dir = tempdir().unwrap();
        let pipeline = pipeline_with_responses(
            dir.path(),
            vec![
                Ok("<fact>ACME shipped 12,345 units in 2023.</fact>".to_string()),
                Ok(r#"{"decision":"verified","reason":"supported by source"}"#.to_string()),
            ],
        );

        let report = pipeline
            .submit("doc-1", "In 2023, ACME shipped 12,345 units.", "file:///doc-1.txt")
            .await
            .unwrap();

        assert_eq!(report.chunks_processed, 1);
        assert_eq!(report.verified, 1);
        assert_eq!(report.rejected, 0);
        assert!(report.errors.is_empty());
        assert_eq!(pipeline.get_facts(None, true).len(), 1);
        assert_eq!(pipeline.vector_index.count(), 1);
    }

    #[tokio::test]
    async fn scenario_duplicate_submission_is_idempotent() {
        let dir = tempdir().unwrap();
        let pipeline = pipeline_with_responses(
            dir.path(),
            vec![
                Ok("<fact>ACME shipped 12,345 units in 2023.</fact>".to_string()),
                Ok(r#"{"decision":"verified","reason":"supported"}"#.to_string()),
            ],
        );

        let text = "In 2023, ACME shipped 12,345 units.";
        pipeline.submit("doc-1", text, "file:///doc-1.txt").await.unwrap();
        let second = pipeline.submit("doc-1", text, "file:///doc-1.txt").await.unwrap();

        assert!(second.already_complete);
        assert_eq!(second.verified, 0);
        assert_eq!(pipeline.vector_index.count(), 1);
    }

    #[tokio::test]
    async fn scenario_zero_candidates_marks_chunk_complete_without_facts() {
        let dir = tempdir().unwrap();
        let pipeline = pipeline_with_responses(dir.path(), vec![Ok(String::new())]);

        let report = pipeline.submit("doc-1", "Nothing factual here.", "file:///x").await.unwrap();
        assert_eq!(report.candidates_extracted, 0);
        assert!(report.errors.is_empty());
        let chunks = pipeline.chunk_store.list_by_document("doc-1").unwrap();
        assert!(chunks[0].all_facts_extracted);
        assert!(!chunks[0].contains_facts);
    }

    #[tokio::test]
    async fn scenario_rate_limit_then_success_retries_and_commits() {
        let dir = tempdir().unwrap();
        let pipeline = pipeline_with_responses(
            dir.path(),
            vec![
                Err(LlmError::RateLimited),
                Err(LlmError::RateLimited),
                Err(LlmError::RateLimited),
                Ok("<fact>Recovered fact.</fact>".to_string()),
                Ok(r#"{"decision":"verified","reason":"ok"}"#.to_string()),
            ],
        );

        let report = pipeline.submit("doc-1", "Some text to extract.", "file:///x").await.unwrap();
        assert_eq!(report.verified, 1);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn scenario_exhausted_retries_marks_chunk_error_without_aborting_document() {
        let dir = tempdir().unwrap();
        let pipeline = pipeline_with_responses(
            dir.path(),
            vec![
                Err(LlmError::Transient("boom".to_string())),
                Err(LlmError::Transient("boom".to_string())),
                Err(LlmError::Transient("boom".to_string())),
                Err(LlmError::Transient("boom".to_string())),
            ],
        );

        let report = pipeline.submit("doc-1", "Some text.", "file:///x").await.unwrap();
        assert_eq!(report.errors.len(), 1);
        let chunks = pipeline.chunk_store.list_by_document("doc-1").unwrap();
        assert_eq!(chunks[0].status, ChunkStatus::Error);
    }

    #[tokio::test]
    async fn scenario_status_flip_moves_fact_between_stores() {
        let dir = tempdir().unwrap();
        let pipeline = pipeline_with_responses(
            dir.path(),
            vec![
                Ok("<fact>ACME shipped 12,345 units in 2023.</fact>".to_string()),
                Ok(r#"{"decision":"verified","reason":"supported"}"#.to_string()),
            ],
        );

        pipeline
            .submit("doc-1", "In 2023, ACME shipped 12,345 units.", "file:///doc-1.txt")
            .await
            .unwrap();
        let fact_id = pipeline.get_facts(None, true)[0].fact_id.clone();

        pipeline
            .update_fact(&fact_id, None, Some(VerificationStatus::Rejected), Some("no longer supported".to_string()))
            .await
            .unwrap();

        assert!(pipeline.fact_store.get_by_id(&fact_id).is_none());
        assert!(pipeline.rejected_store.get_by_id(&fact_id).is_some());
        assert_eq!(pipeline.vector_index.count(), 0);

        let results = pipeline.search("ACME shipped 12,345 units in 2023.", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn purge_document_removes_from_every_store() {
        let dir = tempdir().unwrap();
        let pipeline = pipeline_with_responses(
            dir.path(),
            vec![
                Ok("<fact>A fact to purge.</fact>".to_string()),
                Ok(r#"{"decision":"verified","reason":"ok"}"#.to_string()),
            ],
        );

        pipeline.submit("doc-1", "Text containing a fact.", "file:///x").await.unwrap();
        let removed = pipeline.purge_document("doc-1").unwrap();
        assert!(removed > 0);
        assert!(pipeline.get_facts(None, true).is_empty());
        assert_eq!(pipeline.vector_index.count(), 0);
        assert!(pipeline.chunk_store.list_by_document("doc-1").unwrap().is_empty());
    }
}
