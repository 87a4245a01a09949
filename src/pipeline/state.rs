//! Per-document and per-chunk state machines driven by the coordinator (C8).
//!
//! These are process-local bookkeeping only — the durably persisted
//! state is `ChunkStatus` on the `Chunk` row itself (§3); these enums
//! give the coordinator's control flow explicit names instead of
//! leaving the states implicit in nested match arms.

/// State machine per document: `INIT -> CHUNKING -> EXTRACTING ->
/// VERIFYING -> DONE`, with a terminal `ERROR` carrying accumulated
/// per-chunk errors. `EXTRACTING` and `VERIFYING` overlap in time
/// across different chunks, so this tracks the document's outermost
/// phase, not a strict per-chunk barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Init,
    Chunking,
    Extracting,
    Verifying,
    Done,
    Error,
}

/// State machine per chunk: `PENDING -> EXTRACTING -> (NO_CANDIDATES |
/// HAS_CANDIDATES) -> VERIFYING -> DONE | ERROR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    Extracting,
    NoCandidates,
    HasCandidates,
    Verifying,
    Done,
    Error,
}

impl ChunkState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChunkState::Done | ChunkState::Error)
    }
}
