//! Crate-wide typed error taxonomy.
//!
//! Mirrors the error classes in the fact-extraction design: input
//! errors are fatal to the call, transient LLM errors are retried by
//! the pipeline coordinator, per-chunk errors are contained, and store
//! errors roll back the in-flight multi-store transaction.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FactCheckError {
    #[error("empty input")]
    EmptyInput,

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("extraction parse error: {0}")]
    ExtractionParseError(String),

    #[error("verification parse error: {0}")]
    VerificationParseError(String),

    #[error("consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("fact not found: {0}")]
    FactNotFound(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Error kinds an `LLMClient` call can fail with. The pipeline
/// coordinator retries `RateLimited`, `Timeout`, and `Transient` with
/// exponential backoff; `Permanent` is recorded and not retried.
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("rate limited")]
    RateLimited,

    #[error("request timed out")]
    Timeout,

    #[error("transient error: {0}")]
    Transient(String),

    #[error("permanent error: {0}")]
    Permanent(String),
}

impl LlmError {
    /// Whether the coordinator should retry this error under the
    /// backoff schedule.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited | LlmError::Timeout | LlmError::Transient(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FactCheckError>;
