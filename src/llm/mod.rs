mod anthropic;
pub(crate) mod parsing;
mod prompts;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{FactCheckError, LlmError, Result};
use crate::model::{Fact, VerificationStatus};

/// Trait for LLM providers: a single `complete` capability with
/// distinguishable error kinds (§6.1). C6/C7 are built on top of this,
/// not on the provider directly, so a fake provider can stand in for
/// tests without a network call.
#[async_trait]
pub trait LlmProviderTrait: Send + Sync {
    async fn complete(&self, system: &str, user_message: &str, timeout_s: f64) -> std::result::Result<String, LlmError>;

    fn name(&self) -> &'static str;
}

/// Main LLM client, abstracting over the concrete provider.
pub struct LlmClient {
    provider: Box<dyn LlmProviderTrait>,
    timeout_s: f64,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self> {
        if config.llm.api_key.is_empty() {
            return Err(FactCheckError::StoreUnavailable(
                "LLM API key is not configured".to_string(),
            ));
        }
        let model = config
            .llm
            .model
            .clone()
            .unwrap_or_else(|| "claude-sonnet-4-20250514".to_string());
        let provider = anthropic::AnthropicProvider::new(
            &config.llm.api_key,
            &model,
            config.llm.base_url.as_deref(),
        )?;
        Ok(Self::with_provider(Box::new(provider), config.llm_timeout_s))
    }

    pub fn with_provider(provider: Box<dyn LlmProviderTrait>, timeout_s: f64) -> Self {
        Self { provider, timeout_s }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// C6 — extract zero-or-more candidate statements from a chunk.
    pub async fn extract_candidates(&self, chunk_content: &str) -> std::result::Result<Vec<String>, LlmError> {
        let response = self
            .provider
            .complete(
                prompts::EXTRACTION_SYSTEM_PROMPT,
                &prompts::extraction_user_prompt(chunk_content),
                self.timeout_s,
            )
            .await?;
        Ok(parsing::extract_tagged(&response, "fact"))
    }

    /// C7 — verify a single candidate statement against its source chunk.
    pub async fn verify_candidate(
        &self,
        statement: &str,
        original_text: &str,
    ) -> std::result::Result<(VerificationStatus, String), LlmError> {
        let response = self
            .provider
            .complete(
                prompts::VERIFICATION_SYSTEM_PROMPT,
                &prompts::verification_user_prompt(statement, original_text),
                self.timeout_s,
            )
            .await?;

        let (decision, reason) = parsing::parse_verification_json(&response)
            .map_err(|e| LlmError::Permanent(e.to_string()))?;

        let status = match decision.as_str() {
            "verified" => VerificationStatus::Verified,
            "rejected" => VerificationStatus::Rejected,
            other => {
                return Err(LlmError::Permanent(format!("unrecognized decision '{other}'")));
            }
        };
        Ok((status, reason))
    }
}

/// Convenience constructor shared by C8 when building a `Fact` from a
/// verified decision (kept here since it sits right at the LLM/model
/// boundary; the pipeline module assigns `fact_id`/hashes).
pub fn new_fact_skeleton(
    statement: String,
    document_name: String,
    source_chunk_index: usize,
    original_text: String,
    status: VerificationStatus,
    reason: String,
) -> Fact {
    use crate::model::fact_hash;
    use chrono::Utc;
    let now = Utc::now();
    Fact {
        fact_id: uuid::Uuid::new_v4().to_string(),
        fact_hash: fact_hash(&statement),
        statement,
        document_name,
        source_chunk_index,
        original_text,
        verification_status: status,
        verification_reason: reason,
        extracted_at: now,
        verified_at: now,
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted fake provider for pipeline/coordinator tests: returns
    /// pre-programmed responses in order, optionally failing the first
    /// N calls with a given retriable error (used to model rate-limit
    /// recovery scenarios).
    pub struct FakeProvider {
        responses: Vec<std::result::Result<String, LlmError>>,
        call_count: AtomicUsize,
    }

    impl FakeProvider {
        pub fn new(responses: Vec<std::result::Result<String, LlmError>>) -> Self {
            Self {
                responses,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProviderTrait for FakeProvider {
        async fn complete(&self, _system: &str, _user_message: &str, _timeout_s: f64) -> std::result::Result<String, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(idx)
                .cloned()
                .unwrap_or_else(|| Err(LlmError::Permanent("fake provider exhausted".to_string())))
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }
}
