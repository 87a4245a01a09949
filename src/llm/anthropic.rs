//! Concrete `LlmProviderTrait` implementation talking to an
//! Anthropic-compatible completion endpoint. Ported near-verbatim from
//! the teacher's `AnthropicProvider` (same request/response shapes,
//! same `x-api-key`/`anthropic-version` headers); the teacher's
//! `anyhow::bail!`-on-any-failure is replaced with classification into
//! the typed `LlmError` kinds §6.1/§7 require.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::LlmProviderTrait;
use crate::error::{FactCheckError, LlmError, Result};

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: &str, base_url: Option<&str>) -> Result<Self> {
        if api_key.is_empty() {
            return Err(FactCheckError::StoreUnavailable(
                "LLM API key is required".to_string(),
            ));
        }

        Ok(Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url
                .unwrap_or("https://api.anthropic.com")
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[async_trait]
impl LlmProviderTrait for AnthropicProvider {
    async fn complete(&self, system: &str, user_message: &str, timeout_s: f64) -> std::result::Result<String, LlmError> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            system: system.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: user_message.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .timeout(Duration::from_secs_f64(timeout_s))
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_status_error(status.as_u16(), &error_text));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Permanent(format!("failed to parse response: {e}")))?;

        parsed
            .content
            .first()
            .and_then(|c| c.text.clone())
            .ok_or_else(|| LlmError::Permanent("no text content in response".to_string()))
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

fn classify_transport_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else if err.is_connect() {
        LlmError::Transient(err.to_string())
    } else {
        LlmError::Transient(err.to_string())
    }
}

fn classify_status_error(status: u16, body: &str) -> LlmError {
    match status {
        429 => LlmError::RateLimited,
        500..=599 => LlmError::Transient(format!("server error {status}: {body}")),
        408 => LlmError::Timeout,
        _ => LlmError::Permanent(format!("API error {status}: {body}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_status_429_is_rate_limited() {
        assert!(matches!(classify_status_error(429, ""), LlmError::RateLimited));
    }

    #[test]
    fn classify_status_5xx_is_transient() {
        assert!(matches!(classify_status_error(503, "down"), LlmError::Transient(_)));
    }

    #[test]
    fn classify_status_4xx_other_is_permanent() {
        assert!(matches!(classify_status_error(401, "bad key"), LlmError::Permanent(_)));
    }

    #[test]
    fn new_rejects_empty_api_key() {
        assert!(AnthropicProvider::new("", "model", None).is_err());
    }
}
