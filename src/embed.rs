//! Embedder collaborator (§6.1): `embed(texts) -> List[Vector]`,
//! deterministic for fixed input within a process.
//!
//! Wrapped behind a trait so the pipeline coordinator and tests never
//! depend on a concrete model; the default implementation wraps
//! `fastembed`, the only embedding crate in the example pack.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

use crate::error::{FactCheckError, Result};

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Local sentence-embedding model via `fastembed`. `TextEmbedding` is not
/// `Sync` across its internal session, so calls are serialized behind a
/// mutex — embedding is CPU-bound and this crate does not batch across
/// concurrent chunks anyway (each chunk's facts are embedded one request
/// at a time after verification).
pub struct FastEmbedEmbedder {
    model: Mutex<TextEmbedding>,
}

impl FastEmbedEmbedder {
    pub fn new(model_name: &str) -> Result<Self> {
        let model = resolve_model(model_name);
        let embedding = TextEmbedding::try_new(InitOptions::new(model))
            .map_err(|e| FactCheckError::StoreUnavailable(format!("failed to load embedding model: {e}")))?;
        Ok(Self {
            model: Mutex::new(embedding),
        })
    }
}

fn resolve_model(name: &str) -> EmbeddingModel {
    match name {
        "BAAI/bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "BAAI/bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        _ => EmbeddingModel::BGESmallENV15,
    }
}

#[async_trait]
impl Embedder for FastEmbedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let texts = texts.to_vec();
        let guard = self.model.lock().unwrap();
        guard
            .embed(texts, None)
            .map_err(|e| FactCheckError::StoreUnavailable(format!("embedding call failed: {e}")))
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// Deterministic stand-in embedder for tests: hashes each word into a
    /// fixed-size bag-of-words vector so cosine similarity behaves
    /// sensibly without downloading a model.
    pub struct FakeEmbedder {
        pub dims: usize,
    }

    impl FakeEmbedder {
        pub fn new() -> Self {
            Self { dims: 32 }
        }
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| bag_of_words_vector(t, self.dims)).collect())
        }
    }

    fn bag_of_words_vector(text: &str, dims: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; dims];
        for word in text.split_whitespace() {
            let hash = word.chars().fold(0u64, |acc, c| acc.wrapping_mul(31).wrapping_add(c as u64));
            v[(hash as usize) % dims] += 1.0;
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeEmbedder;
    use super::*;

    #[tokio::test]
    async fn fake_embedder_is_deterministic() {
        let embedder = FakeEmbedder::new();
        let a = embedder.embed(&["hello world".to_string()]).await.unwrap();
        let b = embedder.embed(&["hello world".to_string()]).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn fake_embedder_distinguishes_different_text() {
        let embedder = FakeEmbedder::new();
        let a = embedder.embed(&["alpha".to_string()]).await.unwrap();
        let b = embedder.embed(&["beta gamma".to_string()]).await.unwrap();
        assert_ne!(a, b);
    }
}
