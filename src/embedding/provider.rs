//! Embedding provider trait and the hash-based fallback shared by all
//! providers, structurally grounded in `src/llm/provider.rs`'s
//! `ProviderConfig`/`LlmProvider` pattern (serde defaults via helper
//! functions, `#[async_trait]` trait surface).

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingModelType {
    SentenceTransformers,
    OpenAi,
    HuggingFace,
    Custom,
}

/// Static description of one embedding model, analogous to `ProviderConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingModelConfig {
    pub name: String,
    pub model_type: EmbeddingModelType,
    pub dimension: u32,
    pub requires_api_key: bool,
    pub model_path: String,
}

/// Information about the provider actually in use, mirroring
/// `EmbeddingGenerator.get_model_info()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub dimension: u32,
    pub model_type: Option<&'static str>,
    pub fallback_mode: bool,
}

/// Trait all embedding providers implement.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await.ok());
        }
        Ok(out)
    }

    fn dimension(&self) -> u32;

    fn model_info(&self) -> ModelInfo;
}

/// Deterministic hash-based fallback used whenever a real model cannot be
/// loaded (missing API key, unsupported model type, unavailable local
/// model). Ported verbatim from `EmbeddingGenerator._hash_embedding`: a
/// SHA-256 digest of the text fills the vector byte-indexed and normalized
/// to `[-1, 1]`, with the first element overwritten by a length signal.
pub struct HashEmbeddingProvider {
    pub dimension: u32,
    pub model_name: String,
}

impl HashEmbeddingProvider {
    pub fn new(model_name: impl Into<String>, dimension: u32) -> Self {
        Self {
            dimension,
            model_name: model_name.into(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embedding(text, self.dimension as usize))
    }

    fn dimension(&self) -> u32 {
        self.dimension
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model_name: self.model_name.clone(),
            dimension: self.dimension,
            model_type: None,
            fallback_mode: true,
        }
    }
}

pub fn hash_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let digest = Sha256::digest(text.as_bytes());
    let mut embedding = vec![0.0f32; dimension];
    for (i, slot) in embedding.iter_mut().enumerate() {
        let byte = digest[i % digest.len()];
        *slot = (byte as f32 - 128.0) / 128.0;
    }
    if !embedding.is_empty() {
        embedding[0] = (text.len() as f32 / 1000.0).min(1.0);
    }
    embedding
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_embedding_is_deterministic() {
        let provider = HashEmbeddingProvider::new("minilm", 384);
        let a = provider.embed("hello world").await.unwrap();
        let b = provider.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_hash_embedding_has_expected_dimension() {
        let provider = HashEmbeddingProvider::new("minilm", 384);
        let vec = provider.embed("hello").await.unwrap();
        assert_eq!(vec.len(), 384);
    }

    #[tokio::test]
    async fn test_hash_embedding_differs_for_different_text() {
        let provider = HashEmbeddingProvider::new("minilm", 384);
        let a = provider.embed("hello").await.unwrap();
        let b = provider.embed("goodbye").await.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_model_info_reports_fallback_mode() {
        let provider = HashEmbeddingProvider::new("minilm", 384);
        assert!(provider.model_info().fallback_mode);
    }
}
