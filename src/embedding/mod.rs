//! Embedding generation: a model registry plus a generator that degrades
//! through every failure branch down to the hash-based fallback, ported
//! 1:1 from the original `EmbeddingGenerator` in `indexing/embeddings.py`.

pub mod provider;

use crate::embedding::provider::{hash_embedding, EmbeddingModelConfig, EmbeddingModelType, ModelInfo};
use crate::error::Result;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info, warn};

/// Static table of known embedding models, analogous to the per-provider
/// `ProviderConfig` table.
pub static MODEL_REGISTRY: Lazy<HashMap<&'static str, EmbeddingModelConfig>> = Lazy::new(|| {
    let mut registry = HashMap::new();
    registry.insert(
        "minilm",
        EmbeddingModelConfig {
            name: "MiniLM".to_string(),
            model_type: EmbeddingModelType::SentenceTransformers,
            dimension: 384,
            requires_api_key: false,
            model_path: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
        },
    );
    registry.insert(
        "bge-large",
        EmbeddingModelConfig {
            name: "BGE Large".to_string(),
            model_type: EmbeddingModelType::SentenceTransformers,
            dimension: 1024,
            requires_api_key: false,
            model_path: "BAAI/bge-large-en-v1.5".to_string(),
        },
    );
    registry.insert(
        "e5-base",
        EmbeddingModelConfig {
            name: "E5 Base".to_string(),
            model_type: EmbeddingModelType::SentenceTransformers,
            dimension: 768,
            requires_api_key: false,
            model_path: "intfloat/e5-base-v2".to_string(),
        },
    );
    registry.insert(
        "openai-text-embedding-3-small",
        EmbeddingModelConfig {
            name: "OpenAI text-embedding-3-small".to_string(),
            model_type: EmbeddingModelType::OpenAi,
            dimension: 1536,
            requires_api_key: true,
            model_path: "text-embedding-3-small".to_string(),
        },
    );
    registry
});

pub fn model_config(model_name: &str) -> Option<&'static EmbeddingModelConfig> {
    MODEL_REGISTRY.get(model_name)
}

/// Batch size the indexing stage should use for a given embedding
/// dimension, matching `indexing.py`'s adaptive thresholds.
pub fn adaptive_batch_size(dimension: u32) -> usize {
    if dimension >= 1024 {
        3
    } else if dimension >= 768 {
        15
    } else {
        100
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingDatum>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiEmbeddingDatum {
    embedding: Vec<f32>,
}

/// Generates embeddings for a named model, degrading through every failure
/// branch to a deterministic hash fallback: unknown model, missing API key,
/// or a provider request failure all land here.
pub struct EmbeddingGenerator {
    model_name: String,
    dimension: u32,
    openai_api_key: Option<String>,
    http: Client,
    config: Option<EmbeddingModelConfig>,
}

impl EmbeddingGenerator {
    /// Mirrors `EmbeddingGenerator.__init__`: resolves the model config,
    /// falling back to a 384-dim unknown-model default when the name isn't
    /// registered.
    pub fn new(model_name: impl Into<String>, dimension: Option<u32>, openai_api_key: Option<String>) -> Self {
        let model_name = model_name.into();
        let config = model_config(&model_name).cloned();
        let dimension = dimension.or_else(|| config.as_ref().map(|c| c.dimension)).unwrap_or_else(|| {
            warn!(model = %model_name, "unknown embedding model, using fallback dimension 384");
            384
        });

        Self {
            model_name,
            dimension,
            openai_api_key,
            http: Client::new(),
            config,
        }
    }

    pub fn get_dimension(&self) -> u32 {
        self.dimension
    }

    /// Reports whether this generator is actually backed by a model or has
    /// degraded to the hash fallback.
    pub fn get_model_info(&self) -> ModelInfo {
        let fallback_mode = match &self.config {
            Some(cfg) if cfg.model_type == EmbeddingModelType::OpenAi => self.openai_api_key.is_none(),
            // Sentence-transformer/HuggingFace local models are never
            // actually loadable in this runtime; always hash-fallback.
            Some(_) => true,
            None => true,
        };
        ModelInfo {
            model_name: self.model_name.clone(),
            dimension: self.dimension,
            model_type: self.config.as_ref().map(|c| match c.model_type {
                EmbeddingModelType::OpenAi => "openai",
                EmbeddingModelType::SentenceTransformers => "sentence_transformers",
                EmbeddingModelType::HuggingFace => "huggingface",
                EmbeddingModelType::Custom => "custom",
            }),
            fallback_mode,
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cfg) = &self.config {
            if cfg.model_type == EmbeddingModelType::OpenAi {
                if let Some(api_key) = &self.openai_api_key {
                    match self.embed_openai(std::slice::from_ref(&text.to_string()), api_key, &cfg.model_path).await {
                        Ok(mut vectors) if !vectors.is_empty() => return Ok(vectors.remove(0)),
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "openai embedding request failed, falling back to hash embedding"),
                    }
                } else {
                    warn!(model = %self.model_name, "OpenAI API key not configured, falling back to hash embedding");
                }
            }
        }
        Ok(hash_embedding(text, self.dimension as usize))
    }

    /// Embeds `texts` in batches sized via [`adaptive_batch_size`]. On a
    /// batch failure, falls back to per-text embedding for that batch; an
    /// individual failure records `None` so indexing can skip that chunk.
    pub async fn embed_batch(&self, texts: &[String], batch_size: Option<usize>) -> Vec<Option<Vec<f32>>> {
        let batch_size = batch_size.unwrap_or_else(|| adaptive_batch_size(self.dimension)).max(1);
        let mut out = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size) {
            let batch_result = self.embed_openai_batch_if_applicable(batch).await;
            match batch_result {
                Some(Ok(vectors)) => out.extend(vectors.into_iter().map(Some)),
                Some(Err(e)) => {
                    error!(error = %e, "batch embedding failed, falling back to per-text embedding");
                    for text in batch {
                        out.push(self.embed(text).await.ok());
                    }
                }
                None => {
                    for text in batch {
                        out.push(self.embed(text).await.ok());
                    }
                }
            }
        }
        out
    }

    async fn embed_openai_batch_if_applicable(&self, batch: &[String]) -> Option<Result<Vec<Vec<f32>>>> {
        let cfg = self.config.as_ref()?;
        if cfg.model_type != EmbeddingModelType::OpenAi {
            return None;
        }
        let api_key = self.openai_api_key.as_ref()?;
        Some(self.embed_openai(batch, api_key, &cfg.model_path).await)
    }

    async fn embed_openai(&self, texts: &[String], api_key: &str, model: &str) -> Result<Vec<Vec<f32>>> {
        let request = OpenAiEmbeddingRequest { model, input: texts };
        let response = self
            .http
            .post("https://api.openai.com/v1/embeddings")
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OpenAiEmbeddingResponse>()
            .await?;
        info!(count = response.data.len(), "received openai embeddings");
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adaptive_batch_size_thresholds() {
        assert_eq!(adaptive_batch_size(1536), 3);
        assert_eq!(adaptive_batch_size(768), 15);
        assert_eq!(adaptive_batch_size(384), 100);
    }

    #[tokio::test]
    async fn test_unknown_model_falls_back_to_hash_embedding() {
        let generator = EmbeddingGenerator::new("totally-unknown", None, None);
        assert_eq!(generator.get_dimension(), 384);
        assert!(generator.get_model_info().fallback_mode);
        let embedding = generator.embed("hello").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }

    #[tokio::test]
    async fn test_openai_model_without_api_key_falls_back() {
        let generator = EmbeddingGenerator::new("openai-text-embedding-3-small", None, None);
        assert!(generator.get_model_info().fallback_mode);
        let embedding = generator.embed("hello").await.unwrap();
        assert_eq!(embedding.len(), 1536);
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_order_and_count() {
        let generator = EmbeddingGenerator::new("minilm", None, None);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let results = generator.embed_batch(&texts, Some(2)).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(Option::is_some));
    }
}
