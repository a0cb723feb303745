//! Indexing stage: embeds processed chunks, upserts them into the vector
//! store, and scores the embedding run itself.
//!
//! Grounded in `examples/original_source/.../indexing/indexing.py`: the
//! point-id formula, the adaptive-batch embedding loop, the
//! Vector-Quality-Score / Embedding-Model-Health / Semantic-Search-Readiness
//! formulas, and the self-retrieval RAG evaluation are all ported from that
//! module's arithmetic.

use crate::embedding::EmbeddingGenerator;
use crate::embedding::provider::ModelInfo;
use crate::error::Result;
use crate::models::{MetricRecord, ProcessedRecord, VectorPayload, VectorPoint};
use crate::playbook::RetrievalSettings;
use crate::vector_store::{Distance, VectorStoreClient};
use chrono::Utc;
use md5::{Digest, Md5};
use std::collections::HashMap;

/// Builds the deterministic point id `int(md5(f"{product}_{chunk}_{version}").hexdigest()[:15], 16)`.
pub fn point_id(product_id: &str, chunk_id: &str, version: u32) -> u64 {
    let input = format!("{product_id}_{chunk_id}_{version}");
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let hex = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
    u64::from_str_radix(&hex[..15], 16).unwrap_or(0)
}

/// Four-level per-chunk score lookup, mirroring `load_metrics_index` /
/// `lookup_score`: exact (file, chunk_id), then chunk-id alone across
/// files, then (file, section) or file-max, defaulting to 0.0.
#[derive(Debug, Clone, Default)]
pub struct MetricsIndex {
    by_chunk: HashMap<(String, String), f64>,
    by_chunk_any: HashMap<String, f64>,
    by_section: HashMap<(String, String), f64>,
    by_file: HashMap<String, f64>,
}

pub fn load_metrics_index(metrics: &[MetricRecord]) -> MetricsIndex {
    let mut index = MetricsIndex::default();
    for m in metrics {
        index.by_chunk.insert((m.file.clone(), m.chunk_id.clone()), m.ai_trust_score);
        index
            .by_chunk_any
            .entry(m.chunk_id.clone())
            .and_modify(|s| *s = s.max(m.ai_trust_score))
            .or_insert(m.ai_trust_score);
        index
            .by_section
            .entry((m.file.clone(), m.section.clone()))
            .and_modify(|s| *s = s.max(m.ai_trust_score))
            .or_insert(m.ai_trust_score);
        index
            .by_file
            .entry(m.file.clone())
            .and_modify(|s| *s = s.max(m.ai_trust_score))
            .or_insert(m.ai_trust_score);
    }
    index
}

impl MetricsIndex {
    pub fn lookup_score(&self, file: &str, chunk_id: &str, section: &str) -> f64 {
        if let Some(score) = self.by_chunk.get(&(file.to_string(), chunk_id.to_string())) {
            return *score;
        }
        if let Some(score) = self.by_chunk_any.get(chunk_id) {
            return *score;
        }
        if let Some(score) = self.by_section.get(&(file.to_string(), section.to_string())) {
            return *score;
        }
        if let Some(score) = self.by_file.get(file) {
            return *score;
        }
        0.0
    }
}

/// Counters accumulated while embedding a batch of records, feeding the
/// embedding-quality formulas below.
#[derive(Debug, Clone, Default)]
pub struct IndexingStats {
    pub attempted: usize,
    pub produced: usize,
    pub dim_mismatches: usize,
    pub norms: Vec<f64>,
}

fn vector_norm(vector: &[f32]) -> f64 {
    vector.iter().map(|v| (*v as f64).powi(2)).sum::<f64>().sqrt()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64], mean_value: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// 1.0 when fewer than two norms or zero spread; otherwise `1 -
/// outlier_rate`, where an outlier is more than three standard deviations
/// from the median.
fn norm_health(norms: &[f64]) -> f64 {
    if norms.len() < 2 {
        return 1.0;
    }
    let mean_norm = mean(norms);
    let std_norm = std_dev(norms, mean_norm);
    if std_norm <= 0.0 {
        return 1.0;
    }
    let med = median(norms);
    let outliers = norms.iter().filter(|n| (*n - med).abs() > 3.0 * std_norm).count();
    1.0 - (outliers as f64 / norms.len() as f64)
}

/// `max(0, 1 - min(1, cv / 0.75))` where `cv` is the coefficient of
/// variation of the embedding norms.
fn response_consistency(norms: &[f64]) -> f64 {
    if norms.is_empty() {
        return 1.0;
    }
    let mean_norm = mean(norms);
    if mean_norm <= 0.0 {
        return 1.0;
    }
    let std_norm = std_dev(norms, mean_norm);
    let cv = std_norm / mean_norm;
    (1.0 - (cv / 0.75).min(1.0)).max(0.0)
}

/// `(valid_ratio*0.40 + non_zero_ratio*0.30 + norm_health*0.30) * 100`,
/// clamped to `[0, 100]`.
pub fn vector_quality_score(stats: &IndexingStats) -> f64 {
    if stats.attempted == 0 {
        return 0.0;
    }
    let valid_ratio = stats.produced as f64 / stats.attempted as f64;
    let non_zero = stats.norms.iter().filter(|n| **n > 0.0).count();
    let non_zero_ratio = if stats.produced == 0 { 0.0 } else { non_zero as f64 / stats.produced as f64 };
    let health = norm_health(&stats.norms);
    ((valid_ratio * 0.40 + non_zero_ratio * 0.30 + health * 0.30) * 100.0).clamp(0.0, 100.0)
}

/// `0` under fallback mode, else the weighted blend of API error rate,
/// fallback rate, dimension-mismatch rate, norm health, and response
/// consistency.
pub fn embedding_model_health(model_info: &ModelInfo, stats: &IndexingStats, api_errors: usize, fallback_count: usize) -> f64 {
    if model_info.fallback_mode {
        return 0.0;
    }
    if stats.attempted == 0 {
        return 0.0;
    }
    let api_error_rate = api_errors as f64 / stats.attempted as f64;
    let fallback_rate = fallback_count as f64 / stats.attempted as f64;
    let dim_mismatch_rate = stats.dim_mismatches as f64 / stats.attempted as f64;
    let health = norm_health(&stats.norms);
    let consistency = response_consistency(&stats.norms);
    ((0.30 * (1.0 - api_error_rate)
        + 0.25 * (1.0 - fallback_rate)
        + 0.20 * (1.0 - dim_mismatch_rate)
        + 0.15 * health
        + 0.10 * consistency)
        * 100.0)
        .clamp(0.0, 100.0)
}

pub fn dimension_consistency(stats: &IndexingStats) -> f64 {
    if stats.attempted == 0 {
        return 100.0;
    }
    (100.0 - (stats.dim_mismatches as f64 / stats.attempted as f64) * 100.0).max(0.0)
}

pub fn success_rate(stats: &IndexingStats) -> f64 {
    if stats.attempted == 0 {
        return 0.0;
    }
    (stats.produced as f64 / stats.attempted as f64) * 100.0
}

/// `clamp(0.25*dim_consistency + 0.35*VQS + 0.25*model_health + 0.15*success_rate, 0, 100)`.
pub fn semantic_search_readiness(dim_consistency: f64, vqs: f64, model_health: f64, success_rate: f64) -> f64 {
    (0.25 * dim_consistency + 0.35 * vqs + 0.25 * model_health + 0.15 * success_rate).clamp(0.0, 100.0)
}

/// Outcome of [`index_records`]: the points actually upserted, plus the
/// embedding-quality metrics used to populate the fingerprint.
#[derive(Debug, Clone)]
pub struct IndexingOutcome {
    pub points: Vec<VectorPoint>,
    pub stats: IndexingStats,
    pub vector_quality_score: f64,
    pub embedding_model_health: f64,
    pub dimension_consistency: f64,
    pub success_rate: f64,
    pub semantic_search_readiness: f64,
}

fn build_payload(record: &ProcessedRecord, score: f64, product_id: &str, version: u32, collection_id: &str) -> VectorPayload {
    VectorPayload {
        chunk_id: record.chunk_id.clone(),
        filename: format!("{}.jsonl", record.document_id),
        source_file: record.document_id.clone(),
        document_id: record.document_id.clone(),
        page: record.page,
        page_number: record.page,
        section: record.section.clone(),
        field_name: record.field_name.clone(),
        score,
        text: record.text.clone(),
        text_length: record.text.chars().count(),
        product_id: product_id.to_string(),
        version,
        collection_id: collection_id.to_string(),
        created_at: Utc::now(),
        doc_scope: None,
        field_scope: None,
        tags: record.tags.clone(),
        token_est: record.token_est,
    }
}

/// Embeds `records` in adaptive batches, builds vector-store points scored
/// via `metrics_index`, and upserts them into `collection_name`.
pub async fn index_records(
    records: &[ProcessedRecord],
    metrics_index: &MetricsIndex,
    generator: &EmbeddingGenerator,
    vector_client: &dyn VectorStoreClient,
    collection_name: &str,
    product_id: &str,
    version: u32,
) -> Result<IndexingOutcome> {
    let dimension = generator.get_dimension();
    vector_client.ensure_collection(collection_name, dimension, Distance::Cosine).await?;

    let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    let embeddings = generator.embed_batch(&texts, None).await;

    let mut stats = IndexingStats {
        attempted: records.len(),
        ..Default::default()
    };
    let mut points = Vec::with_capacity(records.len());

    for (record, embedding) in records.iter().zip(embeddings.into_iter()) {
        let Some(vector) = embedding else { continue };
        if vector.len() as u32 != dimension {
            stats.dim_mismatches += 1;
            continue;
        }
        stats.produced += 1;
        stats.norms.push(vector_norm(&vector));

        let file_tag = format!("{}.jsonl", record.document_id);
        let score = metrics_index.lookup_score(&file_tag, &record.chunk_id, &record.section);
        let payload = build_payload(record, score, product_id, version, collection_name);
        points.push(VectorPoint {
            id: point_id(product_id, &record.chunk_id, version),
            vector,
            payload,
        });
    }

    if !points.is_empty() {
        vector_client.upsert_points(collection_name, &points).await?;
    }

    let model_info = generator.get_model_info();
    let vqs = vector_quality_score(&stats);
    let dim_consistency = dimension_consistency(&stats);
    let rate = success_rate(&stats);
    let model_health = embedding_model_health(&model_info, &stats, 0, if model_info.fallback_mode { stats.produced } else { 0 });
    let readiness = semantic_search_readiness(dim_consistency, vqs, model_health, rate);

    Ok(IndexingOutcome {
        points,
        stats,
        vector_quality_score: vqs,
        embedding_model_health: model_health,
        dimension_consistency: dim_consistency,
        success_rate: rate,
        semantic_search_readiness: readiness,
    })
}

/// Trims `text` to its first sentence (first of `. `, `? `, `! ` within the
/// first 300 characters), falling back to the first 250 characters.
pub fn first_sentence(text: &str) -> String {
    let window_end = text.char_indices().nth(300).map(|(i, _)| i).unwrap_or(text.len());
    let window = &text[..window_end];

    let mut best: Option<usize> = None;
    for pattern in [". ", "? ", "! "] {
        if let Some(pos) = window.find(pattern) {
            best = Some(best.map_or(pos, |b| b.min(pos)));
        }
    }
    if let Some(pos) = best {
        return text[..=pos].trim().to_string();
    }

    let fallback_end = text.char_indices().nth(250).map(|(i, _)| i).unwrap_or(text.len());
    text[..fallback_end].trim().to_string()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RagMetrics {
    pub recall_at_k: f64,
    pub average_precision_at_k: f64,
}

/// Self-retrieval evaluation: embeds each candidate's first sentence as a
/// query, searches the collection, and checks whether the originating chunk
/// comes back in the top-k results.
pub async fn evaluate_rag_self_retrieval(
    records: &[ProcessedRecord],
    generator: &EmbeddingGenerator,
    vector_client: &dyn VectorStoreClient,
    collection_name: &str,
    settings: RetrievalSettings,
) -> Result<RagMetrics> {
    let candidates: Vec<(&ProcessedRecord, String)> = records
        .iter()
        .take(settings.max_queries as usize)
        .filter_map(|record| {
            let query = first_sentence(&record.text);
            (query.chars().count() > 10).then_some((record, query))
        })
        .collect();
    if candidates.is_empty() {
        return Ok(RagMetrics::default());
    }

    let mut hits = 0usize;
    let mut reciprocal_rank_sum = 0.0;
    let top_k = settings.top_k as usize;

    for (record, query) in &candidates {
        let query_vector = generator.embed(query).await?;
        let results = vector_client
            .search_points(collection_name, &query_vector, top_k, None, None)
            .await?;

        if let Some(rank) = results.iter().position(|r| r.payload.chunk_id == record.chunk_id) {
            hits += 1;
            reciprocal_rank_sum += 1.0 / (rank as f64 + 1.0);
        }
    }

    let query_count = candidates.len() as f64;
    Ok(RagMetrics {
        recall_at_k: (hits as f64 / query_count) * 100.0,
        average_precision_at_k: (reciprocal_rank_sum / query_count) * 100.0,
    })
}
