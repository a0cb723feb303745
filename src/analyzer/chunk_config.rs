//! Chunking strategy selection and retrieval-quality preview, derived from
//! content-type detection and document-level text statistics.

use super::content_type::{detect_content_type, ContentType, DetectionEvidence};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    FixedSize,
    Semantic,
    Recursive,
    SentenceBoundary,
    ParagraphBoundary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub strategy: ChunkingStrategy,
    pub content_type: ContentType,
    pub confidence: f64,
    pub reasoning: String,
    pub evidence: Option<DetectionEvidence>,
}

struct OptimalConfig {
    chunk_size: usize,
    chunk_overlap: usize,
    min_chunk_size: usize,
    max_chunk_size: usize,
    strategy: ChunkingStrategy,
    reasoning: &'static str,
}

fn optimal_config(content_type: ContentType) -> OptimalConfig {
    match content_type {
        ContentType::Legal => OptimalConfig {
            chunk_size: 1200,
            chunk_overlap: 240,
            min_chunk_size: 200,
            max_chunk_size: 2000,
            strategy: ChunkingStrategy::Semantic,
            reasoning: "legal text requires larger chunks to preserve clause context and cross-references",
        },
        ContentType::Regulatory => OptimalConfig {
            chunk_size: 1400,
            chunk_overlap: 280,
            min_chunk_size: 200,
            max_chunk_size: 2200,
            strategy: ChunkingStrategy::Semantic,
            reasoning: "regulatory text has long structured sections that need generous overlap for retrieval",
        },
        ContentType::FinanceBanking => OptimalConfig {
            chunk_size: 1300,
            chunk_overlap: 260,
            min_chunk_size: 200,
            max_chunk_size: 2000,
            strategy: ChunkingStrategy::Semantic,
            reasoning: "financial disclosures mix narrative and tabular data requiring wider context windows",
        },
        ContentType::Code => OptimalConfig {
            chunk_size: 900,
            chunk_overlap: 180,
            min_chunk_size: 100,
            max_chunk_size: 1500,
            strategy: ChunkingStrategy::Recursive,
            reasoning: "code benefits from smaller chunks split along syntactic boundaries",
        },
        ContentType::Documentation => OptimalConfig {
            chunk_size: 800,
            chunk_overlap: 160,
            min_chunk_size: 100,
            max_chunk_size: 1500,
            strategy: ChunkingStrategy::ParagraphBoundary,
            reasoning: "documentation reads naturally paragraph by paragraph",
        },
        ContentType::Conversation => OptimalConfig {
            chunk_size: 700,
            chunk_overlap: 140,
            min_chunk_size: 50,
            max_chunk_size: 1200,
            strategy: ChunkingStrategy::SentenceBoundary,
            reasoning: "conversational turns are short and best split at sentence boundaries",
        },
        ContentType::Academic => OptimalConfig {
            chunk_size: 1200,
            chunk_overlap: 240,
            min_chunk_size: 150,
            max_chunk_size: 2000,
            strategy: ChunkingStrategy::Semantic,
            reasoning: "academic prose needs large chunks to keep argument and citation context intact",
        },
        ContentType::Technical => OptimalConfig {
            chunk_size: 800,
            chunk_overlap: 160,
            min_chunk_size: 100,
            max_chunk_size: 1500,
            strategy: ChunkingStrategy::Semantic,
            reasoning: "technical specifications are dense and benefit from moderate, semantically bounded chunks",
        },
        ContentType::General => OptimalConfig {
            chunk_size: 1000,
            chunk_overlap: 200,
            min_chunk_size: 100,
            max_chunk_size: 2000,
            strategy: ChunkingStrategy::FixedSize,
            reasoning: "no strong content signal; fall back to a balanced fixed-size split",
        },
    }
}

fn avg_sentence_length(content: &str) -> f64 {
    let sentences: Vec<&str> = content
        .split(|c| c == '.' || c == '!' || c == '?')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() {
        return 0.0;
    }
    let total_words: usize = sentences.iter().map(|s| s.split_whitespace().count()).sum();
    total_words as f64 / sentences.len() as f64
}

/// Applies document-level statistics (sentence length, total word count) to
/// adjust a base chunking config, then clamps to `[min_chunk_size, max_chunk_size]`.
fn adjust_for_content_characteristics(mut config: OptimalConfig, content: &str) -> OptimalConfig {
    let avg_len = avg_sentence_length(content);
    let word_count = content.split_whitespace().count();

    if avg_len > 30.0 {
        config.chunk_size = (config.chunk_size as f64 * 1.2) as usize;
        config.chunk_overlap = (config.chunk_overlap as f64 * 1.2) as usize;
    } else if avg_len < 15.0 && avg_len > 0.0 {
        config.chunk_size = (config.chunk_size as f64 * 0.8) as usize;
        config.chunk_overlap = (config.chunk_overlap as f64 * 0.8) as usize;
    }

    if word_count < 100 {
        config.chunk_size = config.chunk_size.min(word_count * 4);
        config.chunk_overlap = config.chunk_overlap.min(config.chunk_size / 4);
    } else if word_count > 10_000 {
        config.chunk_size = (config.chunk_size as f64 * 1.1) as usize;
        config.chunk_overlap = (config.chunk_overlap as f64 * 1.1) as usize;
    }

    config.chunk_size = config.chunk_size.clamp(config.min_chunk_size, config.max_chunk_size);
    config.chunk_overlap = config.chunk_overlap.min(config.chunk_size.saturating_sub(1));
    config
}

/// Analyzes `content` and returns the chunking configuration best suited to
/// it, seeded by `filename` and biased by an optional caller `hint`.
pub fn analyze_content(content: &str, filename: Option<&str>, hint: Option<&str>) -> ChunkingConfig {
    let detection = detect_content_type(content, filename, hint);
    let base = optimal_config(detection.content_type);
    let adjusted = adjust_for_content_characteristics(base, content);

    ChunkingConfig {
        chunk_size: adjusted.chunk_size,
        chunk_overlap: adjusted.chunk_overlap,
        min_chunk_size: adjusted.min_chunk_size,
        max_chunk_size: adjusted.max_chunk_size,
        strategy: adjusted.strategy,
        content_type: detection.content_type,
        confidence: detection.confidence,
        reasoning: adjusted.reasoning.to_string(),
        evidence: Some(detection.evidence),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPreview {
    pub chunk_count: usize,
    pub avg_chunk_chars: f64,
    pub size_variance: f64,
    pub quality: &'static str,
}

/// Simulates a fixed-size sliding-window split purely to estimate chunk
/// count and size distribution; does not use the config's actual strategy.
/// Token-to-character conversion uses a fixed factor of 4.
pub fn preview_chunking(content: &str, config: &ChunkingConfig) -> ChunkPreview {
    let approx_chars = config.chunk_size * 4;
    let approx_overlap_chars = config.chunk_overlap * 4;
    let step_size = approx_chars.saturating_sub(approx_overlap_chars).max(1);

    let chars: Vec<char> = content.chars().collect();
    let mut sizes = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let end = (start + approx_chars).min(chars.len());
        sizes.push(end - start);
        if end >= chars.len() {
            break;
        }
        start += step_size;
    }

    if sizes.is_empty() {
        return ChunkPreview {
            chunk_count: 0,
            avg_chunk_chars: 0.0,
            size_variance: 0.0,
            quality: "unknown",
        };
    }

    let avg_size = sizes.iter().sum::<usize>() as f64 / sizes.len() as f64;
    let variance = sizes.iter().map(|s| (*s as f64 - avg_size).powi(2)).sum::<f64>() / sizes.len() as f64;

    let min_chars = config.min_chunk_size * 4;
    let max_chars = config.max_chunk_size * 4;
    let quality = estimate_retrieval_quality(avg_size, variance, min_chars, max_chars);

    ChunkPreview {
        chunk_count: sizes.len(),
        avg_chunk_chars: avg_size,
        size_variance: variance,
        quality,
    }
}

fn estimate_retrieval_quality(avg_size: f64, variance: f64, min_chars: usize, max_chars: usize) -> &'static str {
    let min_chars = min_chars as f64;
    let max_chars = max_chars as f64;
    if avg_size >= min_chars && avg_size <= max_chars && variance < (avg_size * 0.3).powi(2) {
        "high"
    } else if avg_size >= min_chars * 0.8 && avg_size <= max_chars * 1.2 {
        "medium"
    } else {
        "low"
    }
}
