//! Scoring stage: per-chunk quality/metadata/security/readiness sub-scores
//! combined into an `AI_Trust_Score`.
//!
//! The four sub-scores and their combination are described in the original
//! `trust_scoring.py` module, which is not present in the retrieved source
//! pack (see `scoring_weights.json` and the corresponding entry in
//! DESIGN.md). The PII pattern set (SSN, email, phone, credit card) and
//! redaction-marker recognition are a fixed regex table rather than a
//! ported one, for the same reason.

use crate::models::{MetricRecord, ProcessedRecord};
use crate::playbook::Playbook;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static SSN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[\w.+-]+@[\w-]+\.[\w.-]+\b").unwrap());
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap());
static CREDIT_CARD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:\d[ -]*?){13,16}\b").unwrap());
static REDACTION_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[REDACTED\]|\*{3,}|X{3,}").unwrap());

/// Weights the four sub-scores are combined with to produce `AI_Trust_Score`.
/// Loaded from `scoring_weights.json`; falls back to the defaults below.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub quality: f64,
    pub metadata_presence: f64,
    pub secure: f64,
    pub kb_ready: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            quality: 0.25,
            metadata_presence: 0.20,
            secure: 0.30,
            kb_ready: 0.25,
        }
    }
}

/// Fraction of alphabetic characters, penalized for repetitiveness and for
/// length outside `[min_tokens, max_tokens]`.
fn quality_score(record: &ProcessedRecord, min_tokens: u32, max_tokens: u32) -> f64 {
    let text = record.text.trim();
    if text.is_empty() {
        return 0.0;
    }
    let total_chars = text.chars().count().max(1) as f64;
    let alpha_chars = text.chars().filter(|c| c.is_alphabetic()).count() as f64;
    let alpha_ratio = alpha_chars / total_chars;

    let words: Vec<&str> = text.split_whitespace().collect();
    let unique_words: HashSet<&str> = words.iter().copied().collect();
    let repetitiveness = if words.is_empty() {
        1.0
    } else {
        unique_words.len() as f64 / words.len() as f64
    };

    let length_factor = if record.token_est < min_tokens {
        (record.token_est as f64 / min_tokens.max(1) as f64).clamp(0.0, 1.0)
    } else if record.token_est > max_tokens {
        (max_tokens as f64 / record.token_est.max(1) as f64).clamp(0.0, 1.0)
    } else {
        1.0
    };

    ((alpha_ratio * 0.5 + repetitiveness * 0.3 + length_factor * 0.2) * 100.0).clamp(0.0, 100.0)
}

/// Fraction of expected metadata fields present, each weighted equally.
fn metadata_presence_score(record: &ProcessedRecord) -> f64 {
    let checks = [
        !record.document_id.is_empty(),
        record.section != "general" || !record.tags.is_empty(),
        record.field_name.is_some(),
        record.page.is_some(),
        !record.tags.is_empty(),
    ];
    let present = checks.iter().filter(|c| **c).count() as f64;
    (present / checks.len() as f64 * 100.0).clamp(0.0, 100.0)
}

/// Penalizes unredacted PII pattern matches; a matching redaction marker
/// near a hit is treated as already handled and not penalized.
fn secure_score(text: &str) -> f64 {
    let pattern_hits = [&*SSN_PATTERN, &*EMAIL_PATTERN, &*PHONE_PATTERN, &*CREDIT_CARD_PATTERN]
        .iter()
        .map(|re| re.find_iter(text).count())
        .sum::<usize>();

    if pattern_hits == 0 {
        return 100.0;
    }
    if REDACTION_PATTERN.is_match(text) {
        return 85.0;
    }

    let word_count = text.split_whitespace().count().max(1) as f64;
    let density = pattern_hits as f64 / word_count;
    (100.0 - (density * 100.0).min(100.0) - (pattern_hits as f64 * 10.0)).clamp(0.0, 100.0)
}

/// Section/heading presence plus token-count-within-target readiness.
fn kb_ready_score(record: &ProcessedRecord, max_tokens: u32) -> f64 {
    let has_section = record.section != "general";
    let target = max_tokens.max(1) as f64;
    let tolerance = target * 0.5;
    let diff = (record.token_est as f64 - target).abs();
    let within_target = (1.0 - (diff / tolerance).min(1.0)).clamp(0.0, 1.0);

    let section_component = if has_section { 40.0 } else { 20.0 };
    let target_component = within_target * 60.0;
    (section_component + target_component).clamp(0.0, 100.0)
}

/// Scores a single processed record against the active playbook's chunking
/// targets, producing the per-chunk metrics.json entry.
pub fn score_record(record: &ProcessedRecord, playbook: &Playbook, weights: ScoringWeights) -> MetricRecord {
    let min_tokens = playbook.chunking.min_tokens;
    let max_tokens = playbook.chunking.max_tokens;

    let quality = quality_score(record, min_tokens, max_tokens);
    let metadata_presence = metadata_presence_score(record);
    let secure = secure_score(&record.text);
    let knowledge_base_ready = kb_ready_score(record, max_tokens);

    let ai_trust_score = (quality * weights.quality
        + metadata_presence * weights.metadata_presence
        + secure * weights.secure
        + knowledge_base_ready * weights.kb_ready)
        .clamp(0.0, 100.0);

    MetricRecord {
        file: format!("{}.jsonl", record.document_id),
        chunk_id: record.chunk_id.clone(),
        section: record.section.clone(),
        ai_trust_score,
        completeness: metadata_presence,
        quality,
        secure,
        metadata_presence,
        knowledge_base_ready,
        token_est: Some(record.token_est),
    }
}

/// Scores every record in `records` against a common playbook/weight set.
pub fn score_records(records: &[ProcessedRecord], playbook: &Playbook, weights: ScoringWeights) -> Vec<MetricRecord> {
    records.iter().map(|r| score_record(r, playbook, weights)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str, token_est: u32) -> ProcessedRecord {
        ProcessedRecord {
            chunk_id: "c1".to_string(),
            text: text.to_string(),
            section: "intro".to_string(),
            document_id: "doc1".to_string(),
            token_est,
            page: Some(1),
            field_name: Some("body".to_string()),
            tags: vec!["tag1".to_string()],
            source: None,
            audience: None,
            timestamp: None,
        }
    }

    #[test]
    fn test_clean_record_scores_highly() {
        let rec = record("This is a clean, well-formed paragraph describing the product in detail.", 200);
        let playbook = Playbook::default();
        let metric = score_record(&rec, &playbook, ScoringWeights::default());
        assert!(metric.ai_trust_score > 70.0, "expected high trust score, got {}", metric.ai_trust_score);
        assert!(metric.secure >= 99.0);
    }

    #[test]
    fn test_ssn_pattern_lowers_secure_score() {
        let rec = record("Contact John Doe, SSN 123-45-6789, for details.", 20);
        let playbook = Playbook::default();
        let metric = score_record(&rec, &playbook, ScoringWeights::default());
        assert!(metric.secure < 100.0);
    }

    #[test]
    fn test_redacted_ssn_scores_better_than_unredacted() {
        let unredacted = record("SSN: 123-45-6789", 10);
        let redacted = record("SSN: 123-45-6789 [REDACTED]", 10);
        let playbook = Playbook::default();
        let weights = ScoringWeights::default();
        let unredacted_score = score_record(&unredacted, &playbook, weights).secure;
        let redacted_score = score_record(&redacted, &playbook, weights).secure;
        assert!(redacted_score > unredacted_score);
    }

    #[test]
    fn test_missing_metadata_lowers_metadata_presence() {
        let mut rec = record("Some text here without much metadata.", 50);
        rec.field_name = None;
        rec.page = None;
        rec.tags = vec![];
        rec.section = "general".to_string();
        let playbook = Playbook::default();
        let metric = score_record(&rec, &playbook, ScoringWeights::default());
        assert!(metric.metadata_presence < 50.0);
    }
}
