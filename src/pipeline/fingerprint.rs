//! Aggregates per-chunk metrics into a single readiness fingerprint.
//!
//! Grounded in the original `fingerprint.py`'s `generate_fingerprint`: a
//! weighted mean by `token_est` when available, otherwise an arithmetic
//! mean, clamped to `[0, 100]` per dimension.

use crate::models::{Fingerprint, MetricRecord};

/// Optional preprocessing-derived statistics used to populate
/// `Chunk_Boundary_Quality`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreprocessingStats {
    pub mid_sentence_boundary_rate: f64,
}

/// Aggregates `metrics` into a [`Fingerprint`]. Returns the default (empty)
/// fingerprint when `metrics` is empty.
pub fn generate_fingerprint(metrics: &[MetricRecord], preprocessing_stats: Option<PreprocessingStats>) -> Fingerprint {
    if metrics.is_empty() {
        return Fingerprint::default();
    }

    let weight = |m: &MetricRecord| m.token_est.map(|t| t as f64).filter(|t| *t > 0.0).unwrap_or(1.0);
    let total_weight: f64 = metrics.iter().map(weight).sum();

    let weighted_mean = |get: fn(&MetricRecord) -> f64| -> f64 {
        let sum: f64 = metrics.iter().map(|m| get(m) * weight(m)).sum();
        (sum / total_weight).clamp(0.0, 100.0)
    };

    let mut fingerprint = Fingerprint {
        ai_trust_score: weighted_mean(|m| m.ai_trust_score),
        completeness: weighted_mean(|m| m.completeness),
        quality: weighted_mean(|m| m.quality),
        secure: weighted_mean(|m| m.secure),
        metadata_presence: weighted_mean(|m| m.metadata_presence),
        knowledge_base_ready: weighted_mean(|m| m.knowledge_base_ready),
        ..Default::default()
    };

    if let Some(stats) = preprocessing_stats {
        let boundary_quality = (100.0 - stats.mid_sentence_boundary_rate * 100.0).clamp(0.0, 100.0);
        fingerprint.chunk_boundary_quality = Some(boundary_quality);
    }

    fingerprint
}

/// Aggregates only the metrics whose `file` equals `file_tag`; `None` if no
/// such metrics exist.
pub fn aggregate_metrics_by_file(metrics: &[MetricRecord], file_tag: &str) -> Option<Fingerprint> {
    let file_metrics: Vec<MetricRecord> = metrics.iter().filter(|m| m.file == file_tag).cloned().collect();
    if file_metrics.is_empty() {
        return None;
    }
    Some(generate_fingerprint(&file_metrics, None))
}
