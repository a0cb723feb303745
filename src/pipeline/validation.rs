//! Validation stage: checks each chunk's `AI_Trust_Score` against a
//! configurable threshold and emits a CSV summary artifact.

use crate::error::Result;
use crate::models::MetricRecord;
use crate::storage_view::{PutLocation, StorageView};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationRow {
    pub file: String,
    pub chunk_id: String,
    pub section: String,
    #[serde(rename = "AI_Trust_Score")]
    pub ai_trust_score: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl ValidationSummary {
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.passed as f64 / self.total as f64) * 100.0
    }
}

/// Checks every metric against `threshold`, producing one row per chunk.
pub fn validate_metrics(metrics: &[MetricRecord], threshold: f64) -> (Vec<ValidationRow>, ValidationSummary) {
    let mut summary = ValidationSummary::default();
    let rows = metrics
        .iter()
        .map(|m| {
            let passed = m.ai_trust_score >= threshold;
            summary.total += 1;
            if passed {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }
            ValidationRow {
                file: m.file.clone(),
                chunk_id: m.chunk_id.clone(),
                section: m.section.clone(),
                ai_trust_score: m.ai_trust_score,
                passed,
            }
        })
        .collect();
    (rows, summary)
}

/// Serializes `rows` to CSV bytes with a header row.
pub fn write_validation_csv(rows: &[ValidationRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| crate::error::AirdError::Integrity(e.to_string()))?;
    }
    writer.flush().map_err(crate::error::AirdError::Io)?;
    writer.into_inner().map_err(|e| crate::error::AirdError::Integrity(e.to_string()))
}

/// Validates `metrics` and uploads the CSV summary as a `validation` stage
/// artifact, returning the summary and the `(bucket, key, size, checksum)`
/// it was stored at.
pub async fn run_validation(
    view: &StorageView,
    metrics: &[MetricRecord],
    threshold: f64,
) -> Result<(ValidationSummary, PutLocation)> {
    let (rows, summary) = validate_metrics(metrics, threshold);
    let csv_bytes = write_validation_csv(&rows)?;
    let location = view.put_artifact("validation", "validation_summary.csv", "aird-chunk", csv_bytes).await?;
    Ok((summary, location))
}
