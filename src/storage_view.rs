//! A `(workspace, product, version)`-scoped view over the object store,
//! binding the generic `ObjectStore` to this crate's path layout.

use crate::error::{AirdError, Result};
use crate::models::{MetricRecord, ProcessedRecord};
use crate::object_store::ObjectStore;
use crate::path;
use crate::pdf::{is_pdf_bytes, PdfExtractor};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Hex-encoded SHA-256 digest of `data`, used as the artifact checksum
/// registered alongside each stage output.
pub fn checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// `(bucket, key, size, checksum)` describing a written artifact, returned by
/// every `put_*` method so the pipeline runner can register it.
pub type PutLocation = (String, String, u64, String);

pub struct StorageView {
    pub workspace: String,
    pub product: String,
    pub version: u32,
    store: Arc<dyn ObjectStore>,
}

impl StorageView {
    pub fn new(workspace: impl Into<String>, product: impl Into<String>, version: u32, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            workspace: workspace.into(),
            product: product.into(),
            version,
            store,
        }
    }

    fn raw_key(&self, filename: &str) -> String {
        format!("{}{}", path::raw_prefix(&self.workspace, &self.product, self.version), path::safe_filename(filename))
    }

    fn clean_key(&self, name: &str) -> String {
        format!("{}{}", path::clean_prefix(&self.workspace, &self.product, self.version), name)
    }

    fn artifact_key(&self, stage: &str, name: &str) -> String {
        format!(
            "{}{}/{}",
            path::artifacts_prefix(&self.workspace, &self.product, self.version),
            stage,
            name
        )
    }

    pub async fn put_raw_bytes(&self, filename: &str, data: Vec<u8>, content_type: Option<&str>) -> Result<String> {
        let key = self.raw_key(filename);
        self.store.put_bytes("aird-raw", &key, data, content_type).await?;
        Ok(key)
    }

    pub async fn put_manifest(&self, manifest: &serde_json::Value) -> Result<()> {
        let key = self.clean_key("manifest.json");
        let bytes = serde_json::to_vec_pretty(manifest)?;
        self.store.put_bytes("aird-clean", &key, bytes, Some("application/json")).await
    }

    /// Writes the processed JSONL, returning its `(bucket, key, size,
    /// checksum)` for artifact registration.
    pub async fn put_processed_jsonl(&self, records: &[ProcessedRecord]) -> Result<PutLocation> {
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }
        let size = buf.len() as u64;
        let sum = checksum(&buf);
        let key = self.clean_key("processed.jsonl");
        self.store.put_bytes("aird-clean", &key, buf, Some("application/x-ndjson")).await?;
        Ok(("aird-clean".to_string(), key, size, sum))
    }

    /// Writes `metrics.json`, returning its `(bucket, key, size, checksum)`
    /// for artifact registration.
    pub async fn put_metrics_json(&self, records: &[MetricRecord]) -> Result<PutLocation> {
        let key = self.artifact_key("scoring", "metrics.json");
        let bytes = serde_json::to_vec_pretty(records)?;
        let size = bytes.len() as u64;
        let sum = checksum(&bytes);
        self.store.put_bytes("aird-chunk", &key, bytes, Some("application/json")).await?;
        Ok(("aird-chunk".to_string(), key, size, sum))
    }

    /// Writes a stage artifact, returning its `(bucket, key, size, checksum)`
    /// for artifact registration.
    pub async fn put_artifact(&self, stage: &str, name: &str, bucket: &str, data: Vec<u8>) -> Result<PutLocation> {
        let key = self.artifact_key(stage, name);
        let size = data.len() as u64;
        let sum = checksum(&data);
        self.store.put_bytes(bucket, &key, data, None).await?;
        Ok((bucket.to_string(), key, size, sum))
    }

    /// Fetches the raw file and returns decoded text, falling back to PDF
    /// extraction when the bytes are not valid UTF-8 or are PDF-sniffed.
    pub async fn get_raw_text(&self, filename: &str, extractor: &dyn PdfExtractor) -> Result<String> {
        let key = self.raw_key(filename);
        let bytes = self
            .store
            .get_bytes("aird-raw", &key)
            .await?
            .ok_or_else(|| AirdError::NotFound(format!("aird-raw/{key}")))?;
        if is_pdf_bytes(&bytes) || filename.to_lowercase().ends_with(".pdf") {
            return extractor.extract_text(&bytes);
        }
        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(e) => Ok(String::from_utf8_lossy(e.as_bytes()).into_owned()),
        }
    }

    pub async fn get_processed_jsonl(&self) -> Result<Vec<ProcessedRecord>> {
        let key = self.clean_key("processed.jsonl");
        let bytes = self
            .store
            .get_bytes("aird-clean", &key)
            .await?
            .ok_or_else(|| AirdError::InputMissing("processed.jsonl".to_string()))?;
        let text = String::from_utf8_lossy(&bytes);
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AirdError::from))
            .collect()
    }

    pub async fn get_metrics_json(&self) -> Result<Vec<MetricRecord>> {
        let key = self.artifact_key("scoring", "metrics.json");
        let bytes = self
            .store
            .get_bytes("aird-chunk", &key)
            .await?
            .ok_or_else(|| AirdError::InputMissing("metrics.json".to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
