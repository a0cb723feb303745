//! Shared data-model types for the ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawFileStatus {
    Ingested,
    Processing,
    Processed,
    Failed,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineRunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    ReadyWithWarnings,
    FailedPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Active,
    Archived,
    Deleted,
    Purged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Jsonl,
    Json,
    Csv,
    Pdf,
    Vector,
    Text,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    KeepForever,
    Days30,
    Days90,
    Days365,
    DeleteOnPromote,
    OnFailureKeep90,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclAccessType {
    Full,
    Index,
    Document,
    Field,
}

/// One line of processed JSONL emitted by the preprocess stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedRecord {
    pub chunk_id: String,
    pub text: String,
    #[serde(default = "default_section")]
    pub section: String,
    pub document_id: String,
    pub token_est: u32,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub field_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

fn default_section() -> String {
    "general".to_string()
}

/// One entry of metrics.json.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    pub file: String,
    pub chunk_id: String,
    pub section: String,
    #[serde(rename = "AI_Trust_Score")]
    pub ai_trust_score: f64,
    #[serde(rename = "Completeness")]
    pub completeness: f64,
    #[serde(rename = "Quality")]
    pub quality: f64,
    #[serde(rename = "Secure")]
    pub secure: f64,
    #[serde(rename = "Metadata_Presence")]
    pub metadata_presence: f64,
    #[serde(rename = "KnowledgeBase_Ready")]
    pub knowledge_base_ready: f64,
    #[serde(default)]
    pub token_est: Option<u32>,
}

/// Aggregate, multi-dimensional quality vector of a (product, version).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Fingerprint {
    #[serde(rename = "AI_Trust_Score")]
    pub ai_trust_score: f64,
    #[serde(rename = "Completeness")]
    pub completeness: f64,
    #[serde(rename = "Quality")]
    pub quality: f64,
    #[serde(rename = "Secure")]
    pub secure: f64,
    #[serde(rename = "Metadata_Presence")]
    pub metadata_presence: f64,
    #[serde(rename = "KnowledgeBase_Ready")]
    pub knowledge_base_ready: f64,
    #[serde(rename = "Chunk_Boundary_Quality", skip_serializing_if = "Option::is_none")]
    pub chunk_boundary_quality: Option<f64>,
    #[serde(rename = "Embedding_Dimension_Consistency", skip_serializing_if = "Option::is_none")]
    pub embedding_dimension_consistency: Option<f64>,
    #[serde(rename = "Embedding_Success_Rate", skip_serializing_if = "Option::is_none")]
    pub embedding_success_rate: Option<f64>,
    #[serde(rename = "Vector_Quality_Score", skip_serializing_if = "Option::is_none")]
    pub vector_quality_score: Option<f64>,
    #[serde(rename = "Embedding_Model_Health", skip_serializing_if = "Option::is_none")]
    pub embedding_model_health: Option<f64>,
    #[serde(rename = "Semantic_Search_Readiness", skip_serializing_if = "Option::is_none")]
    pub semantic_search_readiness: Option<f64>,
    #[serde(rename = "Retrieval_Recall_At_K", skip_serializing_if = "Option::is_none")]
    pub retrieval_recall_at_k: Option<f64>,
    #[serde(rename = "Average_Precision_At_K", skip_serializing_if = "Option::is_none")]
    pub average_precision_at_k: Option<f64>,
}

impl Fingerprint {
    pub fn is_empty(&self) -> bool {
        *self == Fingerprint::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Passed,
    Failed,
    Warnings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyResult {
    pub status: PolicyStatus,
    pub policy_passed: bool,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
    pub thresholds: PolicyThresholds,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PolicyThresholds {
    pub min_trust_score: f64,
    pub min_secure: f64,
    pub min_metadata_presence: f64,
    pub min_kb_ready: f64,
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self {
            min_trust_score: 50.0,
            min_secure: 90.0,
            min_metadata_presence: 80.0,
            min_kb_ready: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: String,
    pub workspace: String,
    pub product: String,
    pub version: u32,
    pub status: PipelineRunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dag_run_id: Option<String>,
    #[serde(default)]
    pub metrics: PipelineRunMetrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineRunMetrics {
    pub aird_stages: HashMap<String, serde_json::Value>,
    pub aird_stages_completed: Vec<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub artifact_id: String,
    pub stage: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub id: String,
    pub run_id: String,
    pub workspace: String,
    pub product: String,
    pub version: u32,
    pub stage_name: String,
    pub artifact_type: ArtifactType,
    pub artifact_name: String,
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub checksum: String,
    #[serde(default)]
    pub input_artifacts: Vec<ArtifactRef>,
    #[serde(default)]
    pub artifact_metadata: HashMap<String, serde_json::Value>,
    pub status: ArtifactStatus,
    pub retention: RetentionPolicy,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A single vector-store point. Payload is the sole metadata store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: VectorPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPayload {
    pub chunk_id: String,
    pub filename: String,
    pub source_file: String,
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    pub score: f64,
    pub text: String,
    pub text_length: usize,
    pub product_id: String,
    pub version: u32,
    pub collection_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_scope: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub token_est: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acl {
    pub user_id: String,
    pub product_id: String,
    pub access_type: AclAccessType,
    pub index_scope: Option<String>,
    pub doc_scope: Option<String>,
    pub field_scope: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingMode {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMode {
    Pattern,
    Hybrid,
    Llm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model_name: String,
    pub dimension: u32,
}
