//! Vector store abstraction, grounded in
//! `examples/original_source/.../indexing/qdrant_client.py`'s `QdrantClient`.

pub mod qdrant;

use crate::error::Result;
use crate::models::{VectorPayload, VectorPoint};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static REPEATED_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

/// Lowercases, replaces non-`[a-z0-9]` runs with `_`, trims and collapses.
pub fn sanitize_collection_name(product_name: &str) -> String {
    let lower = product_name.to_lowercase();
    let replaced = NON_ALPHANUMERIC.replace_all(&lower, "_");
    let collapsed = REPEATED_UNDERSCORES.replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}

pub fn collection_name(workspace: &str, product_name: &str, version: u32) -> String {
    format!("ws_{workspace}__{}__v_{version}", sanitize_collection_name(product_name))
}

pub fn legacy_collection_name(workspace: &str, product_id: &str, version: u32) -> String {
    format!("ws_{workspace}__prod_{product_id}__v_{version}")
}

pub fn prod_alias_name(workspace: &str, product_name: &str) -> String {
    format!("prod_ws_{workspace}__{}", sanitize_collection_name(product_name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub points_count: u64,
    pub indexed_vectors_count: u64,
    pub segments_count: u64,
    pub vector_size: u32,
    pub distance: Distance,
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Exact-match field conditions, ANDed together.
    pub must_eq: HashMap<String, serde_json::Value>,
    /// Membership (`IN`) field conditions, ANDed together.
    pub must_in: HashMap<String, Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: u64,
    pub score: f32,
    pub payload: VectorPayload,
}

/// A vector-store backend, following the same trait-at-seams pattern as
/// `ObjectStore`/`ArtifactRegistry`, surfacing the Qdrant REST API.
#[async_trait]
pub trait VectorStoreClient: Send + Sync {
    async fn ensure_collection(&self, name: &str, size: u32, distance: Distance) -> Result<()>;

    async fn upsert_points(&self, name: &str, points: &[VectorPoint]) -> Result<()>;

    async fn search_points(
        &self,
        name: &str,
        query_vector: &[f32],
        limit: usize,
        score_threshold: Option<f32>,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchResult>>;

    async fn scroll_points(
        &self,
        name: &str,
        limit: usize,
        offset: Option<u64>,
        filter: Option<&SearchFilter>,
    ) -> Result<(Vec<VectorPayload>, Option<u64>)>;

    async fn get_collection_info(&self, name: &str) -> Result<Option<CollectionInfo>>;

    /// Atomically deletes any prior alias of this name and points it at
    /// `collection_name`, in a single alias-action batch.
    async fn set_prod_alias(&self, alias_name: &str, collection_name: &str) -> Result<()>;

    async fn get_prod_alias_collection(&self, alias_name: &str) -> Result<Option<String>>;
}
