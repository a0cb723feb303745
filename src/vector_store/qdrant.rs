//! REST-based Qdrant client, grounded directly in
//! `examples/original_source/.../indexing/qdrant_client.py`'s HTTP call
//! shapes (the original wraps the `qdrant-client` Python SDK; this talks to
//! the same REST surface directly via `reqwest`).

use crate::error::{AirdError, Result, VectorStoreError};
use crate::models::{VectorPayload, VectorPoint};
use crate::vector_store::{CollectionInfo, Distance, SearchFilter, SearchResult, VectorStoreClient};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

pub struct QdrantClient {
    base_url: String,
    http: Client,
}

impl QdrantClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            base_url: format!("http://{host}:{port}"),
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn distance_str(distance: Distance) -> &'static str {
        match distance {
            Distance::Cosine => "Cosine",
            Distance::Dot => "Dot",
            Distance::Euclid => "Euclid",
        }
    }

    fn build_filter(filter: Option<&SearchFilter>) -> Option<Value> {
        let filter = filter?;
        if filter.must_eq.is_empty() && filter.must_in.is_empty() {
            return None;
        }
        let mut must = Vec::new();
        for (key, value) in &filter.must_eq {
            must.push(json!({ "key": key, "match": { "value": value } }));
        }
        for (key, values) in &filter.must_in {
            must.push(json!({ "key": key, "match": { "any": values } }));
        }
        Some(json!({ "must": must }))
    }
}

#[derive(Debug, Deserialize)]
struct QdrantEnvelope<T> {
    result: Option<T>,
    status: Value,
}

#[derive(Debug, Deserialize)]
struct CollectionExistsResult {
    #[serde(default)]
    collections: Vec<CollectionSummary>,
}

#[derive(Debug, Deserialize)]
struct CollectionSummary {
    name: String,
}

#[derive(Debug, Serialize)]
struct CreateCollectionBody {
    vectors: VectorParamsBody,
}

#[derive(Debug, Serialize)]
struct VectorParamsBody {
    size: u32,
    distance: &'static str,
}

#[derive(Debug, Serialize)]
struct UpsertBody<'a> {
    points: Vec<PointBody<'a>>,
}

#[derive(Debug, Serialize)]
struct PointBody<'a> {
    id: u64,
    vector: &'a [f32],
    payload: &'a VectorPayload,
}

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
    with_vector: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    score_threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: u64,
    score: f32,
    payload: VectorPayload,
}

#[derive(Debug, Serialize)]
struct ScrollBody {
    limit: usize,
    with_payload: bool,
    with_vector: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ScrollResult {
    points: Vec<ScrollPoint>,
    #[serde(default)]
    next_page_offset: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ScrollPoint {
    payload: VectorPayload,
}

#[derive(Debug, Deserialize)]
struct CollectionInfoResult {
    points_count: Option<u64>,
    indexed_vectors_count: Option<u64>,
    segments_count: Option<u64>,
    config: CollectionConfigResult,
}

#[derive(Debug, Deserialize)]
struct CollectionConfigResult {
    params: CollectionParamsResult,
}

#[derive(Debug, Deserialize)]
struct CollectionParamsResult {
    vectors: VectorParamsResult,
}

#[derive(Debug, Deserialize)]
struct VectorParamsResult {
    size: u32,
    distance: String,
}

#[derive(Debug, Deserialize)]
struct AliasesResult {
    #[serde(default)]
    aliases: Vec<AliasEntry>,
}

#[derive(Debug, Deserialize)]
struct AliasEntry {
    alias_name: String,
    collection_name: String,
}

#[async_trait]
impl VectorStoreClient for QdrantClient {
    async fn ensure_collection(&self, name: &str, size: u32, distance: Distance) -> Result<()> {
        let exists = self
            .http
            .get(self.url(&format!("/collections/{name}")))
            .send()
            .await
            .map_err(|e| AirdError::VectorStore(VectorStoreError::RequestFailed(e.to_string())))?
            .status()
            .is_success();
        if exists {
            info!(collection = %name, "collection already exists");
            return Ok(());
        }

        let body = CreateCollectionBody {
            vectors: VectorParamsBody {
                size,
                distance: Self::distance_str(distance),
            },
        };
        let response = self
            .http
            .put(self.url(&format!("/collections/{name}")))
            .json(&body)
            .send()
            .await
            .map_err(|e| AirdError::VectorStore(VectorStoreError::RequestFailed(e.to_string())))?;
        if !response.status().is_success() {
            return Err(AirdError::VectorStore(VectorStoreError::RequestFailed(format!("failed to create collection {name}"))));
        }
        info!(collection = %name, size, "created collection");
        Ok(())
    }

    async fn upsert_points(&self, name: &str, points: &[VectorPoint]) -> Result<()> {
        if points.is_empty() {
            warn!("no points to upsert");
            return Ok(());
        }
        let body = UpsertBody {
            points: points
                .iter()
                .map(|p| PointBody {
                    id: p.id,
                    vector: &p.vector,
                    payload: &p.payload,
                })
                .collect(),
        };
        let response = self
            .http
            .put(self.url(&format!("/collections/{name}/points")))
            .json(&body)
            .send()
            .await
            .map_err(|e| AirdError::VectorStore(VectorStoreError::RequestFailed(e.to_string())))?;
        if !response.status().is_success() {
            return Err(AirdError::VectorStore(VectorStoreError::RequestFailed(format!("failed to upsert points to {name}"))));
        }
        info!(collection = %name, count = points.len(), "upserted points");
        Ok(())
    }

    async fn search_points(
        &self,
        name: &str,
        query_vector: &[f32],
        limit: usize,
        score_threshold: Option<f32>,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchResult>> {
        let body = SearchBody {
            vector: query_vector,
            limit,
            with_payload: true,
            with_vector: false,
            score_threshold,
            filter: Self::build_filter(filter),
        };
        let envelope: QdrantEnvelope<Vec<SearchHit>> = self
            .http
            .post(self.url(&format!("/collections/{name}/points/search")))
            .json(&body)
            .send()
            .await
            .map_err(|e| AirdError::VectorStore(VectorStoreError::RequestFailed(e.to_string())))?
            .json()
            .await
            .map_err(|e| AirdError::VectorStore(VectorStoreError::RequestFailed(e.to_string())))?;
        let hits = envelope.result.unwrap_or_default();
        Ok(hits
            .into_iter()
            .map(|h| SearchResult {
                id: h.id,
                score: h.score,
                payload: h.payload,
            })
            .collect())
    }

    async fn scroll_points(
        &self,
        name: &str,
        limit: usize,
        offset: Option<u64>,
        filter: Option<&SearchFilter>,
    ) -> Result<(Vec<VectorPayload>, Option<u64>)> {
        let body = ScrollBody {
            limit,
            with_payload: true,
            with_vector: false,
            offset,
            filter: Self::build_filter(filter),
        };
        let envelope: QdrantEnvelope<ScrollResult> = self
            .http
            .post(self.url(&format!("/collections/{name}/points/scroll")))
            .json(&body)
            .send()
            .await
            .map_err(|e| AirdError::VectorStore(VectorStoreError::RequestFailed(e.to_string())))?
            .json()
            .await
            .map_err(|e| AirdError::VectorStore(VectorStoreError::RequestFailed(e.to_string())))?;
        let result = envelope.result.ok_or_else(|| AirdError::VectorStore(VectorStoreError::CollectionNotFound(name.to_string())))?;
        Ok((result.points.into_iter().map(|p| p.payload).collect(), result.next_page_offset))
    }

    async fn get_collection_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let response = self
            .http
            .get(self.url(&format!("/collections/{name}")))
            .send()
            .await
            .map_err(|e| AirdError::VectorStore(VectorStoreError::RequestFailed(e.to_string())))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let envelope: QdrantEnvelope<CollectionInfoResult> = response
            .json()
            .await
            .map_err(|e| AirdError::VectorStore(VectorStoreError::RequestFailed(e.to_string())))?;
        let Some(result) = envelope.result else {
            return Ok(None);
        };
        let distance = match result.config.params.vectors.distance.as_str() {
            "Cosine" => Distance::Cosine,
            "Dot" => Distance::Dot,
            _ => Distance::Euclid,
        };
        Ok(Some(CollectionInfo {
            name: name.to_string(),
            points_count: result.points_count.unwrap_or(0),
            indexed_vectors_count: result.indexed_vectors_count.unwrap_or(0),
            segments_count: result.segments_count.unwrap_or(0),
            vector_size: result.config.params.vectors.size,
            distance,
        }))
    }

    async fn set_prod_alias(&self, alias_name: &str, collection_name: &str) -> Result<()> {
        let collections: QdrantEnvelope<CollectionExistsResult> = self
            .http
            .get(self.url("/collections"))
            .send()
            .await
            .map_err(|e| AirdError::VectorStore(VectorStoreError::RequestFailed(e.to_string())))?
            .json()
            .await
            .map_err(|e| AirdError::VectorStore(VectorStoreError::RequestFailed(e.to_string())))?;
        let exists = collections
            .result
            .map(|r| r.collections.iter().any(|c| c.name == collection_name))
            .unwrap_or(false);
        if !exists {
            return Err(AirdError::VectorStore(VectorStoreError::AliasTargetMissing(collection_name.to_string())));
        }

        let actions = json!({
            "actions": [
                { "delete_alias": { "alias_name": alias_name } },
                { "create_alias": { "collection_name": collection_name, "alias_name": alias_name } },
            ]
        });
        let response = self
            .http
            .post(self.url("/collections/aliases"))
            .json(&actions)
            .send()
            .await
            .map_err(|e| AirdError::VectorStore(VectorStoreError::RequestFailed(e.to_string())))?;
        if !response.status().is_success() {
            return Err(AirdError::VectorStore(VectorStoreError::RequestFailed(format!("failed to swap alias {alias_name}"))));
        }
        info!(alias = %alias_name, collection = %collection_name, "swapped production alias");
        Ok(())
    }

    async fn get_prod_alias_collection(&self, alias_name: &str) -> Result<Option<String>> {
        let envelope: QdrantEnvelope<AliasesResult> = self
            .http
            .get(self.url("/aliases"))
            .send()
            .await
            .map_err(|e| AirdError::VectorStore(VectorStoreError::RequestFailed(e.to_string())))?
            .json()
            .await
            .map_err(|e| AirdError::VectorStore(VectorStoreError::RequestFailed(e.to_string())))?;
        let _ = &envelope.status;
        Ok(envelope
            .result
            .and_then(|r| r.aliases.into_iter().find(|a| a.alias_name == alias_name))
            .map(|a| a.collection_name))
    }
}

/// Checks both the sanitized-name and legacy `product_id`-based collection
/// naming schemes, for backward compatibility with older collections.
pub async fn find_collection_name(
    client: &dyn VectorStoreClient,
    sanitized_name: &str,
    legacy_name: &str,
) -> Result<Option<String>> {
    if client.get_collection_info(sanitized_name).await?.is_some() {
        return Ok(Some(sanitized_name.to_string()));
    }
    if client.get_collection_info(legacy_name).await?.is_some() {
        return Ok(Some(legacy_name.to_string()));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> QdrantClient {
        let url = server.uri();
        let without_scheme = url.trim_start_matches("http://");
        let (host, port) = without_scheme.split_once(':').unwrap();
        QdrantClient::new(host, port.parse().unwrap())
    }

    #[tokio::test]
    async fn test_ensure_collection_creates_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/widgets_v1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/collections/widgets_v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": true, "status": "ok" })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.ensure_collection("widgets_v1", 384, Distance::Cosine).await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_collection_skips_create_when_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/widgets_v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": {}, "status": "ok" })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.ensure_collection("widgets_v1", 384, Distance::Cosine).await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_points_empty_is_noop() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        client.upsert_points("widgets_v1", &[]).await.unwrap();
    }

    fn sample_payload() -> VectorPayload {
        VectorPayload {
            chunk_id: "doc1_general_0".to_string(),
            filename: "doc1.txt".to_string(),
            source_file: "doc1.txt".to_string(),
            document_id: "doc1".to_string(),
            page: None,
            page_number: None,
            section: "general".to_string(),
            field_name: None,
            score: 92.0,
            text: "hello world".to_string(),
            text_length: 11,
            product_id: "widgets".to_string(),
            version: 1,
            collection_id: "widgets_v1".to_string(),
            created_at: chrono::Utc::now(),
            doc_scope: None,
            field_scope: None,
            tags: Vec::new(),
            token_est: 2,
        }
    }

    #[tokio::test]
    async fn test_search_points_parses_hits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/widgets_v1/points/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    { "id": 42, "score": 0.9, "payload": sample_payload() }
                ],
                "status": "ok"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let hits = client
            .search_points("widgets_v1", &[0.1, 0.2, 0.3], 5, None, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 42);
    }

    #[tokio::test]
    async fn test_set_prod_alias_fails_when_target_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": { "collections": [] }, "status": "ok" })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.set_prod_alias("widgets_prod", "widgets_v2").await.unwrap_err();
        assert!(matches!(err, AirdError::VectorStore(VectorStoreError::AliasTargetMissing(_))));
    }

    #[tokio::test]
    async fn test_get_prod_alias_collection_returns_none_when_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/aliases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": { "aliases": [] }, "status": "ok" })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.get_prod_alias_collection("widgets_prod").await.unwrap(), None);
    }
}
