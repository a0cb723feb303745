//! End-to-end tests driving `PipelineRunner` against a tempdir-backed
//! `LocalObjectStore`, an in-memory SQLite registry, and a hand-rolled
//! in-memory `VectorStoreClient` double (`mockall` was dropped; see
//! DESIGN.md's "Dependency changes" section).

use aird_core::acl::apply_acl_filter_to_payloads;
use aird_core::config::RuntimeConfig;
use aird_core::models::{Acl, AclAccessType, PipelineRunStatus, VectorPayload, VectorPoint};
use aird_core::object_store::LocalObjectStore;
use aird_core::pipeline::optimizer::suggest_next_config;
use aird_core::pipeline::{PipelineRunner, Stage};
use aird_core::registry::SqliteArtifactRegistry;
use aird_core::runtime::Runtime;
use aird_core::storage_view::StorageView;
use aird_core::vector_store::{CollectionInfo, Distance, SearchFilter, SearchResult, VectorStoreClient};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// A minimal in-process stand-in for a Qdrant-backed vector store, keeping
/// collections and their points in memory. Search ranks by cosine
/// similarity; filters are matched by serializing the payload to JSON and
/// comparing the requested fields, mirroring how Qdrant matches payload
/// conditions.
struct InMemoryVectorStore {
    collections: Mutex<HashMap<String, (u32, Vec<VectorPoint>)>>,
    aliases: Mutex<HashMap<String, String>>,
}

impl InMemoryVectorStore {
    fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            aliases: Mutex::new(HashMap::new()),
        }
    }

    fn points_count(&self, name: &str) -> usize {
        self.collections.lock().unwrap().get(name).map(|(_, p)| p.len()).unwrap_or(0)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn payload_matches(payload: &VectorPayload, filter: &SearchFilter) -> bool {
    let value = serde_json::to_value(payload).unwrap_or_default();
    for (key, expected) in &filter.must_eq {
        if value.get(key) != Some(expected) {
            return false;
        }
    }
    for (key, expected) in &filter.must_in {
        let Some(actual) = value.get(key) else { return false };
        if !expected.contains(actual) {
            return false;
        }
    }
    true
}

#[async_trait]
impl VectorStoreClient for InMemoryVectorStore {
    async fn ensure_collection(&self, name: &str, size: u32, _distance: Distance) -> aird_core::error::Result<()> {
        self.collections.lock().unwrap().entry(name.to_string()).or_insert_with(|| (size, Vec::new()));
        Ok(())
    }

    async fn upsert_points(&self, name: &str, points: &[VectorPoint]) -> aird_core::error::Result<()> {
        let mut collections = self.collections.lock().unwrap();
        let entry = collections.entry(name.to_string()).or_insert_with(|| (points.first().map(|p| p.vector.len() as u32).unwrap_or(0), Vec::new()));
        for point in points {
            if let Some(existing) = entry.1.iter_mut().find(|p: &&mut VectorPoint| p.id == point.id) {
                *existing = point.clone();
            } else {
                entry.1.push(point.clone());
            }
        }
        Ok(())
    }

    async fn search_points(
        &self,
        name: &str,
        query_vector: &[f32],
        limit: usize,
        score_threshold: Option<f32>,
        filter: Option<&SearchFilter>,
    ) -> aird_core::error::Result<Vec<SearchResult>> {
        let collections = self.collections.lock().unwrap();
        let Some((_, points)) = collections.get(name) else { return Ok(Vec::new()) };
        let mut scored: Vec<SearchResult> = points
            .iter()
            .filter(|p| filter.map(|f| payload_matches(&p.payload, f)).unwrap_or(true))
            .map(|p| SearchResult {
                id: p.id,
                score: cosine(&p.vector, query_vector),
                payload: p.payload.clone(),
            })
            .filter(|r| score_threshold.map(|t| r.score >= t).unwrap_or(true))
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        scored.truncate(limit);
        Ok(scored)
    }

    async fn scroll_points(
        &self,
        name: &str,
        limit: usize,
        offset: Option<u64>,
        filter: Option<&SearchFilter>,
    ) -> aird_core::error::Result<(Vec<VectorPayload>, Option<u64>)> {
        let collections = self.collections.lock().unwrap();
        let Some((_, points)) = collections.get(name) else { return Ok((Vec::new(), None)) };
        let start = offset.unwrap_or(0) as usize;
        let matching: Vec<VectorPayload> = points
            .iter()
            .filter(|p| filter.map(|f| payload_matches(&p.payload, f)).unwrap_or(true))
            .map(|p| p.payload.clone())
            .collect();
        let page: Vec<VectorPayload> = matching.iter().skip(start).take(limit).cloned().collect();
        let next = if start + page.len() < matching.len() { Some((start + page.len()) as u64) } else { None };
        Ok((page, next))
    }

    async fn get_collection_info(&self, name: &str) -> aird_core::error::Result<Option<CollectionInfo>> {
        let collections = self.collections.lock().unwrap();
        Ok(collections.get(name).map(|(size, points)| CollectionInfo {
            name: name.to_string(),
            points_count: points.len() as u64,
            indexed_vectors_count: points.len() as u64,
            segments_count: 1,
            vector_size: *size,
            distance: Distance::Cosine,
        }))
    }

    async fn set_prod_alias(&self, alias_name: &str, collection_name: &str) -> aird_core::error::Result<()> {
        self.aliases.lock().unwrap().insert(alias_name.to_string(), collection_name.to_string());
        Ok(())
    }

    async fn get_prod_alias_collection(&self, alias_name: &str) -> aird_core::error::Result<Option<String>> {
        Ok(self.aliases.lock().unwrap().get(alias_name).cloned())
    }
}

async fn test_runtime(root: &std::path::Path, store: InMemoryVectorStore) -> (std::sync::Arc<Runtime>, RuntimeConfig) {
    let object_store: std::sync::Arc<dyn aird_core::object_store::ObjectStore> = std::sync::Arc::new(LocalObjectStore::new(root));
    let registry = SqliteArtifactRegistry::connect("sqlite::memory:").await.unwrap();
    let db = sqlx::sqlite::SqlitePool::connect("sqlite::memory:?mode=rwc").await.unwrap();

    let runtime = Runtime {
        object_store,
        vector_store: std::sync::Arc::new(store),
        registry: std::sync::Arc::new(registry),
        db,
    };

    let config = RuntimeConfig::default();
    (std::sync::Arc::new(runtime), config)
}

async fn write_raw(root: &std::path::Path, workspace: &str, product: &str, version: u32, file_stem: &str, text: &str) {
    let object_store: std::sync::Arc<dyn aird_core::object_store::ObjectStore> = std::sync::Arc::new(LocalObjectStore::new(root));
    let view = StorageView::new(workspace, product, version, object_store);
    view.put_raw_bytes(&format!("{file_stem}.txt"), text.as_bytes().to_vec(), Some("text/plain"))
        .await
        .unwrap();
}

fn technical_doc() -> String {
    let mut text = String::from("# Getting Started\n\n");
    text.push_str(&"This guide explains how to configure, deploy, and implement the service using its REST API and JSON wire format. ".repeat(30));
    text.push_str("\n\n## Configuration\n\n");
    text.push_str(&"The service reads its configuration from a TOML file and validates every field against a versioned schema before startup. ".repeat(30));
    text
}

#[tokio::test]
async fn happy_path_short_technical_doc_indexes_and_passes_policy() {
    let dir = tempfile::tempdir().unwrap();
    write_raw(dir.path(), "ws1", "acme-docs", 1, "intro", &technical_doc()).await;

    let (runtime, config) = test_runtime(dir.path(), InMemoryVectorStore::new()).await;
    let vector_store = runtime.vector_store.clone();
    let runner = PipelineRunner::new(runtime, config);

    let run = runner
        .run_all("ws1", "acme-docs", 1, &["intro".to_string()], Some("tech"))
        .await
        .unwrap();

    assert_ne!(run.status, PipelineRunStatus::Failed);

    let object_store: std::sync::Arc<dyn aird_core::object_store::ObjectStore> = std::sync::Arc::new(LocalObjectStore::new(dir.path()));
    let view = StorageView::new("ws1", "acme-docs", 1, object_store);
    let records = view.get_processed_jsonl().await.unwrap();
    let metrics = view.get_metrics_json().await.unwrap();

    assert!(records.len() >= 2, "expected at least two chunks, got {}", records.len());
    let record_ids: std::collections::HashSet<_> = records.iter().map(|r| r.chunk_id.as_str()).collect();
    let metric_ids: std::collections::HashSet<_> = metrics.iter().map(|m| m.chunk_id.as_str()).collect();
    assert_eq!(record_ids, metric_ids, "metrics.json chunk_ids must match processed.jsonl chunk_ids");

    let collection = aird_core::vector_store::collection_name("ws1", "acme-docs", 1);
    let info = vector_store.get_collection_info(&collection).await.unwrap().unwrap();
    assert_eq!(info.vector_size, 384);
    assert_eq!(info.points_count, records.len() as u64);
}

#[tokio::test]
async fn enable_deduplication_drops_near_identical_chunks_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let repeated = technical_doc();
    write_raw(dir.path(), "ws1", "dup-docs", 1, "original", &repeated).await;
    write_raw(dir.path(), "ws1", "dup-docs", 1, "mirrored", &repeated).await;

    let (runtime, mut config) = test_runtime(dir.path(), InMemoryVectorStore::new()).await;
    config.pipeline.enable_deduplication = true;
    let runner = PipelineRunner::new(runtime, config);

    let run = runner
        .run_until(
            "ws1",
            "dup-docs",
            1,
            &["original".to_string(), "mirrored".to_string()],
            Some("tech"),
            Stage::Preprocess,
        )
        .await
        .unwrap();

    let preprocess_result = run.metrics.aird_stages.get("preprocess").expect("preprocess stage recorded");
    let duplicates_removed = preprocess_result["metrics"]["duplicates_removed"].as_u64().unwrap_or(0);
    assert!(duplicates_removed > 0, "mirrored file's chunks should be detected as near-duplicates");

    let object_store: std::sync::Arc<dyn aird_core::object_store::ObjectStore> = std::sync::Arc::new(LocalObjectStore::new(dir.path()));
    let view = StorageView::new("ws1", "dup-docs", 1, object_store);
    let records = view.get_processed_jsonl().await.unwrap();
    let unique_texts: std::collections::HashSet<_> = records.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(unique_texts.len(), records.len(), "no two kept chunks should be near-duplicate text");
}

#[tokio::test]
async fn policy_fails_closed_on_dense_pii_and_optimizer_recommends_redaction() {
    let dir = tempfile::tempdir().unwrap();
    let mut text = String::new();
    for i in 0..200 {
        text.push_str(&format!("Record {i}: SSN 123-45-{:04}, contact jane.doe{i}@example.com.\n", i));
    }
    write_raw(dir.path(), "ws1", "secure-export", 1, "rows", &text).await;

    let (runtime, config) = test_runtime(dir.path(), InMemoryVectorStore::new()).await;
    let runner = PipelineRunner::new(runtime, config);

    let run = runner
        .run_all("ws1", "secure-export", 1, &["rows".to_string()], Some("general"))
        .await
        .unwrap();

    assert_eq!(run.status, PipelineRunStatus::FailedPolicy);

    let object_store: std::sync::Arc<dyn aird_core::object_store::ObjectStore> = std::sync::Arc::new(LocalObjectStore::new(dir.path()));
    let view = StorageView::new("ws1", "secure-export", 1, object_store);
    let metrics = view.get_metrics_json().await.unwrap();
    assert!(metrics.iter().any(|m| m.secure < 90.0));

    let fingerprint = aird_core::pipeline::fingerprint::generate_fingerprint(&metrics, None);
    let policy = aird_core::pipeline::policy::evaluate_policy(&fingerprint, Default::default());
    assert!(policy.violations.iter().any(|v| v.starts_with("security_not_full")));

    let suggestion = suggest_next_config(&fingerprint, &policy, Some("general"));
    assert_eq!(suggestion.config_tweaks.get("redaction_strict"), Some(&serde_json::Value::Bool(true)));
}

#[tokio::test]
async fn content_type_routing_picks_code_playbook_for_python_source() {
    let dir = tempfile::tempdir().unwrap();
    let mut code = String::new();
    for i in 0..40 {
        code.push_str(&format!("def handler_{i}(request):\n    return process(request)\n\n"));
    }
    write_raw(dir.path(), "ws1", "sdk", 1, "notes.py", &code).await;

    let object_store: std::sync::Arc<dyn aird_core::object_store::ObjectStore> = std::sync::Arc::new(LocalObjectStore::new(dir.path()));
    let view = StorageView::new("ws1", "sdk", 1, object_store);
    let extractor = aird_core::pdf::DefaultPdfExtractor;
    let playbook = aird_core::playbook::resolve_playbook_file(std::path::Path::new("./playbooks"), "tech").unwrap();

    let result = aird_core::pipeline::preprocess::preprocess_file(&view, &extractor, "notes.py", &playbook)
        .await
        .unwrap()
        .expect("non-empty source should produce a preprocess result");

    assert!(!result.records.is_empty());

    let detection = aird_core::analyzer::detect_content_type(&code, Some("notes.py"), None);
    assert_eq!(detection.content_type, aird_core::analyzer::ContentType::Code);
    assert!(detection.confidence >= 0.6, "expected confident code detection, got {}", detection.confidence);

    let chunk_config = aird_core::analyzer::analyze_content(&code, Some("notes.py"), None);
    assert_eq!(chunk_config.strategy, aird_core::analyzer::ChunkingStrategy::Recursive);
    assert_eq!(chunk_config.chunk_size, 900);
}

#[tokio::test]
async fn embedding_dimension_mismatch_fails_the_indexing_stage_without_embedding() {
    let dir = tempfile::tempdir().unwrap();
    write_raw(dir.path(), "ws1", "legacy", 1, "body", &technical_doc()).await;

    let store = InMemoryVectorStore::new();
    let collection = aird_core::vector_store::collection_name("ws1", "legacy", 1);
    store.ensure_collection(&collection, 1536, Distance::Cosine).await.unwrap();

    let (runtime, config) = test_runtime(dir.path(), store).await;
    let vector_store = runtime.vector_store.clone();
    let runner = PipelineRunner::new(runtime, config);

    let run = runner
        .run_until("ws1", "legacy", 1, &["body".to_string()], Some("tech"), Stage::Indexing)
        .await
        .unwrap();

    assert_eq!(run.status, PipelineRunStatus::Failed);
    let indexing_result = run.metrics.aird_stages.get("indexing").expect("indexing stage recorded");
    assert_eq!(indexing_result["status"], serde_json::json!("failed"));
    let error = indexing_result["error"].as_str().unwrap_or_default();
    assert!(error.contains("1536"), "error should name the collection dimension: {error}");
    assert!(error.contains("384"), "error should name the configured dimension: {error}");

    assert_eq!(vector_store.get_collection_info(&collection).await.unwrap().unwrap().points_count, 0);
}

#[tokio::test]
async fn acl_document_scope_restricts_to_named_documents() {
    let store = InMemoryVectorStore::new();
    let collection = "ws_ws1__docs__v_1";
    store.ensure_collection(collection, 384, Distance::Cosine).await.unwrap();

    let mut points = Vec::new();
    for (doc, chunk) in [("DocA", "a1"), ("DocB", "b1"), ("DocC", "c1")] {
        points.push(VectorPoint {
            id: aird_core::pipeline::indexing::point_id("docs", chunk, 1),
            vector: vec![0.1; 384],
            payload: VectorPayload {
                chunk_id: chunk.to_string(),
                filename: format!("{doc}.jsonl"),
                source_file: doc.to_string(),
                document_id: doc.to_string(),
                page: None,
                page_number: None,
                section: "general".to_string(),
                field_name: None,
                score: 80.0,
                text: "body text".to_string(),
                text_length: 9,
                product_id: "docs".to_string(),
                version: 1,
                collection_id: collection.to_string(),
                created_at: chrono::Utc::now(),
                doc_scope: None,
                field_scope: None,
                tags: Vec::new(),
                token_est: 10,
            },
        });
    }
    store.upsert_points(collection, &points).await.unwrap();

    let (payloads, next) = store.scroll_points(collection, 100, None, None).await.unwrap();
    assert_eq!(payloads.len(), 3);
    assert!(next.is_none());

    let acls = vec![Acl {
        user_id: "u1".to_string(),
        product_id: "docs".to_string(),
        access_type: AclAccessType::Document,
        index_scope: None,
        doc_scope: Some("DocA,DocC".to_string()),
        field_scope: None,
    }];
    let allowed = apply_acl_filter_to_payloads(&payloads, &acls, "docs");
    let allowed_docs: std::collections::HashSet<_> = allowed.iter().map(|p| p.document_id.as_str()).collect();
    assert_eq!(allowed_docs, std::collections::HashSet::from(["DocA", "DocC"]));

    // The full playground query path: scroll restricted to (product,
    // version), narrow by ACL, then search bound to the admitted chunk ids.
    let result = aird_core::query::acl_filtered_search(
        &store,
        collection,
        "docs",
        1,
        &acls,
        &[0.1; 384],
        10,
        None,
    )
    .await
    .unwrap();
    assert!(result.acl_applied);
    assert_eq!(result.candidates_scanned, 3);
    assert_eq!(result.candidates_admitted, 2);
    let hit_docs: std::collections::HashSet<_> =
        result.hits.iter().map(|h| h.payload.document_id.clone()).collect();
    assert_eq!(hit_docs, std::collections::HashSet::from(["DocA".to_string(), "DocC".to_string()]));
}

#[tokio::test]
async fn promotion_swaps_alias_to_the_newly_promoted_version() {
    let dir = tempfile::tempdir().unwrap();
    write_raw(dir.path(), "ws1", "promo-product", 1, "body", &technical_doc()).await;
    write_raw(dir.path(), "ws1", "promo-product", 2, "body", &technical_doc()).await;

    let (runtime, config) = test_runtime(dir.path(), InMemoryVectorStore::new()).await;
    let vector_store = runtime.vector_store.clone();
    let registry = runtime.registry.clone();
    let runner = PipelineRunner::new(runtime, config);

    runner
        .run_until("ws1", "promo-product", 1, &["body".to_string()], Some("tech"), Stage::Indexing)
        .await
        .unwrap();
    runner
        .run_until("ws1", "promo-product", 2, &["body".to_string()], Some("tech"), Stage::Indexing)
        .await
        .unwrap();

    runner.promote("ws1", "promo-product", 1).await.unwrap();
    let alias = aird_core::vector_store::prod_alias_name("ws1", "promo-product");
    assert_eq!(vector_store.get_prod_alias_collection(&alias).await.unwrap().as_deref(), Some(aird_core::vector_store::collection_name("ws1", "promo-product", 1).as_str()));

    runner.promote("ws1", "promo-product", 2).await.unwrap();
    assert_eq!(vector_store.get_prod_alias_collection(&alias).await.unwrap().as_deref(), Some(aird_core::vector_store::collection_name("ws1", "promo-product", 2).as_str()));

    let artifacts = registry.list_for_version("ws1", "promo-product", 2, None).await.unwrap();
    assert!(!artifacts.is_empty());
    assert!(artifacts.iter().all(|a| a.retention == aird_core::models::RetentionPolicy::KeepForever));
}
