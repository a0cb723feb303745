//! ACL-aware retrieval: the "playground" query path described in the
//! vector-indexing component design. Scrolls the full collection restricted
//! to a (product, version) scope, narrows it through a user's ACLs, then
//! issues the actual k-NN search bound to exactly the chunk ids the ACL
//! pass admitted.
//!
//! Grounded in `examples/original_source/.../indexing/qdrant_client.py`'s
//! scroll-then-search pairing, generalized to a free function over the
//! `VectorStoreClient` trait instead of a method on a concrete client.

use crate::acl::apply_acl_filter_to_payloads;
use crate::error::Result;
use crate::models::{Acl, VectorPayload};
use crate::vector_store::{SearchFilter, SearchResult, VectorStoreClient};
use serde_json::json;

/// Page size used when scrolling a collection to build the ACL candidate set.
const SCROLL_PAGE_SIZE: usize = 256;

/// Result of an ACL-filtered query: the ranked hits plus whether an ACL
/// pass actually ran (a caller can ask for `user_acls: &[]`, in which case
/// `acl_applied` is `true` and the hit list is always empty — an empty ACL
/// list admits nothing, never "all").
#[derive(Debug, Clone)]
pub struct AclFilteredQuery {
    pub hits: Vec<SearchResult>,
    pub acl_applied: bool,
    pub candidates_scanned: usize,
    pub candidates_admitted: usize,
}

/// Scrolls every point in `collection` belonging to `product_id`/`version`,
/// narrows the set through `user_acls`, then searches `collection` with
/// `query_vector` restricted to the admitted `chunk_id`s via an `IN` filter.
///
/// An empty `user_acls` list short-circuits to zero hits without issuing a
/// search at all, matching `apply_acl_filter_to_payloads`'s "admits
/// nothing" behavior for an empty ACL list.
pub async fn acl_filtered_search(
    client: &dyn VectorStoreClient,
    collection: &str,
    product_id: &str,
    version: u32,
    user_acls: &[Acl],
    query_vector: &[f32],
    limit: usize,
    score_threshold: Option<f32>,
) -> Result<AclFilteredQuery> {
    if user_acls.is_empty() {
        return Ok(AclFilteredQuery {
            hits: Vec::new(),
            acl_applied: true,
            candidates_scanned: 0,
            candidates_admitted: 0,
        });
    }

    let scope_filter = scope_filter(product_id, version);
    let candidates = scroll_all(client, collection, &scope_filter).await?;
    let candidates_scanned = candidates.len();

    let admitted = apply_acl_filter_to_payloads(&candidates, user_acls, product_id);
    let candidates_admitted = admitted.len();
    if admitted.is_empty() {
        return Ok(AclFilteredQuery {
            hits: Vec::new(),
            acl_applied: true,
            candidates_scanned,
            candidates_admitted,
        });
    }

    let chunk_ids: Vec<serde_json::Value> = admitted.iter().map(|p| json!(p.chunk_id)).collect();
    let mut chunk_filter = scope_filter.clone();
    chunk_filter.must_in.insert("chunk_id".to_string(), chunk_ids);

    let hits = client
        .search_points(collection, query_vector, limit, score_threshold, Some(&chunk_filter))
        .await?;

    Ok(AclFilteredQuery {
        hits,
        acl_applied: true,
        candidates_scanned,
        candidates_admitted,
    })
}

fn scope_filter(product_id: &str, version: u32) -> SearchFilter {
    let mut filter = SearchFilter::default();
    filter.must_eq.insert("product_id".to_string(), json!(product_id));
    filter.must_eq.insert("version".to_string(), json!(version));
    filter
}

async fn scroll_all(
    client: &dyn VectorStoreClient,
    collection: &str,
    filter: &SearchFilter,
) -> Result<Vec<VectorPayload>> {
    let mut all = Vec::new();
    let mut offset = None;
    loop {
        let (page, next) = client
            .scroll_points(collection, SCROLL_PAGE_SIZE, offset, Some(filter))
            .await?;
        let page_len = page.len();
        all.extend(page);
        match next {
            Some(next_offset) if page_len == SCROLL_PAGE_SIZE => offset = Some(next_offset),
            _ => break,
        }
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AclAccessType, VectorPoint};
    use crate::vector_store::{CollectionInfo, Distance};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeStore {
        points: Mutex<HashMap<String, Vec<(VectorPayload, Vec<f32>)>>>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self { points: Mutex::new(HashMap::new()) }
        }

        fn seed(&self, collection: &str, payload: VectorPayload, vector: Vec<f32>) {
            self.points
                .lock()
                .unwrap()
                .entry(collection.to_string())
                .or_default()
                .push((payload, vector));
        }
    }

    #[async_trait]
    impl VectorStoreClient for FakeStore {
        async fn ensure_collection(&self, _name: &str, _size: u32, _distance: Distance) -> Result<()> {
            Ok(())
        }

        async fn upsert_points(&self, _name: &str, _points: &[VectorPoint]) -> Result<()> {
            Ok(())
        }

        async fn search_points(
            &self,
            name: &str,
            _query_vector: &[f32],
            limit: usize,
            _score_threshold: Option<f32>,
            filter: Option<&SearchFilter>,
        ) -> Result<Vec<SearchResult>> {
            let guard = self.points.lock().unwrap();
            let empty = Vec::new();
            let points = guard.get(name).unwrap_or(&empty);
            let allowed_ids: Option<Vec<String>> = filter.and_then(|f| {
                f.must_in.get("chunk_id").map(|vs| {
                    vs.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
                })
            });
            let mut hits: Vec<SearchResult> = points
                .iter()
                .filter(|(p, _)| allowed_ids.as_ref().map_or(true, |ids| ids.contains(&p.chunk_id)))
                .map(|(p, _)| SearchResult { id: 1, score: 0.9, payload: p.clone() })
                .collect();
            hits.truncate(limit);
            Ok(hits)
        }

        async fn scroll_points(
            &self,
            name: &str,
            _limit: usize,
            _offset: Option<u64>,
            filter: Option<&SearchFilter>,
        ) -> Result<(Vec<VectorPayload>, Option<u64>)> {
            let guard = self.points.lock().unwrap();
            let empty = Vec::new();
            let points = guard.get(name).unwrap_or(&empty);
            let product_filter = filter.and_then(|f| f.must_eq.get("product_id")).and_then(|v| v.as_str());
            let payloads = points
                .iter()
                .filter(|(p, _)| product_filter.map_or(true, |pid| p.product_id == pid))
                .map(|(p, _)| p.clone())
                .collect();
            Ok((payloads, None))
        }

        async fn get_collection_info(&self, _name: &str) -> Result<Option<CollectionInfo>> {
            Ok(None)
        }

        async fn set_prod_alias(&self, _alias_name: &str, _collection_name: &str) -> Result<()> {
            Ok(())
        }

        async fn get_prod_alias_collection(&self, _alias_name: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn payload(chunk_id: &str, product_id: &str, document_id: &str) -> VectorPayload {
        VectorPayload {
            chunk_id: chunk_id.to_string(),
            filename: "f.jsonl".to_string(),
            source_file: "f.jsonl".to_string(),
            document_id: document_id.to_string(),
            page: None,
            page_number: None,
            section: "general".to_string(),
            field_name: None,
            score: 80.0,
            text: "hello".to_string(),
            text_length: 5,
            product_id: product_id.to_string(),
            version: 1,
            collection_id: "c".to_string(),
            created_at: Utc::now(),
            doc_scope: None,
            field_scope: None,
            tags: Vec::new(),
            token_est: 2,
        }
    }

    #[tokio::test]
    async fn empty_acl_list_admits_nothing_without_searching() {
        let store = FakeStore::new();
        store.seed("c1", payload("chunk1", "p1", "DocA"), vec![0.1, 0.2]);
        let result = acl_filtered_search(&store, "c1", "p1", 1, &[], &[0.1, 0.2], 10, None)
            .await
            .unwrap();
        assert!(result.hits.is_empty());
        assert!(result.acl_applied);
        assert_eq!(result.candidates_scanned, 0);
    }

    #[tokio::test]
    async fn document_scope_restricts_search_to_admitted_chunk_ids() {
        let store = FakeStore::new();
        store.seed("c1", payload("chunk-a", "p1", "DocA"), vec![0.1, 0.2]);
        store.seed("c1", payload("chunk-b", "p1", "DocB"), vec![0.1, 0.2]);
        store.seed("c1", payload("chunk-c", "p1", "DocC"), vec![0.1, 0.2]);

        let acls = vec![Acl {
            user_id: "u1".to_string(),
            product_id: "p1".to_string(),
            access_type: AclAccessType::Document,
            index_scope: None,
            doc_scope: Some("DocA,DocC".to_string()),
            field_scope: None,
        }];

        let result = acl_filtered_search(&store, "c1", "p1", 1, &acls, &[0.1, 0.2], 10, None)
            .await
            .unwrap();

        assert!(result.acl_applied);
        assert_eq!(result.candidates_scanned, 3);
        assert_eq!(result.candidates_admitted, 2);
        let docs: std::collections::HashSet<_> =
            result.hits.iter().map(|h| h.payload.document_id.clone()).collect();
        assert_eq!(docs, std::collections::HashSet::from(["DocA".to_string(), "DocC".to_string()]));
    }
}
