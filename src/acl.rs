//! Access-control filtering over vector-store payloads.
//!
//! Vector points carry the sole copy of chunk metadata (see
//! [`crate::models::VectorPayload`]); ACL checks read that payload directly
//! rather than consulting a separate catalog.

use crate::models::{Acl, AclAccessType, VectorPayload};
use std::collections::HashSet;

/// Filters `points` down to those a user's ACLs admit, deduplicated by
/// `chunk_id` (first occurrence wins). An empty ACL list admits nothing.
pub fn apply_acl_filter_to_payloads(
    points: &[VectorPayload],
    user_acls: &[Acl],
    product_id: &str,
) -> Vec<VectorPayload> {
    if user_acls.is_empty() {
        return Vec::new();
    }

    let mut allowed = Vec::new();

    for payload in points {
        let document_id = if payload.document_id.is_empty() {
            payload.doc_scope.clone()
        } else {
            Some(payload.document_id.clone())
        };
        let field_name = payload.field_name.clone().or_else(|| payload.field_scope.clone());

        for acl in user_acls {
            match acl.access_type {
                AclAccessType::Full => {
                    allowed.push(payload.clone());
                    break;
                }
                AclAccessType::Index => {
                    if let Some(scope) = &acl.index_scope {
                        let scope_ids: Vec<&str> = scope.split(',').map(str::trim).collect();
                        if scope_ids.contains(&payload.product_id.as_str()) || scope_ids.contains(&product_id) {
                            allowed.push(payload.clone());
                            break;
                        }
                    }
                }
                AclAccessType::Document => {
                    if let (Some(scope), Some(document_id)) = (&acl.doc_scope, document_id.as_deref()) {
                        let scope_docs: Vec<&str> = scope.split(',').map(str::trim).collect();
                        if scope_docs.contains(&document_id) {
                            allowed.push(payload.clone());
                            break;
                        }
                    }
                }
                AclAccessType::Field => {
                    if let (Some(scope), Some(field_name)) = (&acl.field_scope, field_name.as_deref()) {
                        let field_lower = field_name.trim().to_lowercase();
                        let matches = scope
                            .split(',')
                            .map(|s| s.trim().to_lowercase())
                            .any(|scope_field| scope_field.contains(&field_lower) || field_lower.contains(&scope_field));
                        if matches {
                            allowed.push(payload.clone());
                            break;
                        }
                    }
                }
            }
        }
    }

    let mut seen = HashSet::new();
    allowed
        .into_iter()
        .filter(|payload| seen.insert(payload.chunk_id.clone()))
        .collect()
}

/// Extracts the set of chunk ids present in `payloads`.
pub fn get_allowed_chunk_ids_from_payloads(payloads: &[VectorPayload]) -> HashSet<String> {
    payloads.iter().map(|p| p.chunk_id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn payload(chunk_id: &str, product_id: &str, document_id: &str, field_name: &str) -> VectorPayload {
        VectorPayload {
            chunk_id: chunk_id.to_string(),
            filename: "f.jsonl".to_string(),
            source_file: "f.jsonl".to_string(),
            document_id: document_id.to_string(),
            page: None,
            page_number: None,
            section: "general".to_string(),
            field_name: Some(field_name.to_string()),
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

    #[test]
    fn test_empty_acls_returns_empty() {
        let points = vec![payload("c1", "p1", "DocA", "body")];
        let result = apply_acl_filter_to_payloads(&points, &[], "p1");
        assert!(result.is_empty());
    }

    #[test]
    fn test_full_access_admits_all() {
        let points = vec![payload("c1", "p1", "DocA", "body"), payload("c2", "p1", "DocB", "body")];
        let acls = vec![Acl {
            user_id: "u1".to_string(),
            product_id: "p1".to_string(),
            access_type: AclAccessType::Full,
            index_scope: None,
            doc_scope: None,
            field_scope: None,
        }];
        let result = apply_acl_filter_to_payloads(&points, &acls, "p1");
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_document_scope_filters_by_document_id() {
        let points = vec![
            payload("c1", "p1", "DocA", "body"),
            payload("c2", "p1", "DocB", "body"),
            payload("c3", "p1", "DocC", "body"),
        ];
        let acls = vec![Acl {
            user_id: "u1".to_string(),
            product_id: "p1".to_string(),
            access_type: AclAccessType::Document,
            index_scope: None,
            doc_scope: Some("DocA,DocC".to_string()),
            field_scope: None,
        }];
        let result = apply_acl_filter_to_payloads(&points, &acls, "p1");
        let ids: HashSet<_> = result.iter().map(|p| p.document_id.as_str()).collect();
        assert_eq!(ids, HashSet::from(["DocA", "DocC"]));
    }

    #[test]
    fn test_field_scope_case_insensitive_substring_either_direction() {
        let points = vec![payload("c1", "p1", "DocA", "Billing_Address")];
        let acls = vec![Acl {
            user_id: "u1".to_string(),
            product_id: "p1".to_string(),
            access_type: AclAccessType::Field,
            index_scope: None,
            doc_scope: None,
            field_scope: Some("billing".to_string()),
        }];
        let result = apply_acl_filter_to_payloads(&points, &acls, "p1");
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_dedup_by_chunk_id_preserves_first() {
        let points = vec![payload("c1", "p1", "DocA", "body")];
        let acls = vec![
            Acl {
                user_id: "u1".to_string(),
                product_id: "p1".to_string(),
                access_type: AclAccessType::Full,
                index_scope: None,
                doc_scope: None,
                field_scope: None,
            },
            Acl {
                user_id: "u1".to_string(),
                product_id: "p1".to_string(),
                access_type: AclAccessType::Full,
                index_scope: None,
                doc_scope: None,
                field_scope: None,
            },
        ];
        let result = apply_acl_filter_to_payloads(&points, &acls, "p1");
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_get_allowed_chunk_ids_from_payloads() {
        let payloads = vec![payload("c1", "p1", "DocA", "body"), payload("c2", "p1", "DocB", "body")];
        let ids = get_allowed_chunk_ids_from_payloads(&payloads);
        assert_eq!(ids, HashSet::from(["c1".to_string(), "c2".to_string()]));
    }
}
