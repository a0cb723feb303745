//! Uniform byte/JSON object store interface over a pluggable backend.

mod cloud;
mod local;

pub use cloud::CloudObjectStore;
pub use local::LocalObjectStore;

use crate::error::{AirdError, ObjectStoreError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub name: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub content_type: Option<String>,
}

/// Backend-agnostic object storage adapter.
///
/// Bucket existence is ensured lazily on first use of an instance, never at
/// construction time, so that process startup never blocks on storage
/// availability.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<()>;

    async fn put_json<T>(&self, bucket: &str, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
        Self: Sized,
    {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.put_bytes(bucket, key, bytes, Some("application/json")).await
    }

    async fn get_bytes(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>>;

    async fn get_json<T>(&self, bucket: &str, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        Self: Sized,
    {
        match self.get_bytes(bucket, key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>>;

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool>;

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        expiry_secs: u64,
        inline: bool,
    ) -> Result<String>;

    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()>;
}

/// The default set of buckets the pipeline writes into. Names intentionally
/// mirror the stage-view prefixes in `path.rs`, one bucket per data tier.
pub const DEFAULT_BUCKETS: &[&str] = &[
    "aird-raw",
    "aird-clean",
    "aird-chunk",
    "aird-embed",
    "aird-exports",
    "aird-config",
];

pub(crate) fn not_found(bucket: &str, key: &str) -> AirdError {
    AirdError::ObjectStore(ObjectStoreError::NotFound {
        bucket: bucket.to_string(),
        key: key.to_string(),
    })
}
