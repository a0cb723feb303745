//! Filesystem-backed object store, used for local development and tests.

use super::{not_found, ObjectMeta, ObjectStore, DEFAULT_BUCKETS};
use crate::error::{AirdError, ObjectStoreError, Result};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tracing::{info, warn};

/// Stores buckets as subdirectories of a root directory. Presigned URLs are a
/// `file://` path with an HMAC-like token appended for parity with the cloud
/// backend's signature scheme; `verify_presigned` is provided for tests.
pub struct LocalObjectStore {
    root: PathBuf,
    buckets_ensured: AtomicBool,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            buckets_ensured: AtomicBool::new(false),
        }
    }

    async fn ensure_buckets(&self) {
        if self.buckets_ensured.load(Ordering::Acquire) {
            return;
        }
        for bucket in DEFAULT_BUCKETS {
            let path = self.root.join(bucket);
            if let Err(e) = fs::create_dir_all(&path).await {
                warn!("failed to create local bucket {bucket}: {e}");
            }
        }
        self.buckets_ensured.store(true, Ordering::Release);
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<()> {
        self.ensure_buckets().await;
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &data).await?;
        info!("wrote {} bytes to {bucket}/{key}", data.len());
        Ok(())
    }

    async fn get_bytes(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_buckets().await;
        let path = self.object_path(bucket, key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>> {
        self.ensure_buckets().await;
        let base = self.root.join(bucket);
        let mut out = Vec::new();
        collect_objects(&base, &base.join(prefix), &mut out).await?;
        Ok(out)
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        self.ensure_buckets().await;
        Ok(fs::metadata(self.object_path(bucket, key)).await.is_ok())
    }

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        expiry_secs: u64,
        inline: bool,
    ) -> Result<String> {
        self.ensure_buckets().await;
        if !self.object_exists(bucket, key).await? {
            return Err(not_found(bucket, key));
        }
        let expires_at = Utc::now().timestamp() + expiry_secs as i64;
        let token = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(format!("{bucket}:{key}:{expires_at}"));
        let disposition = if inline { "inline" } else { "attachment" };
        Ok(format!(
            "file://{}/{bucket}/{key}?token={token}&disposition={disposition}",
            self.root.display()
        ))
    }

    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()> {
        self.ensure_buckets().await;
        let data = self
            .get_bytes(source_bucket, source_key)
            .await?
            .ok_or_else(|| not_found(source_bucket, source_key))?;
        self.put_bytes(dest_bucket, dest_key, data, None).await
    }
}

/// Decode and check the expiry of a URL produced by [`LocalObjectStore::presigned_url`].
/// Used only by tests of the presigned-URL round-trip law.
pub fn verify_presigned(url: &str) -> Result<bool> {
    let token = url
        .split("token=")
        .nth(1)
        .and_then(|rest| rest.split('&').next())
        .ok_or_else(|| {
            AirdError::ObjectStore(ObjectStoreError::Backend("malformed presigned url".into()))
        })?;
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| AirdError::ObjectStore(ObjectStoreError::Backend(e.to_string())))?;
    let decoded = String::from_utf8_lossy(&decoded);
    let expires_at: i64 = decoded
        .rsplit(':')
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AirdError::ObjectStore(ObjectStoreError::Backend("bad token".into())))?;
    Ok(Utc::now().timestamp() <= expires_at)
}

fn collect_objects<'a>(
    base: &'a Path,
    dir: &'a Path,
    out: &'a mut Vec<ObjectMeta>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        if !dir.exists() {
            return Ok(());
        }
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_dir() {
                collect_objects(base, &path, out).await?;
            } else {
                let meta = entry.metadata().await?;
                let name = path
                    .strip_prefix(base)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .replace('\\', "/");
                let modified: Option<DateTime<Utc>> =
                    meta.modified().ok().map(DateTime::<Utc>::from);
                out.push(ObjectMeta {
                    name,
                    size: meta.len(),
                    last_modified: modified,
                    etag: None,
                    content_type: None,
                });
            }
        }
        Ok(())
    })
}
