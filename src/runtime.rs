//! Bundles the trait-object backends a pipeline run is executed against,
//! constructed once from [`RuntimeConfig`] and shared across stages.

use crate::config::{RuntimeConfig, StorageBackendKind};
use crate::object_store::{CloudObjectStore, LocalObjectStore, ObjectStore};
use crate::registry::{ArtifactRegistry, SqliteArtifactRegistry};
use crate::vector_store::qdrant::QdrantClient;
use crate::vector_store::VectorStoreClient;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

/// The set of live backends a [`crate::pipeline::PipelineRunner`] drives
/// stages against. `db` is a raw pool alongside `registry`'s own connection,
/// for diagnostic queries (e.g. a CLI `status` command) that don't belong on
/// the [`ArtifactRegistry`] trait surface.
pub struct Runtime {
    pub object_store: Arc<dyn ObjectStore>,
    pub vector_store: Arc<dyn VectorStoreClient>,
    pub registry: Arc<dyn ArtifactRegistry>,
    pub db: SqlitePool,
}

impl Runtime {
    /// Constructs every backend from `config`, selecting the object store
    /// implementation by [`StorageBackendKind`].
    pub async fn from_config(config: &RuntimeConfig) -> anyhow::Result<Self> {
        let object_store: Arc<dyn ObjectStore> = match config.storage.backend_kind()? {
            StorageBackendKind::Local => Arc::new(LocalObjectStore::new(&config.storage.local_root)),
            StorageBackendKind::S3 => Arc::new(CloudObjectStore::new_s3(
                config.storage.s3_endpoint.clone(),
                config
                    .storage
                    .s3_bucket
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("storage.s3_bucket is required for the s3 backend"))?,
                config.storage.s3_region.clone(),
                config.storage.s3_access_key_id.clone(),
                config.storage.s3_secret_access_key.clone(),
            )?),
            StorageBackendKind::Gcs => Arc::new(CloudObjectStore::new_gcs(
                config
                    .storage
                    .gcs_bucket
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("storage.gcs_bucket is required for the gcs backend"))?,
            )?),
            StorageBackendKind::Azure => Arc::new(CloudObjectStore::new_azure(
                config
                    .storage
                    .azure_account
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("storage.azure_account is required for the azure backend"))?,
                config
                    .storage
                    .azure_container
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("storage.azure_container is required for the azure backend"))?,
            )?),
        };

        let vector_store: Arc<dyn VectorStoreClient> =
            Arc::new(QdrantClient::new(&config.vector_store.host, config.vector_store.port));

        let sqlite_registry = SqliteArtifactRegistry::connect(&config.registry.database_url).await?;
        let registry: Arc<dyn ArtifactRegistry> = Arc::new(sqlite_registry);

        let db = SqlitePool::connect(&normalize_sqlite_url(&config.registry.database_url)).await?;

        Ok(Self {
            object_store,
            vector_store,
            registry,
            db,
        })
    }
}

fn normalize_sqlite_url(database_url: &str) -> String {
    if database_url.contains('?') {
        database_url.to_string()
    } else {
        format!("{database_url}?mode=rwc")
    }
}
