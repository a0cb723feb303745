//! SQLite-backed lineage and retention registry for pipeline artifacts.

use crate::error::{AirdError, Result};
use crate::models::{ArtifactRef, ArtifactStatus, ArtifactType, PipelineArtifact, RetentionPolicy};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[async_trait]
pub trait ArtifactRegistry: Send + Sync {
    async fn initialize(&self) -> Result<()>;

    async fn record(&self, artifact: PipelineArtifact) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<PipelineArtifact>>;

    /// All artifacts for a `(workspace, product, version)` scope, optionally
    /// filtered to a single stage.
    async fn list_for_version(
        &self,
        workspace: &str,
        product: &str,
        version: u32,
        stage: Option<&str>,
    ) -> Result<Vec<PipelineArtifact>>;

    /// Walks `input_artifacts` transitively to compute the full lineage
    /// closure feeding a given artifact.
    async fn lineage(&self, id: &str) -> Result<Vec<PipelineArtifact>>;

    async fn mark_deleted(&self, id: &str) -> Result<()>;

    /// Marks every active artifact of a `(workspace, product, version)` scope
    /// `keep_forever`, called on promotion so the artifacts backing a
    /// production version are exempt from the reaper.
    async fn promote_retention(&self, workspace: &str, product: &str, version: u32) -> Result<()>;

    /// Soft-deletes artifacts whose retention window has elapsed, then
    /// purges soft-deleted artifacts past a grace period. Returns the ids
    /// that were purged.
    async fn reap_expired(&self, now: DateTime<Utc>, purge_grace: Duration) -> Result<Vec<String>>;
}

pub struct SqliteArtifactRegistry {
    pool: SqlitePool,
}

impl SqliteArtifactRegistry {
    pub async fn connect(database_url: &str) -> Result<Self> {
        if let Some(db_path) = database_url.strip_prefix("sqlite:") {
            let db_path = db_path.split('?').next().unwrap_or(db_path);
            if let Some(parent) = std::path::Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        let database_url = if database_url.contains('?') {
            database_url.to_string()
        } else {
            format!("{database_url}?mode=rwc")
        };
        let pool = SqlitePool::connect(&database_url).await?;
        let registry = Self { pool };
        registry.initialize().await?;
        Ok(registry)
    }

    fn row_to_artifact(row: &sqlx::sqlite::SqliteRow) -> Result<PipelineArtifact> {
        let input_artifacts_json: String = row.try_get("input_artifacts")?;
        let metadata_json: String = row.try_get("artifact_metadata")?;
        let status: String = row.try_get("status")?;
        let retention: String = row.try_get("retention")?;
        let artifact_type: String = row.try_get("artifact_type")?;
        Ok(PipelineArtifact {
            id: row.try_get("id")?,
            run_id: row.try_get("run_id")?,
            workspace: row.try_get("workspace")?,
            product: row.try_get("product")?,
            version: row.try_get::<i64, _>("version")? as u32,
            stage_name: row.try_get("stage_name")?,
            artifact_type: serde_json::from_value(serde_json::Value::String(artifact_type))
                .unwrap_or(ArtifactType::Binary),
            artifact_name: row.try_get("artifact_name")?,
            bucket: row.try_get("bucket")?,
            key: row.try_get("key")?,
            size: row.try_get::<i64, _>("size")? as u64,
            checksum: row.try_get("checksum")?,
            input_artifacts: serde_json::from_str(&input_artifacts_json).unwrap_or_default(),
            artifact_metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
            status: serde_json::from_value(serde_json::Value::String(status))
                .unwrap_or(ArtifactStatus::Active),
            retention: serde_json::from_value(serde_json::Value::String(retention))
                .unwrap_or(RetentionPolicy::Days90),
            created_at: row.try_get("created_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

#[async_trait]
impl ArtifactRegistry for SqliteArtifactRegistry {
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS artifacts (
                id TEXT PRIMARY KEY,
                run_id TEXT NOT NULL,
                workspace TEXT NOT NULL,
                product TEXT NOT NULL,
                version INTEGER NOT NULL,
                stage_name TEXT NOT NULL,
                artifact_type TEXT NOT NULL,
                artifact_name TEXT NOT NULL,
                bucket TEXT NOT NULL,
                key TEXT NOT NULL,
                size INTEGER NOT NULL,
                checksum TEXT NOT NULL,
                input_artifacts TEXT NOT NULL DEFAULT '[]',
                artifact_metadata TEXT NOT NULL DEFAULT '{}',
                status TEXT NOT NULL,
                retention TEXT NOT NULL,
                created_at TEXT NOT NULL,
                deleted_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_artifacts_scope ON artifacts(workspace, product, version)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record(&self, artifact: PipelineArtifact) -> Result<()> {
        let input_artifacts_json = serde_json::to_string(&artifact.input_artifacts)?;
        let metadata_json = serde_json::to_string(&artifact.artifact_metadata)?;
        sqlx::query(
            r#"
            INSERT INTO artifacts (
                id, run_id, workspace, product, version, stage_name, artifact_type,
                artifact_name, bucket, key, size, checksum, input_artifacts,
                artifact_metadata, status, retention, created_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                deleted_at = excluded.deleted_at
            "#,
        )
        .bind(&artifact.id)
        .bind(&artifact.run_id)
        .bind(&artifact.workspace)
        .bind(&artifact.product)
        .bind(artifact.version as i64)
        .bind(&artifact.stage_name)
        .bind(serde_json::to_value(artifact.artifact_type)?.as_str().unwrap_or("binary"))
        .bind(&artifact.artifact_name)
        .bind(&artifact.bucket)
        .bind(&artifact.key)
        .bind(artifact.size as i64)
        .bind(&artifact.checksum)
        .bind(input_artifacts_json)
        .bind(metadata_json)
        .bind(serde_json::to_value(artifact.status)?.as_str().unwrap_or("active"))
        .bind(serde_json::to_value(artifact.retention)?.as_str().unwrap_or("days_90"))
        .bind(artifact.created_at)
        .bind(artifact.deleted_at)
        .execute(&self.pool)
        .await?;

        debug!("recorded artifact {}", artifact.id);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<PipelineArtifact>> {
        let row = sqlx::query("SELECT * FROM artifacts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_artifact).transpose()
    }

    async fn list_for_version(
        &self,
        workspace: &str,
        product: &str,
        version: u32,
        stage: Option<&str>,
    ) -> Result<Vec<PipelineArtifact>> {
        let rows = if let Some(stage) = stage {
            sqlx::query(
                "SELECT * FROM artifacts WHERE workspace = ?1 AND product = ?2 AND version = ?3 \
                 AND stage_name = ?4 AND status != 'purged' ORDER BY created_at ASC",
            )
            .bind(workspace)
            .bind(product)
            .bind(version as i64)
            .bind(stage)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT * FROM artifacts WHERE workspace = ?1 AND product = ?2 AND version = ?3 \
                 AND status != 'purged' ORDER BY created_at ASC",
            )
            .bind(workspace)
            .bind(product)
            .bind(version as i64)
            .fetch_all(&self.pool)
            .await?
        };
        rows.iter().map(Self::row_to_artifact).collect()
    }

    async fn lineage(&self, id: &str) -> Result<Vec<PipelineArtifact>> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut frontier = vec![id.to_string()];
        let mut out = Vec::new();

        while let Some(current_id) = frontier.pop() {
            if !seen.insert(current_id.clone()) {
                continue;
            }
            let Some(artifact) = self.get(&current_id).await? else {
                warn!("lineage references missing artifact {current_id}");
                continue;
            };
            for input in &artifact.input_artifacts {
                frontier.push(input.artifact_id.clone());
            }
            out.push(artifact);
        }

        Ok(out)
    }

    async fn mark_deleted(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE artifacts SET status = 'deleted', deleted_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn promote_retention(&self, workspace: &str, product: &str, version: u32) -> Result<()> {
        sqlx::query(
            "UPDATE artifacts SET retention = 'keep_forever' \
             WHERE workspace = ?1 AND product = ?2 AND version = ?3 AND status = 'active'",
        )
        .bind(workspace)
        .bind(product)
        .bind(version as i64)
        .execute(&self.pool)
        .await?;
        info!("promoted retention to keep_forever for {workspace}/{product}/v{version}");
        Ok(())
    }

    async fn reap_expired(&self, now: DateTime<Utc>, purge_grace: Duration) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT * FROM artifacts WHERE status = 'active'")
            .fetch_all(&self.pool)
            .await?;

        let mut to_soft_delete = Vec::new();
        for row in &rows {
            let artifact = Self::row_to_artifact(row)?;
            let expiry = retention_expiry(&artifact, now);
            if let Some(expiry) = expiry {
                if now >= expiry {
                    to_soft_delete.push(artifact.id.clone());
                }
            }
        }
        for id in &to_soft_delete {
            self.mark_deleted(id).await?;
            info!("soft-deleted expired artifact {id}");
        }

        let purge_cutoff = now - purge_grace;
        let rows = sqlx::query("SELECT id, deleted_at FROM artifacts WHERE status = 'deleted'")
            .fetch_all(&self.pool)
            .await?;
        let mut purged = Vec::new();
        for row in rows {
            let id: String = row.try_get("id")?;
            let deleted_at: Option<DateTime<Utc>> = row.try_get("deleted_at")?;
            if let Some(deleted_at) = deleted_at {
                if deleted_at <= purge_cutoff {
                    sqlx::query("UPDATE artifacts SET status = 'purged' WHERE id = ?1")
                        .bind(&id)
                        .execute(&self.pool)
                        .await?;
                    purged.push(id);
                }
            }
        }
        Ok(purged)
    }
}

/// Computes the absolute retention expiry of an artifact, or `None` for
/// policies that never expire on their own.
fn retention_expiry(artifact: &PipelineArtifact, _now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match artifact.retention {
        RetentionPolicy::KeepForever => None,
        RetentionPolicy::Days30 => Some(artifact.created_at + Duration::days(30)),
        RetentionPolicy::Days90 => Some(artifact.created_at + Duration::days(90)),
        RetentionPolicy::Days365 => Some(artifact.created_at + Duration::days(365)),
        RetentionPolicy::DeleteOnPromote => None,
        RetentionPolicy::OnFailureKeep90 => Some(artifact.created_at + Duration::days(90)),
    }
}

/// Builds an `ArtifactRef` pointing at a recorded artifact, for embedding in
/// a downstream stage's `input_artifacts`.
pub fn artifact_ref(artifact: &PipelineArtifact) -> ArtifactRef {
    ArtifactRef {
        artifact_id: artifact.id.clone(),
        stage: artifact.stage_name.clone(),
        name: artifact.artifact_name.clone(),
    }
}

pub fn new_artifact_id() -> String {
    Uuid::new_v4().to_string()
}
