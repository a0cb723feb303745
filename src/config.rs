//! Runtime configuration, loaded with layered defaults: built-in defaults,
//! then an optional TOML/JSON/YAML file, then `AIRD_`-prefixed environment
//! variables, following the `config` crate's builder layering.

use crate::models::PolicyThresholds;
use serde::{Deserialize, Serialize};

fn default_storage_backend() -> String {
    "local".to_string()
}

fn default_local_root() -> String {
    "./data".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

fn default_qdrant_host() -> String {
    "localhost".to_string()
}

fn default_qdrant_port() -> u16 {
    6333
}

fn default_playbook_dir() -> String {
    "./playbooks".to_string()
}

fn default_scoring_weights_path() -> String {
    "./playbooks/scoring_weights.json".to_string()
}

fn default_playbook_id() -> String {
    "general".to_string()
}

fn default_score_threshold() -> f64 {
    50.0
}

fn default_embedding_model_name() -> String {
    "minilm".to_string()
}

fn default_database_url() -> String {
    "sqlite://./data/aird.db".to_string()
}

fn default_true() -> bool {
    true
}

/// Which concrete [`crate::object_store::ObjectStore`] backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Local,
    S3,
    Gcs,
    Azure,
}

impl Default for StorageBackendKind {
    fn default() -> Self {
        StorageBackendKind::Local
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    #[serde(default = "default_local_root")]
    pub local_root: String,

    pub s3_endpoint: Option<String>,
    pub s3_bucket: Option<String>,
    #[serde(default = "default_s3_region")]
    pub s3_region: String,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,

    pub gcs_bucket: Option<String>,

    pub azure_account: Option<String>,
    pub azure_container: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            local_root: default_local_root(),
            s3_endpoint: None,
            s3_bucket: None,
            s3_region: default_s3_region(),
            s3_access_key_id: None,
            s3_secret_access_key: None,
            gcs_bucket: None,
            azure_account: None,
            azure_container: None,
        }
    }
}

impl StorageConfig {
    pub fn backend_kind(&self) -> anyhow::Result<StorageBackendKind> {
        match self.backend.to_lowercase().as_str() {
            "local" => Ok(StorageBackendKind::Local),
            "s3" => Ok(StorageBackendKind::S3),
            "gcs" => Ok(StorageBackendKind::Gcs),
            "azure" => Ok(StorageBackendKind::Azure),
            other => Err(anyhow::anyhow!("unknown storage backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_qdrant_host")]
    pub host: String,
    #[serde(default = "default_qdrant_port")]
    pub port: u16,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            host: default_qdrant_host(),
            port: default_qdrant_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model_name")]
    pub model_name: String,
    pub dimension: Option<u32>,
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_embedding_model_name(),
            dimension: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookConfig {
    #[serde(default = "default_playbook_dir")]
    pub playbook_dir: String,
    #[serde(default = "default_scoring_weights_path")]
    pub scoring_weights_path: String,
    #[serde(default = "default_playbook_id")]
    pub default_playbook_id: String,
}

impl Default for PlaybookConfig {
    fn default() -> Self {
        Self {
            playbook_dir: default_playbook_dir(),
            scoring_weights_path: default_scoring_weights_path(),
            default_playbook_id: default_playbook_id(),
        }
    }
}

/// Feature toggles and threshold knobs that shape how the pipeline runs
/// without changing which stages exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,

    #[serde(default)]
    pub policy_thresholds: PolicyThresholds,

    /// Opt-in MinHash near-duplicate chunk removal in the preprocess stage.
    #[serde(default)]
    pub enable_deduplication: bool,

    #[serde(default = "default_true")]
    pub enable_validation: bool,

    #[serde(default = "default_true")]
    pub enable_pdf_reports: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            score_threshold: default_score_threshold(),
            policy_thresholds: PolicyThresholds::default(),
            enable_deduplication: false,
            enable_validation: true,
            enable_pdf_reports: true,
        }
    }
}

/// Top-level runtime configuration: the typed home for every
/// environment/config flag the ingestion pipeline consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub playbooks: PlaybookConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl RuntimeConfig {
    /// Loads configuration layering, in increasing precedence: built-in
    /// defaults, an optional file at `path` (TOML/JSON/YAML by extension),
    /// and `AIRD_`-prefixed environment variables (double underscore as the
    /// nesting separator, e.g. `AIRD_STORAGE__BACKEND=s3`).
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let mut builder =
            ::config::Config::builder().add_source(::config::Config::try_from(&defaults)?);
        if let Some(path) = path {
            if std::path::Path::new(path).exists() {
                builder = builder.add_source(::config::File::with_name(path));
            }
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix("AIRD")
                .separator("__")
                .try_parsing(true),
        );
        let config = builder.build()?;
        let runtime_config: RuntimeConfig = config.try_deserialize()?;
        runtime_config.validate()?;
        Ok(runtime_config)
    }

    /// Load configuration from a file, without the environment-variable layer.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let config = match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yml::from_str(&content)?,
            _ => return Err(anyhow::anyhow!("unsupported config file format")),
        };
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string(self)?,
            Some("yaml") | Some("yml") => serde_yml::to_string(self)?,
            _ => return Err(anyhow::anyhow!("unsupported config file format")),
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.storage.backend_kind()?;

        match self.storage.backend_kind()? {
            StorageBackendKind::S3 if self.storage.s3_bucket.is_none() => {
                return Err(anyhow::anyhow!("s3 storage backend requires storage.s3_bucket"));
            }
            StorageBackendKind::Gcs if self.storage.gcs_bucket.is_none() => {
                return Err(anyhow::anyhow!("gcs storage backend requires storage.gcs_bucket"));
            }
            StorageBackendKind::Azure
                if self.storage.azure_account.is_none() || self.storage.azure_container.is_none() =>
            {
                return Err(anyhow::anyhow!(
                    "azure storage backend requires storage.azure_account and storage.azure_container"
                ));
            }
            _ => {}
        }

        if self.vector_store.host.is_empty() {
            return Err(anyhow::anyhow!("vector_store.host cannot be empty"));
        }

        if self.embedding.model_name.is_empty() {
            return Err(anyhow::anyhow!("embedding.model_name cannot be empty"));
        }

        if self.playbooks.default_playbook_id.is_empty() {
            return Err(anyhow::anyhow!("playbooks.default_playbook_id cannot be empty"));
        }

        if !(0.0..=100.0).contains(&self.pipeline.score_threshold) {
            return Err(anyhow::anyhow!("pipeline.score_threshold must be between 0 and 100"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_s3_backend_without_bucket_fails_validation() {
        let mut config = RuntimeConfig::default();
        config.storage.backend = "s3".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_backend_fails_validation() {
        let mut config = RuntimeConfig::default();
        config.storage.backend = "not-a-backend".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aird.toml");
        let config = RuntimeConfig::default();
        config.to_file(&path).unwrap();
        let loaded = RuntimeConfig::from_file(&path).unwrap();
        assert_eq!(loaded.storage.backend, config.storage.backend);
        assert_eq!(loaded.vector_store.port, config.vector_store.port);
    }

    #[test]
    fn test_score_threshold_out_of_range_fails_validation() {
        let mut config = RuntimeConfig::default();
        config.pipeline.score_threshold = 150.0;
        assert!(config.validate().is_err());
    }
}
