//! Error taxonomy for the ingestion pipeline

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, AirdError>;

/// Top-level error type, composed from per-concern error enums
#[derive(Error, Debug)]
pub enum AirdError {
    #[error("object store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("input missing: {0}")]
    InputMissing(String),

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("external service error: {0}")]
    ExternalService(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("degraded: {0}")]
    Degraded(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("generic error: {0}")]
    Generic(#[from] anyhow::Error),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Errors related to the object store adapter
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("bucket {0} not available")]
    BucketUnavailable(String),

    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("failed to presign {bucket}/{key}: {reason}")]
    PresignFailed { bucket: String, key: String, reason: String },

    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors related to the vector store client
#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("dimension mismatch: collection {collection} expects {expected}, got {actual}")]
    DimensionMismatch {
        collection: String,
        expected: u32,
        actual: u32,
    },

    #[error("alias target collection missing: {0}")]
    AliasTargetMissing(String),

    #[error("request failed: {0}")]
    RequestFailed(String),
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("missing API key for model {0}")]
    MissingApiKey(String),

    #[error("provider request failed: {0}")]
    ProviderFailed(String),
}

/// Errors related to configuration and playbook resolution
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown playbook id: {0}")]
    UnknownPlaybook(String),

    #[error("unknown embedding model: {0}")]
    UnknownEmbeddingModel(String),

    #[error(
        "collection dimension {collection_dim} does not match product embedding config \
         dimension {config_dim} (strict mode)"
    )]
    DimensionConflict { collection_dim: u32, config_dim: u32 },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl AirdError {
    /// Whether retrying the operation that produced this error is worthwhile.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AirdError::Http(_)
                | AirdError::ExternalService(_)
                | AirdError::ObjectStore(ObjectStoreError::Backend(_))
                | AirdError::VectorStore(VectorStoreError::RequestFailed(_))
                | AirdError::Embedding(EmbeddingError::ProviderFailed(_))
        )
    }

    /// Error category for stage-result reporting and logging.
    pub fn category(&self) -> &'static str {
        match self {
            AirdError::ObjectStore(_) => "object_store",
            AirdError::VectorStore(_) => "vector_store",
            AirdError::Embedding(_) => "embedding",
            AirdError::InputMissing(_) => "input_missing",
            AirdError::Integrity(_) => "integrity",
            AirdError::ExternalService(_) => "external_service",
            AirdError::Config(_) => "config",
            AirdError::PolicyViolation(_) => "policy_violation",
            AirdError::Degraded(_) => "degraded",
            AirdError::Io(_) => "io",
            AirdError::Serialization(_) => "serialization",
            AirdError::Http(_) => "http",
            AirdError::Database(_) => "database",
            AirdError::Generic(_) => "generic",
            AirdError::NotFound(_) => "not_found",
        }
    }
}
