//! AI-Ready Dataset pipeline
//!
//! Ingests raw documents through an ordered sequence of stages —
//! preprocessing, scoring, fingerprinting, policy evaluation, vector
//! indexing, validation, and trust reporting — producing a scored,
//! policy-gated, embedded dataset ready for retrieval.
//!
//! # Example
//!
//! ```rust,no_run
//! use aird_core::config::RuntimeConfig;
//! use aird_core::runtime::Runtime;
//! use aird_core::pipeline::PipelineRunner;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RuntimeConfig::load(Some("aird.toml"))?;
//!     let runtime = Arc::new(Runtime::from_config(&config).await?);
//!     let runner = PipelineRunner::new(runtime, config);
//!     let run = runner
//!         .run_all("ws1", "widgets", 1, &["doc1".to_string()], None)
//!         .await?;
//!     println!("run finished with status {:?}", run.status);
//!     Ok(())
//! }
//! ```

pub mod acl;
pub mod analyzer;
pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod models;
pub mod object_store;
pub mod path;
pub mod pdf;
pub mod pipeline;
pub mod playbook;
pub mod query;
pub mod registry;
pub mod runtime;
pub mod storage_view;
pub mod vector_store;

pub use config::RuntimeConfig;
pub use error::{AirdError, Result};
pub use models::{
    Acl, ArtifactRef, ArtifactStatus, ArtifactType, Fingerprint, MetricRecord, PipelineArtifact,
    PipelineRun, PipelineRunMetrics, PipelineRunStatus, PolicyResult, PolicyStatus,
    PolicyThresholds, ProcessedRecord, RawFileStatus, RetentionPolicy, VectorPayload, VectorPoint,
};
pub use pipeline::{PipelineRunner, Stage, StageResult, StageStatus};
pub use playbook::{resolve_playbook_file, route_playbook, Playbook};
pub use registry::{ArtifactRegistry, SqliteArtifactRegistry};
pub use runtime::Runtime;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with(char::is_numeric));
    }
}
