//! Playbook loading and routing: per-domain defaults for chunking,
//! preprocessing flags, and optimization mode.

use crate::analyzer::content_type::{detect_content_type, ContentType};
use crate::error::{AirdError, ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_max_tokens() -> u32 {
    900
}

fn default_overlap_tokens() -> u32 {
    180
}

fn default_min_tokens() -> u32 {
    100
}

fn default_strategy() -> String {
    "fixed_size".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub max_tokens: u32,
    pub overlap_tokens: u32,
    pub min_tokens: u32,
    pub strategy: String,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            overlap_tokens: default_overlap_tokens(),
            min_tokens: default_min_tokens(),
            strategy: default_strategy(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingFlags {
    pub enhanced_normalization: bool,
    pub strip_boilerplate: bool,
}

fn default_top_k() -> u32 {
    10
}

fn default_max_queries() -> u32 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: u32,
    pub max_queries: u32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_queries: default_max_queries(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagEvaluation {
    pub retrieval_settings: RetrievalSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Playbook {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub chunking: ChunkingSettings,
    #[serde(default)]
    pub preprocessing_flags: PreprocessingFlags,
    #[serde(default)]
    pub heading_patterns: Vec<String>,
    #[serde(default)]
    pub noise_patterns: Vec<String>,
    #[serde(default)]
    pub rag_evaluation: RagEvaluation,
}

impl Default for Playbook {
    fn default() -> Self {
        Self {
            id: "general".to_string(),
            display_name: "General".to_string(),
            chunking: ChunkingSettings::default(),
            preprocessing_flags: PreprocessingFlags::default(),
            heading_patterns: Vec::new(),
            noise_patterns: Vec::new(),
            rag_evaluation: RagEvaluation::default(),
        }
    }
}

/// Reads `{playbook_dir}/{id}.yaml` and parses it into a `Playbook`. Missing
/// fields fall back to the conservative defaults above.
pub fn resolve_playbook_file(playbook_dir: &Path, id: &str) -> Result<Playbook> {
    let path = playbook_dir.join(format!("{id}.yaml"));
    let raw = std::fs::read_to_string(&path)
        .map_err(|_| AirdError::Config(ConfigError::UnknownPlaybook(id.to_string())))?;
    let playbook: Playbook = serde_yml::from_str(&raw)
        .map_err(|e| AirdError::Config(ConfigError::Invalid(format!("playbook {id}: {e}"))))?;
    Ok(playbook)
}

/// Chooses among TECH, SCANNED, REGULATORY playbooks using the content
/// analyzer's pattern tables, used when a product has no explicit playbook.
pub fn route_playbook(sample_text: &str, filename: Option<&str>) -> &'static str {
    let detection = detect_content_type(sample_text, filename, None);
    match detection.content_type {
        ContentType::Regulatory | ContentType::FinanceBanking | ContentType::Legal => "regulatory",
        ContentType::General if filename.map(|f| f.to_lowercase().ends_with(".pdf")).unwrap_or(false) => {
            "scanned"
        }
        _ => "tech",
    }
}
