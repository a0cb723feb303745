//! Rule-based optimizer: suggests playbook/config adjustments from a
//! fingerprint and policy result.
//!
//! Ported from the original `optimizer.py`'s `suggest_next_config` rule
//! cascade.

use crate::models::{Fingerprint, PolicyResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizerSuggestion {
    pub next_playbook: Option<String>,
    pub config_tweaks: HashMap<String, serde_json::Value>,
    pub suggestions: Vec<String>,
    pub playbook_recommendations: Vec<String>,
}

/// Suggests a next configuration given `fingerprint` and `policy`, optionally
/// biased by the `current_playbook` id.
pub fn suggest_next_config(
    fingerprint: &Fingerprint,
    policy: &PolicyResult,
    current_playbook: Option<&str>,
) -> OptimizerSuggestion {
    if fingerprint.is_empty() {
        return OptimizerSuggestion {
            next_playbook: current_playbook.map(str::to_string),
            config_tweaks: HashMap::new(),
            suggestions: vec!["No fingerprint data available; run scoring and fingerprint stages first.".to_string()],
            playbook_recommendations: Vec::new(),
        };
    }

    let trust_score = fingerprint.ai_trust_score;
    let completeness = fingerprint.completeness;
    let kb_ready = fingerprint.knowledge_base_ready;
    let secure = fingerprint.secure;
    let metadata = fingerprint.metadata_presence;
    let quality = fingerprint.quality;

    let thresholds = &policy.thresholds;
    let mut suggestions = Vec::new();
    let mut playbook_recommendations = Vec::new();
    let mut config_tweaks: HashMap<String, serde_json::Value> = HashMap::new();
    let mut next_playbook = current_playbook.map(str::to_string);

    let has_violation = |tag: &str| policy.violations.iter().any(|v| v.starts_with(tag));

    if has_violation("low_trust") {
        suggestions.push(format!("AI Trust Score below threshold ({}); review chunking and scoring settings.", thresholds.min_trust_score));
    } else if trust_score < 70.0 {
        suggestions.push("AI Trust Score is moderate; consider tightening chunk boundaries.".to_string());
    } else if trust_score < 85.0 {
        suggestions.push("AI Trust Score is good but could be improved with enhanced normalization.".to_string());
    }

    if has_violation("security_not_full") {
        config_tweaks.insert("redaction_strict".to_string(), serde_json::Value::Bool(true));
        suggestions.push("Security score failed policy; enabling strict redaction is recommended.".to_string());
    } else if secure < 95.0 {
        suggestions.push("Security score is below 95; review PII detection coverage.".to_string());
    } else if secure < 100.0 {
        suggestions.push("Security score is nearly complete; verify remaining redaction markers.".to_string());
    }

    if has_violation("weak_metadata") {
        config_tweaks.insert("force_metadata_extraction".to_string(), serde_json::Value::Bool(true));
        suggestions.push("Metadata presence failed policy; forcing metadata extraction is recommended.".to_string());
    } else if metadata < 85.0 {
        suggestions.push("Metadata presence is below 85; ensure document_id and section are populated.".to_string());
    } else if metadata < 90.0 {
        suggestions.push("Metadata presence is good but not complete.".to_string());
    }

    if has_violation("kb_not_ready") {
        if current_playbook.map(|p| p != "TECH").unwrap_or(true) {
            playbook_recommendations.push("TECH".to_string());
        }
        suggestions.push("Knowledge-base readiness failed policy; consider a playbook with tighter chunk targets.".to_string());
    } else if kb_ready < 70.0 {
        suggestions.push("Knowledge-base readiness is low; review section and heading detection.".to_string());
    } else if kb_ready < 85.0 {
        suggestions.push("Knowledge-base readiness is moderate.".to_string());
    }

    if completeness < 60.0 {
        if current_playbook == Some("REGULATORY") {
            next_playbook = Some("SCANNED".to_string());
            playbook_recommendations.push("SCANNED".to_string());
        }
        config_tweaks.insert("increase_chunk_overlap".to_string(), serde_json::Value::Bool(true));
        suggestions.push("Completeness is low; document may be scanned or poorly extracted.".to_string());
    } else if completeness < 75.0 {
        config_tweaks.insert("increase_chunk_overlap".to_string(), serde_json::Value::Bool(true));
        suggestions.push("Completeness is moderate; increasing chunk overlap may help.".to_string());
    } else if completeness < 90.0 {
        suggestions.push("Completeness is good but not complete.".to_string());
    }

    if quality < 70.0 {
        suggestions.push("Text quality is low; check for extraction artifacts or noise.".to_string());
    } else if quality < 85.0 {
        suggestions.push("Text quality is acceptable but could be improved.".to_string());
    }

    if !policy.policy_passed {
        suggestions.push("Overall policy failed; address the violations above before promoting.".to_string());
    }

    if next_playbook.as_deref() != current_playbook {
        suggestions.push(format!(
            "Recommend switching playbook from {} to {}.",
            current_playbook.unwrap_or("none"),
            next_playbook.as_deref().unwrap_or("none")
        ));
    }

    if suggestions.is_empty() {
        suggestions.push("No specific issues detected; current configuration appears adequate.".to_string());
    }

    OptimizerSuggestion {
        next_playbook,
        config_tweaks,
        suggestions,
        playbook_recommendations,
    }
}
