//! Policy engine: evaluates a readiness fingerprint against thresholds.
//!
//! Ported line-for-line from the original `policy_engine.py`, including its
//! exact violation tag format (`"{tag}(<{threshold})"`).

use crate::models::{Fingerprint, PolicyResult, PolicyStatus, PolicyThresholds};

/// Critical violation tags that force `PolicyStatus::Failed` even when other
/// violations are only warnings.
const CRITICAL_TAGS: [&str; 2] = ["low_trust", "security_not_full"];

/// Evaluates `fingerprint` against `thresholds`, producing violations tagged
/// `low_trust`, `security_not_full`, `weak_metadata`, `kb_not_ready`.
pub fn evaluate_policy(fingerprint: &Fingerprint, thresholds: PolicyThresholds) -> PolicyResult {
    if fingerprint.is_empty() {
        return PolicyResult {
            status: PolicyStatus::Failed,
            policy_passed: false,
            violations: vec!["no_fingerprint".to_string()],
            warnings: Vec::new(),
            thresholds,
        };
    }

    let mut violations = Vec::new();

    if fingerprint.ai_trust_score < thresholds.min_trust_score {
        violations.push(format!("low_trust(<{})", fmt_threshold(thresholds.min_trust_score)));
    }
    if fingerprint.secure < thresholds.min_secure {
        violations.push(format!("security_not_full(<{})", fmt_threshold(thresholds.min_secure)));
    }
    if fingerprint.metadata_presence < thresholds.min_metadata_presence {
        violations.push(format!("weak_metadata(<{})", fmt_threshold(thresholds.min_metadata_presence)));
    }
    if fingerprint.knowledge_base_ready < thresholds.min_kb_ready {
        violations.push(format!("kb_not_ready(<{})", fmt_threshold(thresholds.min_kb_ready)));
    }

    let policy_passed = violations.is_empty();
    let status = if policy_passed {
        PolicyStatus::Passed
    } else if violations.iter().any(|v| CRITICAL_TAGS.iter().any(|tag| v.starts_with(tag))) {
        PolicyStatus::Failed
    } else {
        PolicyStatus::Warnings
    };

    PolicyResult {
        status,
        policy_passed,
        violations,
        warnings: Vec::new(),
        thresholds,
    }
}

fn fmt_threshold(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
