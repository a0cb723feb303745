//! Deterministic object-store key layout for a (workspace, product, version) scope.

use once_cell::sync::Lazy;
use regex::Regex;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\-.]").unwrap());
static REPEATED_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

pub fn raw_prefix(workspace: &str, product: &str, version: u32) -> String {
    format!("ws/{workspace}/prod/{product}/v/{version}/raw/")
}

pub fn clean_prefix(workspace: &str, product: &str, version: u32) -> String {
    format!("ws/{workspace}/prod/{product}/v/{version}/clean/")
}

pub fn chunk_prefix(workspace: &str, product: &str, version: u32) -> String {
    format!("ws/{workspace}/prod/{product}/v/{version}/chunk/")
}

pub fn embed_prefix(workspace: &str, product: &str, version: u32) -> String {
    format!("ws/{workspace}/prod/{product}/v/{version}/embed/")
}

pub fn artifacts_prefix(workspace: &str, product: &str, version: u32) -> String {
    format!("ws/{workspace}/prod/{product}/v/{version}/artifacts/")
}

pub fn export_prefix(workspace: &str, product: &str, version: u32) -> String {
    format!("ws/{workspace}/prod/{product}/v/{version}/export/")
}

pub fn playbook_prefix(workspace: &str, playbook_id: &str) -> String {
    format!("ws/{workspace}/playbooks/{playbook_id}/")
}

pub fn compliance_reports_prefix(workspace: &str) -> String {
    format!("ws/{workspace}/compliance/reports/")
}

/// Restrict a filename to `[A-Za-z0-9_.-]`, collapse runs of underscores, and
/// never return an empty string.
pub fn safe_filename(filename: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(filename, "_");
    let collapsed = REPEATED_UNDERSCORES.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        "unnamed_file".to_string()
    } else {
        trimmed.to_string()
    }
}
