//! Preprocess stage: normalizes raw text, detects sections, and chunks it
//! into [`ProcessedRecord`]s.
//!
//! Grounded in `dag_primedata_v1.py`'s `preprocess()` task for the overall
//! shape (list raw files, process each, emit a running file list and
//! `mid_sentence_boundary_rate`) and in `src/knowledge/chunker.rs`'s
//! chunking mechanics, now routed through [`crate::chunking`].

use crate::analyzer::chunk_config::analyze_content;
use crate::chunking::{chunk_text, into_processed_records};
use crate::models::ProcessedRecord;
use crate::pdf::PdfExtractor;
use crate::playbook::Playbook;
use crate::storage_view::StorageView;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

static PAGE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^=== PAGE (\d+) ===\s*$").unwrap());
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static MULTI_BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static SOFT_HYPHEN_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w)-\n(\w)").unwrap());

/// One raw file's outcome: either chunked records, or a reason it was
/// skipped (no text extracted).
pub struct FilePreprocessResult {
    pub file_stem: String,
    pub records: Vec<ProcessedRecord>,
    pub sections: usize,
    pub mid_sentence_splits: usize,
}

/// Normalizes whitespace; when `enhanced` is set, also applies Unicode NFKC
/// normalization and repairs hyphenated line-break words.
pub fn normalize_text(text: &str, enhanced: bool) -> String {
    let text = text.replace('\u{c}', "\n"); // form feed -> newline
    let text: Cow<str> = if enhanced {
        Cow::Owned(unicode_normalization::UnicodeNormalization::nfkc(text.as_str()).collect::<String>())
    } else {
        Cow::Borrowed(&text)
    };
    let text = if enhanced {
        SOFT_HYPHEN_BREAK.replace_all(&text, "$1$2").into_owned()
    } else {
        text.into_owned()
    };
    let text = MULTI_SPACE.replace_all(&text, " ");
    let text = MULTI_BLANK_LINE.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Splits normalized text into sections using playbook heading cues and
/// `=== PAGE n ===` fence markers. Falls back to a single `"general"`
/// section when no cues match.
pub fn detect_sections(text: &str, heading_patterns: &[String]) -> Vec<(String, String)> {
    if PAGE_FENCE.is_match(text) {
        let mut sections = Vec::new();
        let mut last_end = 0;
        let mut current_page = "1".to_string();
        for capture in PAGE_FENCE.captures_iter(text) {
            let m = capture.get(0).unwrap();
            let body = text[last_end..m.start()].trim();
            if !body.is_empty() {
                sections.push((format!("page_{current_page}"), body.to_string()));
            }
            current_page = capture.get(1).unwrap().as_str().to_string();
            last_end = m.end();
        }
        let tail = text[last_end..].trim();
        if !tail.is_empty() {
            sections.push((format!("page_{current_page}"), tail.to_string()));
        }
        if !sections.is_empty() {
            return sections;
        }
    }

    let heading_regexes: Vec<Regex> = heading_patterns.iter().filter_map(|p| Regex::new(p).ok()).collect();
    if heading_regexes.is_empty() {
        return vec![("general".to_string(), text.to_string())];
    }

    let mut sections: Vec<(String, String)> = Vec::new();
    let mut current_name = "general".to_string();
    let mut current_body = String::new();
    for line in text.lines() {
        if let Some(re) = heading_regexes.iter().find(|re| re.is_match(line)) {
            if !current_body.trim().is_empty() {
                sections.push((current_name.clone(), current_body.trim().to_string()));
            }
            let _ = re;
            current_name = line.trim().to_lowercase().replace(' ', "_");
            current_body = String::new();
        } else {
            current_body.push_str(line);
            current_body.push('\n');
        }
    }
    if !current_body.trim().is_empty() {
        sections.push((current_name, current_body.trim().to_string()));
    }
    if sections.is_empty() {
        sections.push(("general".to_string(), text.to_string()));
    }
    sections
}

const MINHASH_PERMUTATIONS: usize = 16;
const SHINGLE_SIZE: usize = 5;
const NEAR_DUPLICATE_THRESHOLD: f64 = 0.85;

/// 16-permutation MinHash signature over word 5-shingles, used to estimate
/// Jaccard similarity between chunk texts without storing full shingle sets.
fn minhash_signature(text: &str) -> [u64; MINHASH_PERMUTATIONS] {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut signature = [u64::MAX; MINHASH_PERMUTATIONS];
    if words.len() < SHINGLE_SIZE {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let base = hasher.finish();
        for (i, slot) in signature.iter_mut().enumerate() {
            *slot = base.wrapping_mul(PERMUTATION_SEEDS[i]).wrapping_add(i as u64);
        }
        return signature;
    }

    for window in words.windows(SHINGLE_SIZE) {
        let mut hasher = DefaultHasher::new();
        window.join(" ").hash(&mut hasher);
        let shingle_hash = hasher.finish();
        for (i, slot) in signature.iter_mut().enumerate() {
            let permuted = shingle_hash.wrapping_mul(PERMUTATION_SEEDS[i]).wrapping_add(PERMUTATION_SEEDS[i] >> 1);
            if permuted < *slot {
                *slot = permuted;
            }
        }
    }
    signature
}

/// Odd multiplicative constants standing in for independent hash
/// permutations; fixed so signatures are deterministic across runs.
const PERMUTATION_SEEDS: [u64; MINHASH_PERMUTATIONS] = [
    0x9E3779B97F4A7C15,
    0xC2B2AE3D27D4EB4F,
    0x165667B19E3779F9,
    0x27D4EB2F165667C5,
    0xFF51AFD7ED558CCD,
    0xC4CEB9FE1A85EC53,
    0x2545F4914F6CDD1D,
    0x3C79AC492BA7B653,
    0x1C69B3F74AC4AE35,
    0x589965CC75374CC3,
    0xEB44ACCAB455D165,
    0x9FB21C651E98DF25,
    0x85EBCA6B13A21C97,
    0xCA2B2F55C3C40E7A,
    0x94D049BB133111EB,
    0xBF58476D1CE4E5B9,
];

fn estimated_jaccard(a: &[u64; MINHASH_PERMUTATIONS], b: &[u64; MINHASH_PERMUTATIONS]) -> f64 {
    let matches = a.iter().zip(b).filter(|(x, y)| x == y).count();
    matches as f64 / MINHASH_PERMUTATIONS as f64
}

/// Drops chunks whose MinHash signature is near-duplicate (estimated Jaccard
/// similarity ≥ [`NEAR_DUPLICATE_THRESHOLD`]) of an already-kept chunk,
/// preserving the first occurrence. O(n^2) over the run's chunk count,
/// acceptable since this is an opt-in quality pass rather than the hot path.
pub fn deduplicate_records(records: Vec<ProcessedRecord>) -> (Vec<ProcessedRecord>, usize) {
    let mut kept: Vec<ProcessedRecord> = Vec::with_capacity(records.len());
    let mut kept_signatures: Vec<[u64; MINHASH_PERMUTATIONS]> = Vec::with_capacity(records.len());
    let mut removed = 0usize;

    for record in records {
        let signature = minhash_signature(&record.text);
        let is_duplicate = kept_signatures
            .iter()
            .any(|existing| estimated_jaccard(existing, &signature) >= NEAR_DUPLICATE_THRESHOLD);
        if is_duplicate {
            removed += 1;
        } else {
            kept_signatures.push(signature);
            kept.push(record);
        }
    }

    (kept, removed)
}

/// Preprocesses one raw file end to end: read, normalize, section, chunk.
/// Returns `None` when no text could be extracted (caller should skip it).
pub async fn preprocess_file(
    view: &StorageView,
    extractor: &dyn PdfExtractor,
    file_stem: &str,
    playbook: &Playbook,
) -> crate::error::Result<Option<FilePreprocessResult>> {
    let raw_text = view.get_raw_text(&format!("{file_stem}.txt"), extractor).await?;
    if raw_text.trim().is_empty() {
        return Ok(None);
    }

    let normalized = normalize_text(&raw_text, playbook.preprocessing_flags.enhanced_normalization);
    if normalized.is_empty() {
        return Ok(None);
    }

    let config = analyze_content(&normalized, Some(file_stem), None);
    let sections = detect_sections(&normalized, &playbook.heading_patterns);

    let mut records = Vec::new();
    let mut mid_sentence_splits = 0usize;
    for (section_name, section_text) in &sections {
        let raw_chunks = chunk_text(
            section_text,
            config.strategy,
            config.chunk_size,
            config.chunk_overlap,
            config.min_chunk_size,
        );
        mid_sentence_splits += raw_chunks.iter().filter(|c| c.mid_sentence_split).count();
        records.extend(into_processed_records(raw_chunks, file_stem, section_name));
    }

    Ok(Some(FilePreprocessResult {
        file_stem: file_stem.to_string(),
        records,
        sections: sections.len(),
        mid_sentence_splits,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_collapses_whitespace() {
        let out = normalize_text("hello    world\n\n\n\nfoo", false);
        assert_eq!(out, "hello world\n\nfoo");
    }

    #[test]
    fn test_normalize_text_enhanced_repairs_hyphen_break() {
        let out = normalize_text("knowl-\nedge base", true);
        assert!(out.contains("knowledge"));
    }

    #[test]
    fn test_detect_sections_page_fence() {
        let text = "=== PAGE 1 ===\nfirst page text\n=== PAGE 2 ===\nsecond page text";
        let sections = detect_sections(text, &[]);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].0, "page_1");
    }

    #[test]
    fn test_detect_sections_no_cues_falls_back_to_general() {
        let sections = detect_sections("just plain text", &[]);
        assert_eq!(sections, vec![("general".to_string(), "just plain text".to_string())]);
    }

    #[test]
    fn test_detect_sections_heading_pattern() {
        let text = "Introduction\nSome intro text.\nConclusion\nSome closing text.";
        let sections = detect_sections(text, &[r"^(Introduction|Conclusion)$".to_string()]);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].0, "introduction");
    }

    fn record(chunk_id: &str, text: &str) -> ProcessedRecord {
        ProcessedRecord {
            chunk_id: chunk_id.to_string(),
            text: text.to_string(),
            section: "general".to_string(),
            document_id: "doc1".to_string(),
            token_est: (text.len() / 4).max(1) as u32,
            page: None,
            field_name: None,
            tags: Vec::new(),
            source: None,
            audience: None,
            timestamp: None,
        }
    }

    #[test]
    fn test_deduplicate_records_drops_near_identical_chunk() {
        let body = "the quick brown fox jumps over the lazy dog near the riverbank at dawn";
        let records = vec![
            record("c1", body),
            record("c2", body),
            record("c3", "completely unrelated text about quarterly revenue forecasts"),
        ];
        let (kept, removed) = deduplicate_records(records);
        assert_eq!(kept.len(), 2);
        assert_eq!(removed, 1);
        assert_eq!(kept[0].chunk_id, "c1");
    }

    #[test]
    fn test_deduplicate_records_keeps_distinct_chunks() {
        let records = vec![
            record("c1", "alpha beta gamma delta epsilon zeta eta theta"),
            record("c2", "completely different content about shipping logistics"),
        ];
        let (kept, removed) = deduplicate_records(records);
        assert_eq!(kept.len(), 2);
        assert_eq!(removed, 0);
    }
}
