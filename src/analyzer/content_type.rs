//! Content-type detection by regex pattern scoring, with filename and
//! caller-supplied hint seeding.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Legal,
    Regulatory,
    FinanceBanking,
    Code,
    Documentation,
    Conversation,
    Academic,
    Technical,
    General,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Legal => "legal",
            ContentType::Regulatory => "regulatory",
            ContentType::FinanceBanking => "finance_banking",
            ContentType::Code => "code",
            ContentType::Documentation => "documentation",
            ContentType::Conversation => "conversation",
            ContentType::Academic => "academic",
            ContentType::Technical => "technical",
            ContentType::General => "general",
        }
    }

    pub fn all() -> &'static [ContentType] {
        &[
            ContentType::Legal,
            ContentType::Regulatory,
            ContentType::FinanceBanking,
            ContentType::Code,
            ContentType::Documentation,
            ContentType::Conversation,
            ContentType::Academic,
            ContentType::Technical,
            ContentType::General,
        ]
    }
}

fn rx(pattern: &str) -> Regex {
    Regex::new(&format!("(?im){pattern}")).expect("static content-type pattern is valid")
}

static CONTENT_PATTERNS: Lazy<HashMap<ContentType, Vec<Regex>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        ContentType::Legal,
        vec![
            rx(r"\b(whereas|hereby|herein|hereinafter|pursuant to|in accordance with)\b"),
            rx(r"\b(agreement|contract|terms and conditions|liability|indemnif\w+)\b"),
            rx(r"\b(shall|must not|is prohibited|is required to)\b"),
        ],
    );
    m.insert(
        ContentType::Regulatory,
        vec![
            rx(r"\b(compliance|regulation|regulatory|directive|requirement)\b"),
            rx(r"\b(shall comply|must comply|subject to|in compliance with)\b"),
            rx(r"\b(article \d+|section \d+|paragraph \d+)\b"),
            rx(r"\b(capital requirement|risk management|reporting obligation)\b"),
            rx(r"\b(eba|ecb|basel|crr|crd|ssm|pru|fca|sec)\b"),
            rx(r"\b(supervisory|prudential|aml|kyc)\b"),
        ],
    );
    m.insert(
        ContentType::FinanceBanking,
        vec![
            rx(r"\b(balance sheet|income statement|cash flow|revenue|profit|loss)\b"),
            rx(r"\b(interest rate|loan|deposit|credit|debit|transaction)\b"),
            rx(r"\b(basel|capital ratio|liquidity|solvency)\b"),
            rx(r"\$[\d,]+\.?\d*|\b\d+\.?\d*%"),
        ],
    );
    m.insert(
        ContentType::Code,
        vec![
            rx(r"^\s*(def|class|function|import|from|if|for|while|try|except)\s+"),
            rx(r"[{}();]"),
            rx(r"\b(var|let|const|public|private|static|void|int|string)\b"),
            rx(r"//.*|/\*.*\*/|#.*"),
            rx(r"```[\s\S]*?```"),
        ],
    );
    m.insert(
        ContentType::Documentation,
        vec![
            rx(r"^#{1,6}\s+"),
            rx(r"^\s*[-*+]\s+"),
            rx(r"^\s*\d+\.\s+"),
            rx(r"```"),
            rx(r"\[.*?\]\(.*?\)"),
        ],
    );
    m.insert(
        ContentType::Conversation,
        vec![
            rx(r"\b\d{1,2}:\d{2}\s*(am|pm)?\b"),
            rx(r"^[A-Z][a-z]+\s*:"),
            rx(r"\b(said|asked|replied|responded)\b"),
            rx(r"^[A-Z][a-zA-Z]*:\s"),
        ],
    );
    m.insert(
        ContentType::Academic,
        vec![
            rx(r"\b(abstract|introduction|methodology|conclusion|references)\b"),
            rx(r"\b(hypothesis|theorem|proof|lemma|corollary)\b"),
            rx(r"\[\d+\]|\(\w+,?\s*\d{4}\)"),
            rx(r"\b(figure|table)\s+\d+"),
        ],
    );
    m.insert(
        ContentType::Technical,
        vec![
            rx(r"\b(api|sdk|framework|architecture|specification)\b"),
            rx(r"\b(install|configure|deploy|implement)\b"),
            rx(r"\b(version|release|update|patch)\s*\d"),
            rx(r"\b(http|https|json|xml|sql|rest)\b"),
        ],
    );
    m
});

static HINT_TO_TYPE: Lazy<HashMap<&'static str, ContentType>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("regulatory", ContentType::Regulatory);
    m.insert("finance_banking", ContentType::FinanceBanking);
    m.insert("legal", ContentType::Legal);
    m.insert("academic", ContentType::Academic);
    m.insert("technical", ContentType::Technical);
    m
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionEvidence {
    pub matched_patterns: Vec<String>,
    pub pattern_details: HashMap<String, usize>,
    pub all_scores: HashMap<String, f64>,
    pub hint_applied: bool,
    pub hint_type: Option<String>,
    pub hint_boost: f64,
    pub filename_extension: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub content_type: ContentType,
    pub confidence: f64,
    pub evidence: DetectionEvidence,
}

fn filename_seed(filename: Option<&str>) -> Option<(ContentType, f64, String)> {
    let filename = filename?;
    let ext = filename.rsplit('.').next()?.to_lowercase();
    let seeded = match ext.as_str() {
        "py" | "js" | "java" | "cpp" | "c" | "go" | "rs" => Some((ContentType::Code, 0.8)),
        "md" | "rst" | "txt" => Some((ContentType::Documentation, 0.6)),
        "pdf" | "doc" | "docx" => Some((ContentType::General, 0.5)),
        _ => None,
    };
    seeded.map(|(t, s)| (t, s, ext))
}

/// Detects the dominant content type of `content` via weighted regex
/// pattern matching, optionally seeded by a filename extension and biased
/// toward a caller-supplied `hint`.
pub fn detect_content_type(content: &str, filename: Option<&str>, hint: Option<&str>) -> Detection {
    let content_len = content.len().max(1) as f64;
    let mut scores: HashMap<ContentType, f64> = HashMap::new();
    let mut pattern_details: HashMap<ContentType, Vec<(String, usize)>> = HashMap::new();

    if let Some((ctype, seed_score, _ext)) = filename_seed(filename) {
        scores.insert(ctype, seed_score);
    }

    for content_type in ContentType::all() {
        if *content_type == ContentType::General {
            continue;
        }
        let Some(patterns) = CONTENT_PATTERNS.get(content_type) else {
            continue;
        };
        let mut normalized_scores = Vec::with_capacity(patterns.len());
        let mut details = Vec::new();
        for pattern in patterns {
            let matches: Vec<&str> = pattern.find_iter(content).map(|m| m.as_str()).collect();
            let normalized = (matches.len() as f64 / (content_len / 1000.0)).min(1.0);
            normalized_scores.push(normalized);
            details.push((pattern.as_str().to_string(), matches.len()));
        }
        let type_score = normalized_scores.iter().sum::<f64>() / patterns.len() as f64;
        *scores.entry(*content_type).or_insert(0.0) += type_score;
        pattern_details.insert(*content_type, details);
    }

    let best = scores
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(t, s)| (*t, *s));

    let mut hint_applied = false;
    let mut hint_boost = 0.0;
    let (mut winner, mut confidence) = match best {
        Some((t, s)) => (t, s),
        None => (ContentType::General, 0.3),
    };

    if let Some(hint) = hint {
        if let Some(&hinted_type) = HINT_TO_TYPE.get(hint) {
            let hinted_score = scores.get(&hinted_type).copied().unwrap_or(0.0);
            let best_is_weak = best.map(|(_, s)| s < 0.5).unwrap_or(true);
            if best_is_weak {
                winner = hinted_type;
                confidence = hinted_score.max(0.6);
                hint_applied = true;
                hint_boost = confidence - hinted_score;
            } else if hinted_score > 0.0 && best.map(|(t, _)| t == hinted_type).unwrap_or(false) {
                let boosted = (hinted_score + 0.2).min(1.0);
                hint_boost = boosted - hinted_score;
                confidence = boosted;
                winner = hinted_type;
                hint_applied = true;
            }
        }
    }

    let best_score_is_zero = best.map(|(_, s)| s <= f64::EPSILON).unwrap_or(true);
    if !hint_applied && best_score_is_zero {
        winner = ContentType::General;
        confidence = 0.3;
    }

    let matched_patterns: Vec<String> = pattern_details
        .get(&winner)
        .map(|details| {
            let mut seen = std::collections::HashSet::new();
            details
                .iter()
                .filter(|(_, count)| *count > 0)
                .filter(|(pattern, _)| seen.insert(pattern.clone()))
                .take(30)
                .map(|(pattern, _)| pattern.clone())
                .collect()
        })
        .unwrap_or_default();

    let all_scores: HashMap<String, f64> = scores
        .iter()
        .map(|(t, s)| (t.as_str().to_string(), (s * 1000.0).round() / 1000.0))
        .collect();

    let pattern_details_out: HashMap<String, usize> = pattern_details
        .get(&winner)
        .map(|details| details.iter().map(|(p, c)| (p.clone(), *c)).collect())
        .unwrap_or_default();

    Detection {
        content_type: winner,
        confidence: confidence.clamp(0.0, 1.0),
        evidence: DetectionEvidence {
            matched_patterns,
            pattern_details: pattern_details_out,
            all_scores,
            hint_applied,
            hint_type: hint.map(|s| s.to_string()),
            hint_boost,
            filename_extension: filename.and_then(|f| f.rsplit('.').next()).map(|s| s.to_string()),
        },
    }
}
