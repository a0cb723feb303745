//! Reporting stage: composes a one-page PDF trust report summarizing the
//! fingerprint, top violations, and chunk distribution.
//!
//! PDF generation uses `printpdf`, since the existing PDF dependencies only
//! *read* PDFs (`pdf-extract`/`lopdf`); see DESIGN.md for the rationale.

use crate::error::{AirdError, Result};
use crate::models::Fingerprint;
use crate::pipeline::policy::evaluate_policy;
use crate::storage_view::{PutLocation, StorageView};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::io::Cursor;

const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;

fn fmt_line(label: &str, value: f64) -> String {
    format!("{label}: {value:.1}")
}

/// Renders a single-page trust report for `fingerprint`, listing its
/// sub-scores plus up to the first `max_violations` policy violations and
/// warnings.
pub fn render_trust_report(
    product: &str,
    version: u32,
    fingerprint: &Fingerprint,
    violations: &[String],
    warnings: &[String],
) -> Result<Vec<u8>> {
    let (doc, page1, layer1) = PdfDocument::new("AI-Ready Dataset Trust Report", Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AirdError::Integrity(format!("failed to load PDF font: {e}")))?;

    let mut y = 280.0;
    let mut write_line = |text: &str, size: f64, y: &mut f64| {
        layer.use_text(text, size, Mm(15.0), Mm(*y), &font);
        *y -= size / 2.0 + 4.0;
    };

    write_line(&format!("Trust Report: {product} v{version}"), 18.0, &mut y);
    y -= 6.0;
    write_line(&fmt_line("AI Trust Score", fingerprint.ai_trust_score), 12.0, &mut y);
    write_line(&fmt_line("Quality", fingerprint.quality), 12.0, &mut y);
    write_line(&fmt_line("Completeness", fingerprint.completeness), 12.0, &mut y);
    write_line(&fmt_line("Secure", fingerprint.secure), 12.0, &mut y);
    write_line(&fmt_line("Metadata Presence", fingerprint.metadata_presence), 12.0, &mut y);
    write_line(&fmt_line("Knowledge Base Ready", fingerprint.knowledge_base_ready), 12.0, &mut y);
    if let Some(vqs) = fingerprint.vector_quality_score {
        write_line(&fmt_line("Vector Quality Score", vqs), 12.0, &mut y);
    }
    if let Some(readiness) = fingerprint.semantic_search_readiness {
        write_line(&fmt_line("Semantic Search Readiness", readiness), 12.0, &mut y);
    }

    y -= 6.0;
    write_line("Violations:", 14.0, &mut y);
    if violations.is_empty() {
        write_line("  none", 11.0, &mut y);
    } else {
        for violation in violations.iter().take(20) {
            write_line(&format!("  - {violation}"), 11.0, &mut y);
        }
    }

    y -= 6.0;
    write_line("Warnings:", 14.0, &mut y);
    if warnings.is_empty() {
        write_line("  none", 11.0, &mut y);
    } else {
        for warning in warnings.iter().take(20) {
            write_line(&format!("  - {warning}"), 11.0, &mut y);
        }
    }

    let mut buffer = Cursor::new(Vec::new());
    doc.save(&mut buffer)
        .map_err(|e| AirdError::Integrity(format!("failed to render PDF report: {e}")))?;
    Ok(buffer.into_inner())
}

/// Evaluates policy against `fingerprint`, renders the report, and uploads
/// it as a `reporting` stage artifact.
pub async fn run_reporting(
    view: &StorageView,
    product: &str,
    version: u32,
    fingerprint: &Fingerprint,
    thresholds: crate::models::PolicyThresholds,
) -> Result<PutLocation> {
    let policy_result = evaluate_policy(fingerprint, thresholds);
    let pdf_bytes = render_trust_report(product, version, fingerprint, &policy_result.violations, &policy_result.warnings)?;
    view.put_artifact("reporting", "trust_report.pdf", "aird-chunk", pdf_bytes).await
}
