//! PDF text extraction with a page-by-page fallback path.

use crate::error::{AirdError, Result};
use tracing::warn;

/// Magic-byte sniff for PDF content, used when a filename extension is
/// absent or unreliable.
pub fn is_pdf_bytes(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

pub trait PdfExtractor: Send + Sync {
    /// Extracts text from a PDF's bytes, inserting `=== PAGE n ===` markers
    /// (1-indexed) between pages so downstream chunking can recover page
    /// boundaries from plain text.
    fn extract_text(&self, bytes: &[u8]) -> Result<String>;
}

pub struct DefaultPdfExtractor;

impl PdfExtractor for DefaultPdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String> {
        #[cfg(feature = "pdf")]
        {
            match extract_with_pdf_extract(bytes) {
                Ok(text) if !text.trim().is_empty() => return Ok(text),
                Ok(_) => warn!("pdf-extract returned empty text, falling back to lopdf"),
                Err(e) => warn!("pdf-extract failed ({e}), falling back to lopdf"),
            }
            return extract_with_lopdf(bytes);
        }
        #[cfg(not(feature = "pdf"))]
        {
            Err(AirdError::Degraded(
                "PDF support not compiled in (feature `pdf` disabled)".to_string(),
            ))
        }
    }
}

#[cfg(feature = "pdf")]
fn extract_with_pdf_extract(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| AirdError::ExternalService(format!("pdf-extract failed: {e}")))
}

#[cfg(feature = "pdf")]
fn extract_with_lopdf(bytes: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| AirdError::ExternalService(format!("lopdf failed to load: {e}")))?;
    let mut out = String::new();
    let pages = doc.get_pages();
    let mut page_numbers: Vec<u32> = pages.keys().copied().collect();
    page_numbers.sort_unstable();
    for (idx, page_num) in page_numbers.iter().enumerate() {
        let text = doc.extract_text(&[*page_num]).unwrap_or_default();
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(&format!("=== PAGE {} ===\n", idx + 1));
        out.push_str(&text);
    }
    Ok(out)
}
