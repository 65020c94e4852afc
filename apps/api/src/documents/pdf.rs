//! PDF text extraction via `pdf-extract`.
//!
//! Pages are extracted individually and joined with a single newline in page order.
//! Image-only pages come back empty and are kept as empty strings so page
//! boundaries stay intact.

use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::documents::{DocumentFormat, ExtractError};

pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(String::new());
    }

    // pdf-extract panics on some malformed content streams; treat that the same
    // as a container it could not open.
    let pages = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| corrupt("PDF parser aborted on malformed input".to_string()))?
    .map_err(|e| corrupt(e.to_string()))?;

    let empty_pages = pages.iter().filter(|p| p.trim().is_empty()).count();
    if empty_pages > 0 {
        warn!(
            "{empty_pages} of {} PDF pages had no extractable text (scanned images?)",
            pages.len()
        );
    }

    Ok(join_pages(&pages))
}

fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|p| p.trim())
        .collect::<Vec<_>>()
        .join("\n")
}

fn corrupt(reason: String) -> ExtractError {
    ExtractError::CorruptDocument {
        format: DocumentFormat::Pdf,
        reason,
    }
}
