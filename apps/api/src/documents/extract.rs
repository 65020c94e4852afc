//! Format dispatch for text extraction.
//!
//! Extraction is best-effort: garbled or partial text is returned as-is.
//! Only a document with no recoverable structure at all is an error.

use thiserror::Error;
use tracing::debug;

use crate::documents::{html, pdf, DocumentFormat, ExtractedText, RawDocument};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported document format '{0}' (expected pdf, html or text)")]
    UnsupportedFormat(String),

    #[error("corrupt {format} document: {reason}")]
    CorruptDocument {
        format: DocumentFormat,
        reason: String,
    },
}

/// Converts a raw document into plain text according to its declared format.
pub fn extract(doc: &RawDocument) -> Result<ExtractedText, ExtractError> {
    let text = match doc.format() {
        DocumentFormat::Pdf => pdf::extract_pdf_text(doc.bytes())?,
        DocumentFormat::Html => html::html_to_text(&String::from_utf8_lossy(doc.bytes())),
        DocumentFormat::Text => decode_text(doc.bytes()),
    };

    debug!(
        "Extracted {} chars from {} bytes of {}",
        text.chars().count(),
        doc.bytes().len(),
        doc.format()
    );

    Ok(ExtractedText::new(text, doc.format()))
}

/// UTF-8 decode with U+FFFD for invalid sequences. A leading BOM is dropped.
fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
