//! Document ingestion: raw uploads in, normalized text out.
//!
//! Flow: RawDocument → extract() → ExtractedText → normalize() → NormalizedText.
//! Nothing here touches the network except `fetch`, which only produces a RawDocument.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub mod extract;
pub mod fetch;
pub mod html;
pub mod normalize;
pub mod pdf;

pub use extract::{extract, ExtractError};
pub use normalize::{normalize, NormalizedText};

/// Declared format of an uploaded document. Only these three are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Html,
    Text,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Html => "html",
            DocumentFormat::Text => "text",
        }
    }

    /// Infers a format from an upload's file name. Used only when the caller
    /// did not declare one.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "html" | "htm" => Some(DocumentFormat::Html),
            "txt" | "text" => Some(DocumentFormat::Text),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = ExtractError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "html" => Ok(DocumentFormat::Html),
            "text" => Ok(DocumentFormat::Text),
            _ => Err(ExtractError::UnsupportedFormat(tag.to_string())),
        }
    }
}

/// Which side of the pairing a document is. Carried for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRole {
    JobDescription,
    Cv,
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentRole::JobDescription => f.write_str("job description"),
            DocumentRole::Cv => f.write_str("CV"),
        }
    }
}

/// Uploaded bytes plus the format the caller declared for them.
#[derive(Debug, Clone)]
pub struct RawDocument {
    bytes: Bytes,
    format: DocumentFormat,
}

impl RawDocument {
    pub fn new(bytes: impl Into<Bytes>, format: DocumentFormat) -> Self {
        Self {
            bytes: bytes.into(),
            format,
        }
    }

    /// Builds a document from a free-form format tag, rejecting anything
    /// outside pdf / html / text.
    pub fn from_tag(bytes: impl Into<Bytes>, tag: &str) -> Result<Self, ExtractError> {
        Ok(Self::new(bytes, tag.parse()?))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }
}

/// Plain text pulled out of a RawDocument, before cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub source: DocumentFormat,
}

impl ExtractedText {
    pub fn new(text: impl Into<String>, source: DocumentFormat) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
