//! Fetches a job description posted on the web.
//!
//! The format comes from the Content-Type header. PDF and plain-text bodies become
//! a RawDocument as-is and go through normal extraction. HTML pages are reduced
//! to their main content here, since a posting page carries navigation, footers
//! and related-job lists that are not part of the job description.

use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client};
use thiserror::Error;
use tracing::{debug, info};

use crate::documents::html::html_main_text;
use crate::documents::{DocumentFormat, RawDocument};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status}")]
    Status { status: u16 },
}

pub async fn fetch_document(client: &Client, url: &str) -> Result<RawDocument, FetchError> {
    let parsed = reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }

    let response = client.get(parsed).timeout(FETCH_TIMEOUT).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
        });
    }

    let format = format_from_content_type(
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
    );
    let body = response.bytes().await?;
    info!("Fetched {} bytes of {format} from {url}", body.len());

    if format == DocumentFormat::Html {
        let text = html_main_text(&String::from_utf8_lossy(&body));
        debug!("Kept {} chars of main content from {url}", text.len());
        return Ok(RawDocument::new(text, DocumentFormat::Text));
    }
    Ok(RawDocument::new(body, format))
}

fn format_from_content_type(content_type: Option<&str>) -> DocumentFormat {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();
    match mime.as_str() {
        "application/pdf" => DocumentFormat::Pdf,
        "text/html" | "application/xhtml+xml" => DocumentFormat::Html,
        _ => DocumentFormat::Text,
    }
}
