//! Brief generation pipeline, the single entry point for producing a brief.
//!
//! Flow: extract JD → normalize JD → extract CV → normalize CV →
//!       build request → complete (with retry) → parse.
//!
//! Any stage failure short-circuits and is wrapped in `BriefGenerationFailed`.
//! The pipeline holds only immutable configuration, so one instance is shared
//! across concurrent requests. Cancelling the returned future (dropping it, or
//! `generate_brief_with_timeout`) aborts the in-flight completion call and
//! schedules no further attempts: nothing is spawned.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::brief::errors::{BriefGenerationFailed, Stage};
use crate::brief::models::Brief;
use crate::brief::parser::parse;
use crate::brief::request_builder::{build, BriefRequest};
use crate::documents::{extract, normalize, DocumentRole, NormalizedText, RawDocument};
use crate::llm_client::{CompletionClient, CompletionConfig, CompletionError};

/// Total completion attempts per brief, first call included.
pub const MAX_COMPLETION_ATTEMPTS: u32 = 3;
pub const BASE_BACKOFF: Duration = Duration::from_millis(500);
pub const MAX_BACKOFF: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_COMPLETION_ATTEMPTS,
            base_backoff: BASE_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Delay after the `failed`-th failed attempt (1-based): base, 2×base, 4×base…
    /// stretched to a server-provided `retry_after`, always capped at `max_backoff`.
    pub fn backoff(&self, failed: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = failed.saturating_sub(1).min(16);
        let exponential = self.base_backoff.saturating_mul(1 << exponent);
        exponential
            .max(retry_after.unwrap_or_default())
            .min(self.max_backoff)
    }
}

#[derive(Clone)]
pub struct Pipeline {
    client: Arc<dyn CompletionClient>,
    config: CompletionConfig,
    retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(client: Arc<dyn CompletionClient>, config: CompletionConfig) -> Self {
        Self {
            client,
            config,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Generates a brief from raw bytes and format tags (`pdf`, `html`, `text`).
    pub async fn generate_brief(
        &self,
        jd_bytes: impl Into<Bytes>,
        jd_format: &str,
        cv_bytes: impl Into<Bytes>,
        cv_format: &str,
    ) -> Result<Brief, BriefGenerationFailed> {
        let jd = RawDocument::from_tag(jd_bytes, jd_format).map_err(|e| {
            BriefGenerationFailed::new(Stage::Extraction(DocumentRole::JobDescription), e)
        })?;
        let cv = RawDocument::from_tag(cv_bytes, cv_format)
            .map_err(|e| BriefGenerationFailed::new(Stage::Extraction(DocumentRole::Cv), e))?;
        self.generate_brief_from_documents(&jd, &cv).await
    }

    pub async fn generate_brief_from_documents(
        &self,
        jd: &RawDocument,
        cv: &RawDocument,
    ) -> Result<Brief, BriefGenerationFailed> {
        let attempts = AtomicU32::new(0);
        self.run(jd, cv, &attempts).await
    }

    /// Like `generate_brief_from_documents`, bounded by `limit` end to end.
    pub async fn generate_brief_with_timeout(
        &self,
        jd: &RawDocument,
        cv: &RawDocument,
        limit: Duration,
    ) -> Result<Brief, BriefGenerationFailed> {
        let attempts = AtomicU32::new(0);
        match tokio::time::timeout(limit, self.run(jd, cv, &attempts)).await {
            Ok(result) => result,
            Err(_) => {
                let made = attempts.load(Ordering::Relaxed);
                warn!("Brief generation exceeded {limit:?} after {made} completion attempts");
                Err(
                    BriefGenerationFailed::new(Stage::Completion, CompletionError::Timeout(limit))
                        .with_attempts(made),
                )
            }
        }
    }

    async fn run(
        &self,
        jd: &RawDocument,
        cv: &RawDocument,
        attempts: &AtomicU32,
    ) -> Result<Brief, BriefGenerationFailed> {
        let jd_text = prepare(jd, DocumentRole::JobDescription)?;
        let cv_text = prepare(cv, DocumentRole::Cv)?;

        let request = build(&jd_text, &cv_text)
            .map_err(|e| BriefGenerationFailed::new(Stage::RequestBuild, e))?;
        info!(
            "Built brief request: jd_chars={}, cv_chars={}, prompt_chars={}",
            jd_text.as_str().len(),
            cv_text.as_str().len(),
            request.prompt.len()
        );

        let raw = self.complete_with_retry(&request, attempts).await?;
        let made = attempts.load(Ordering::Relaxed);

        let brief = parse(&raw).map_err(|e| {
            warn!("Unparsable completion output: {:?}", e.excerpt);
            BriefGenerationFailed::new(Stage::Parsing, e).with_attempts(made)
        })?;

        info!(
            "Brief ready: gaps={}, questions={}, talking_points={}, partial={}",
            brief.skill_gaps.len(),
            brief.predicted_questions.len(),
            brief.talking_points.len(),
            brief.partial
        );
        Ok(brief)
    }

    /// Calls the completion service, retrying retryable errors with backoff until
    /// the attempt budget is spent.
    async fn complete_with_retry(
        &self,
        request: &BriefRequest,
        attempts: &AtomicU32,
    ) -> Result<String, BriefGenerationFailed> {
        let max_attempts = self.retry.max_attempts.max(1);

        loop {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            let error = match self.client.complete(request.as_prompt(), &self.config).await {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= max_attempts {
                warn!("Completion attempt {attempt}/{max_attempts} failed, giving up: {error}");
                return Err(
                    BriefGenerationFailed::new(Stage::Completion, error).with_attempts(attempt)
                );
            }

            let delay = self.retry.backoff(attempt, error.retry_after());
            warn!(
                "Completion attempt {attempt}/{max_attempts} failed ({error}), retrying after {}ms...",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn prepare(doc: &RawDocument, role: DocumentRole) -> Result<NormalizedText, BriefGenerationFailed> {
    let extracted =
        extract(doc).map_err(|e| BriefGenerationFailed::new(Stage::Extraction(role), e))?;
    if extracted.is_empty() {
        warn!("{role} ({}) produced no extractable text", doc.format());
    }
    let normalized = normalize(&extracted);
    if normalized.is_empty() && !extracted.is_empty() {
        warn!("{role} ({}) is empty after normalization", doc.format());
    }
    debug!(
        "Prepared {role}: source={}, chars={}",
        normalized.source(),
        normalized.as_str().len()
    );
    Ok(normalized)
}
