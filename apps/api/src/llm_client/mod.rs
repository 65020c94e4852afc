/// LLM Client: the boundary between the brief pipeline and the completion service.
///
/// The pipeline only sees the `CompletionClient` trait. `AnthropicClient` is the
/// production implementation over the Anthropic Messages API. Credentials and the
/// HTTP client are passed in at construction; nothing is read from the environment here.
///
/// A single `complete` call makes a single HTTP attempt. Retry and backoff belong
/// to the pipeline so attempt budgets are enforced in one place.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Anthropic's "overloaded" status.
const STATUS_OVERLOADED: u16 = 529;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// The only knobs the pipeline passes to the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionConfig {
    pub model: String,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A system instruction plus the user turn.
#[derive(Debug, Clone, Copy)]
pub struct CompletionPrompt<'a> {
    pub system: &'a str,
    pub user: &'a str,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("rate limited by completion service")]
    RateLimited { retry_after: Option<Duration> },

    #[error("completion call timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion service rejected the request (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("completion service returned no text content")]
    EmptyContent,
}

impl CompletionError {
    /// ServiceUnavailable, RateLimited and Timeout are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CompletionError::ServiceUnavailable(_)
                | CompletionError::RateLimited { .. }
                | CompletionError::Timeout(_)
        )
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CompletionError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Text-in, text-out completion service.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        prompt: CompletionPrompt<'_>,
        config: &CompletionConfig,
    ) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Concatenates every text block, in order.
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.concat())
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Completion client over the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl AnthropicClient {
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            endpoint: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Points the client at a different Messages endpoint (proxies, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(
        &self,
        prompt: CompletionPrompt<'_>,
        config: &CompletionConfig,
    ) -> Result<String, CompletionError> {
        let request_body = AnthropicRequest {
            model: &config.model,
            max_tokens: config.max_output_tokens,
            system: prompt.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt.user,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(config.timeout)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| transport_error(e, config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let body = response.text().await.unwrap_or_default();
            warn!("Completion API returned {}: {}", status, body);
            return Err(classify_status(status, &body, retry_after));
        }

        let llm_response: LlmResponse = response
            .json()
            .await
            .map_err(|e| transport_error(e, config.timeout))?;

        debug!(
            "Completion succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        llm_response.text().ok_or(CompletionError::EmptyContent)
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout(timeout)
    } else if e.is_decode() {
        CompletionError::Api {
            status: e.status().map(|s| s.as_u16()).unwrap_or(200),
            message: format!("malformed response body: {e}"),
        }
    } else {
        CompletionError::ServiceUnavailable(e.to_string())
    }
}

/// Maps a non-success status to the retryable / terminal taxonomy.
fn classify_status(
    status: StatusCode,
    body: &str,
    retry_after: Option<Duration>,
) -> CompletionError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return CompletionError::RateLimited { retry_after };
    }
    if status.is_server_error() || status.as_u16() == STATUS_OVERLOADED {
        return CompletionError::ServiceUnavailable(format!("status {}", status.as_u16()));
    }
    if status == StatusCode::REQUEST_TIMEOUT {
        return CompletionError::ServiceUnavailable("status 408".to_string());
    }
    let message = serde_json::from_str::<AnthropicError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    CompletionError::Api {
        status: status.as_u16(),
        message,
    }
}
