use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

use crate::brief::pipeline::{RetryPolicy, MAX_COMPLETION_ATTEMPTS};
use crate::llm_client::{
    CompletionConfig, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL, DEFAULT_TIMEOUT,
};

const DEFAULT_PIPELINE_TIMEOUT_SECS: u64 = 180;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub llm_model: String,
    pub llm_max_output_tokens: u32,
    pub llm_timeout: Duration,
    /// Completion attempts per brief, first call included.
    pub llm_max_attempts: u32,
    /// End-to-end bound on one brief, retries and backoff included.
    pub pipeline_timeout: Duration,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let llm_timeout_secs = parse_or(&lookup, "LLM_TIMEOUT_SECS", DEFAULT_TIMEOUT.as_secs())?;
        let pipeline_timeout_secs =
            parse_or(&lookup, "PIPELINE_TIMEOUT_SECS", DEFAULT_PIPELINE_TIMEOUT_SECS)?;
        ensure!(llm_timeout_secs > 0, "LLM_TIMEOUT_SECS must be greater than zero");
        ensure!(
            pipeline_timeout_secs > 0,
            "PIPELINE_TIMEOUT_SECS must be greater than zero"
        );

        let llm_max_output_tokens =
            parse_or(&lookup, "LLM_MAX_OUTPUT_TOKENS", DEFAULT_MAX_OUTPUT_TOKENS)?;
        ensure!(
            llm_max_output_tokens > 0,
            "LLM_MAX_OUTPUT_TOKENS must be greater than zero"
        );

        let llm_max_attempts = parse_or(&lookup, "LLM_MAX_ATTEMPTS", MAX_COMPLETION_ATTEMPTS)?;
        ensure!(llm_max_attempts > 0, "LLM_MAX_ATTEMPTS must be greater than zero");

        Ok(Config {
            anthropic_api_key: require_env(&lookup, "ANTHROPIC_API_KEY")?,
            llm_model: lookup("LLM_MODEL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_max_output_tokens,
            llm_timeout: Duration::from_secs(llm_timeout_secs),
            llm_max_attempts,
            pipeline_timeout: Duration::from_secs(pipeline_timeout_secs),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            model: self.llm_model.clone(),
            max_output_tokens: self.llm_max_output_tokens,
            timeout: self.llm_timeout,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.llm_max_attempts,
            ..RetryPolicy::default()
        }
    }
}

fn require_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_only_key_is_set() {
        let config = config_from(&[("ANTHROPIC_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.anthropic_api_key, "sk-test");
        assert_eq!(config.llm_model, DEFAULT_MODEL);
        assert_eq!(config.llm_max_output_tokens, 4096);
        assert_eq!(config.llm_timeout, Duration::from_secs(120));
        assert_eq!(config.pipeline_timeout, Duration::from_secs(180));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.completion_config(), CompletionConfig::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));

        let err = config_from(&[("ANTHROPIC_API_KEY", "   ")]).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_overrides_flow_into_completion_config() {
        let config = config_from(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("LLM_MODEL", "claude-haiku-4-5"),
            ("LLM_MAX_OUTPUT_TOKENS", "2048"),
            ("LLM_TIMEOUT_SECS", "30"),
            ("PORT", "9000"),
        ])
        .unwrap();
        let completion = config.completion_config();
        assert_eq!(completion.model, "claude-haiku-4-5");
        assert_eq!(completion.max_output_tokens, 2048);
        assert_eq!(completion.timeout, Duration::from_secs(30));
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        let err = config_from(&[("ANTHROPIC_API_KEY", "sk-test"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let err = config_from(&[("ANTHROPIC_API_KEY", "sk-test"), ("LLM_TIMEOUT_SECS", "0")])
            .unwrap_err();
        assert!(err.to_string().contains("LLM_TIMEOUT_SECS"));
    }

    #[test]
    fn test_attempt_budget_flows_into_retry_policy() {
        let config =
            config_from(&[("ANTHROPIC_API_KEY", "sk-test"), ("LLM_MAX_ATTEMPTS", "5")]).unwrap();
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_backoff, RetryPolicy::default().base_backoff);

        let err = config_from(&[("ANTHROPIC_API_KEY", "sk-test"), ("LLM_MAX_ATTEMPTS", "0")])
            .unwrap_err();
        assert!(err.to_string().contains("LLM_MAX_ATTEMPTS"));
    }
}
