mod brief;
mod config;
mod documents;
mod errors;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::brief::pipeline::Pipeline;
use crate::config::Config;
use crate::llm_client::AnthropicClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Prep API v{}", env!("CARGO_PKG_VERSION"));

    // One HTTP pool for the completion service and JD fetches
    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    // Initialize completion client and pipeline
    let llm = AnthropicClient::new(http.clone(), config.anthropic_api_key.clone());
    let completion = config.completion_config();
    info!(
        "Completion client initialized (model: {}, max_output_tokens: {}, timeout: {:?}, attempts: {})",
        completion.model, completion.max_output_tokens, completion.timeout, config.llm_max_attempts
    );
    let pipeline =
        Pipeline::new(Arc::new(llm), completion).with_retry_policy(config.retry_policy());

    let state = AppState {
        pipeline,
        http,
        config: config.clone(),
    };

    // Build router
    // TODO: restrict origins once the web client has a fixed host
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!(
        "Listening on {addr} (pipeline timeout: {:?}, max upload: {} bytes)",
        config.pipeline_timeout, config.max_upload_bytes
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
