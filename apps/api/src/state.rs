use reqwest::Client;

use crate::brief::pipeline::Pipeline;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    /// Used for fetching job descriptions by URL. Shares its pool with the completion client.
    pub http: Client,
    pub config: Config,
}
