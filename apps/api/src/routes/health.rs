use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Liveness plus the completion model this instance is configured for.
/// Does not call the completion service.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.config.llm_model,
        "max_upload_bytes": state.config.max_upload_bytes
    }))
}
