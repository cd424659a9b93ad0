//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// True when the music model is available
    pub model_loaded: bool,
    /// True when the caption model is available
    pub caption_model_loaded: bool,
    /// Music model identifier reported by the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// Caption model identifier reported by the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_model_name: Option<String>,
    /// Device the music model runs on ("unknown" without a model)
    pub device: String,
    /// Module name ("aims-gen")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Last error message if any (for diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: state.music_model.is_some(),
        caption_model_loaded: state.captioner.is_some(),
        model_name: state.music_model.as_ref().map(|model| model.name().to_string()),
        caption_model_name: state
            .captioner
            .as_ref()
            .map(|captioner| captioner.name().to_string()),
        device: state
            .music_model
            .as_ref()
            .map(|model| model.device().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        module: "aims-gen".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
