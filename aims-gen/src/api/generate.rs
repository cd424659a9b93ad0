//! Music generation handlers
//!
//! POST /generate, POST /batch-generate
//!
//! Each track: enhance prompt → model call (under the inference lock) →
//! post-process → WAV file keyed by a fresh UUID.

use aims_common::config::GenerationConfig;
use aims_common::{enhance, postprocess};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    inference::{GenerationParams, MusicModel},
    storage::OutputStore,
    AppState,
};

/// Carries the file id when /generate answers with raw WAV bytes
pub const FILE_ID_HEADER: &str = "x-file-id";

/// POST /generate request
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    /// Seconds; defaults to the configured default, capped at the maximum
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub with_vocals: bool,
    /// False returns the WAV bytes instead of a download path
    #[serde(default = "default_return_url")]
    pub return_url: bool,
}

fn default_return_url() -> bool {
    true
}

/// POST /generate response
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub file_id: Uuid,
    pub file_path: String,
    pub duration: f64,
    pub sample_rate: u32,
    /// Enhanced prompt actually sent to the model
    pub prompt: String,
    pub timestamp: DateTime<Utc>,
}

/// One entry of a batch request
#[derive(Debug, Deserialize)]
pub struct BatchPrompt {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// POST /batch-generate request
#[derive(Debug, Deserialize)]
pub struct BatchGenerateRequest {
    #[serde(default)]
    pub prompts: Vec<BatchPrompt>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub with_vocals: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchSong {
    pub title: String,
    pub file_id: Uuid,
    pub file_path: String,
    pub prompt: String,
}

/// POST /batch-generate response
#[derive(Debug, Serialize)]
pub struct BatchGenerateResponse {
    pub success: bool,
    pub songs: Vec<BatchSong>,
    pub count: usize,
}

/// A generated and stored track
#[derive(Debug, Clone)]
pub struct GeneratedTrack {
    pub file_id: Uuid,
    pub sample_rate: u32,
    /// Encoded WAV file, identical to the stored copy
    pub wav: Vec<u8>,
}

/// Apply the default and the upper bound to a requested duration
pub fn resolve_duration(requested: Option<f64>, config: &GenerationConfig) -> ApiResult<f64> {
    let duration = requested.unwrap_or(config.default_duration_secs);
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ApiError::BadRequest(format!(
            "Duration must be a positive number of seconds, got {}",
            duration
        )));
    }
    Ok(duration.min(config.max_duration_secs))
}

fn music_model(state: &AppState) -> ApiResult<Arc<dyn MusicModel>> {
    state
        .music_model
        .clone()
        .ok_or_else(|| ApiError::ModelUnavailable("Model not initialized".to_string()))
}

/// Generate, post-process and store one track for an enhanced prompt
pub async fn render_track(
    state: &AppState,
    model: &dyn MusicModel,
    prompt: &str,
    duration_secs: f64,
) -> ApiResult<GeneratedTrack> {
    let params = GenerationParams::for_duration(duration_secs, &state.generation);
    info!(
        prompt = %prompt,
        duration_secs,
        max_new_tokens = params.max_new_tokens,
        "Generating music"
    );

    let raw = {
        let _guard = state.inference_lock.lock().await;
        model
            .generate(prompt, &params)
            .await
            .map_err(|e| ApiError::Inference(format!("{:#}", e)))?
    };
    debug!(channels = raw.channels(), frames = raw.frames(), "Raw audio received");

    let (waveform, layout) = postprocess(&raw)?;
    drop(raw);

    let file_id = Uuid::new_v4();
    let sample_rate = model.sample_rate();
    let wav = state.store.save(file_id, waveform, sample_rate).await?;

    info!(
        file_id = %file_id,
        channels = layout.channels,
        frames = layout.frames,
        peak = layout.peak,
        silent_fallback = layout.silent_fallback,
        sample_rate,
        "Music generated successfully"
    );

    Ok(GeneratedTrack {
        file_id,
        sample_rate,
        wav,
    })
}

/// POST /generate
///
/// Generate one track from a text prompt.
pub async fn generate_music(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let result = generate_music_inner(&state, payload).await;
    state.track(result).await
}

async fn generate_music_inner(
    state: &AppState,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let model = music_model(state)?;
    let Json(request) = payload?;

    let user_prompt = request
        .prompt
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Prompt is required".to_string()))?;
    let duration = resolve_duration(request.duration, &state.generation)?;

    let prompt = enhance(user_prompt, request.with_vocals)?;
    let track = render_track(state, model.as_ref(), &prompt, duration).await?;

    if !request.return_url {
        return Ok((
            [
                (header::CONTENT_TYPE, "audio/wav".to_string()),
                (HeaderName::from_static(FILE_ID_HEADER), track.file_id.to_string()),
            ],
            track.wav,
        )
            .into_response());
    }

    Ok(Json(GenerateResponse {
        success: true,
        file_id: track.file_id,
        file_path: OutputStore::download_path(track.file_id),
        duration,
        sample_rate: track.sample_rate,
        prompt,
        timestamp: Utc::now(),
    })
    .into_response())
}

/// POST /batch-generate
///
/// Generate one track per prompt. Entries without a prompt are skipped; any
/// generation failure aborts the batch.
pub async fn batch_generate(
    State(state): State<AppState>,
    payload: Result<Json<BatchGenerateRequest>, JsonRejection>,
) -> ApiResult<Json<BatchGenerateResponse>> {
    let result = batch_generate_inner(&state, payload).await;
    state.track(result).await
}

async fn batch_generate_inner(
    state: &AppState,
    payload: Result<Json<BatchGenerateRequest>, JsonRejection>,
) -> ApiResult<Json<BatchGenerateResponse>> {
    let model = music_model(state)?;
    let Json(request) = payload?;

    if request.prompts.is_empty() {
        return Err(ApiError::BadRequest("Prompts list is required".to_string()));
    }
    let duration = resolve_duration(request.duration, &state.generation)?;

    let mut songs = Vec::with_capacity(request.prompts.len());
    for item in request.prompts {
        let title = item.title.unwrap_or_else(|| "Untitled".to_string());
        let Some(user_prompt) = item.prompt.filter(|p| !p.trim().is_empty()) else {
            debug!(title = %title, "Skipping batch entry without prompt");
            continue;
        };

        let prompt = enhance(&user_prompt, request.with_vocals)?;
        info!(title = %title, "Generating batch entry");
        let track = render_track(state, model.as_ref(), &prompt, duration).await?;

        songs.push(BatchSong {
            title,
            file_id: track.file_id,
            file_path: OutputStore::download_path(track.file_id),
            prompt,
        });
    }

    let count = songs.len();
    Ok(Json(BatchGenerateResponse {
        success: true,
        songs,
        count,
    }))
}

/// Build generation routes
pub fn generate_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate_music))
        .route("/batch-generate", post(batch_generate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_defaults_to_ten_seconds() {
        let config = GenerationConfig::default();
        assert_eq!(resolve_duration(None, &config).unwrap(), 10.0);
    }

    #[test]
    fn test_duration_capped_at_thirty_seconds() {
        let config = GenerationConfig::default();
        assert_eq!(resolve_duration(Some(120.0), &config).unwrap(), 30.0);
        assert_eq!(resolve_duration(Some(12.5), &config).unwrap(), 12.5);
    }

    #[test]
    fn test_invalid_durations_rejected() {
        let config = GenerationConfig::default();
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                resolve_duration(Some(bad), &config),
                Err(ApiError::BadRequest(_))
            ));
        }
    }
}
