//! Image analysis handler
//!
//! POST /analyze-image: caption an image and suggest a music prompt for it.

use aims_common::suggest_prompt;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    inference::CaptionParams,
    AppState,
};

/// POST /analyze-image request
#[derive(Debug, Deserialize)]
pub struct AnalyzeImageRequest {
    /// Base64 image data, optionally as a data URL (`data:image/png;base64,...`)
    #[serde(default)]
    pub image: Option<String>,
}

/// POST /analyze-image response
#[derive(Debug, Serialize)]
pub struct AnalyzeImageResponse {
    pub success: bool,
    pub caption: String,
    pub suggested_prompt: String,
}

/// Decode base64 image data, dropping a data URL prefix if present
pub fn decode_image_payload(data: &str) -> ApiResult<Vec<u8>> {
    let encoded = match data.split_once(',') {
        Some((_, rest)) => rest,
        None => data,
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ApiError::BadRequest(format!("Invalid base64 image data: {}", e)))?;

    if !infer::is_image(&bytes) {
        return Err(ApiError::BadRequest("Unsupported image data".to_string()));
    }

    Ok(bytes)
}

/// POST /analyze-image
pub async fn analyze_image(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeImageRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeImageResponse>> {
    let result = analyze_image_inner(&state, payload).await;
    state.track(result).await
}

async fn analyze_image_inner(
    state: &AppState,
    payload: Result<Json<AnalyzeImageRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeImageResponse>> {
    let captioner = state
        .captioner
        .clone()
        .ok_or_else(|| ApiError::ModelUnavailable("BLIP model not initialized".to_string()))?;
    let Json(request) = payload?;

    let data = request
        .image
        .filter(|image| !image.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Image data is required".to_string()))?;

    info!("Analyzing image...");
    let image = decode_image_payload(&data)?;
    let params = CaptionParams::from(&state.caption);

    let caption = {
        let _guard = state.inference_lock.lock().await;
        captioner
            .caption(&image, &params)
            .await
            .map_err(|e| ApiError::Inference(format!("{:#}", e)))?
    };

    if caption.is_empty() {
        return Err(ApiError::Inference("Caption model returned an empty caption".to_string()));
    }
    info!(caption = %caption, "Generated caption");

    let suggested_prompt = suggest_prompt(&caption)?;

    Ok(Json(AnalyzeImageResponse {
        success: true,
        caption,
        suggested_prompt,
    }))
}

pub fn image_routes() -> Router<AppState> {
    Router::new().route("/analyze-image", post(analyze_image))
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG
    const PNG_BASE64: &str = concat!(
        "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNk",
        "YAAAAAYAAjCB0C8AAAAASUVORK5CYII="
    );

    #[test]
    fn test_decode_plain_base64() {
        let bytes = decode_image_payload(PNG_BASE64).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_decode_data_url() {
        let data_url = format!("data:image/png;base64,{}", PNG_BASE64);
        let bytes = decode_image_payload(&data_url).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(matches!(
            decode_image_payload("not base64!!"),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_non_image_rejected() {
        let text = base64::engine::general_purpose::STANDARD.encode("hello world");
        assert!(matches!(
            decode_image_payload(&text),
            Err(ApiError::BadRequest(msg)) if msg == "Unsupported image data"
        ));
    }
}
