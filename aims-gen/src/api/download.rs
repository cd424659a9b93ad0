//! GET /download/:file_id

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::{error::ApiResult, AppState};

/// GET /download/:file_id
///
/// Serve a generated WAV file as an attachment.
pub async fn download_music(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<Response> {
    let (id, bytes) = state.store.load(&file_id).await?;
    tracing::debug!(file_id = %id, bytes = bytes.len(), "Serving generated file");

    Ok((
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"generated_{}.wav\"", id),
            ),
        ],
        bytes,
    )
        .into_response())
}

pub fn download_routes() -> Router<AppState> {
    Router::new().route("/download/:file_id", get(download_music))
}
