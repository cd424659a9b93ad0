//! aims-gen library - AI music generation service
//!
//! Exposes the router and state for the binary and for integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod inference;
pub mod storage;

pub use crate::error::{ApiError, ApiResult};

use aims_common::config::{CaptionConfig, GenerationConfig};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::inference::{ImageCaptioner, MusicModel};
use crate::storage::OutputStore;

/// Largest accepted request body (base64 images)
pub const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Text-to-audio model (None = not initialized)
    pub music_model: Option<Arc<dyn MusicModel>>,
    /// Image captioning model (None = not initialized)
    pub captioner: Option<Arc<dyn ImageCaptioner>>,
    /// Held for the duration of every model call; the inference runtime
    /// cannot serve concurrent calls on one device
    pub inference_lock: Arc<Mutex<()>>,
    pub store: OutputStore,
    pub generation: GenerationConfig,
    pub caption: CaptionConfig,
    pub cors_origins: Vec<String>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(store: OutputStore, generation: GenerationConfig, caption: CaptionConfig) -> Self {
        Self {
            music_model: None,
            captioner: None,
            inference_lock: Arc::new(Mutex::new(())),
            store,
            generation,
            caption,
            cors_origins: Vec::new(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_music_model(mut self, model: Arc<dyn MusicModel>) -> Self {
        self.music_model = Some(model);
        self
    }

    pub fn with_captioner(mut self, captioner: Arc<dyn ImageCaptioner>) -> Self {
        self.captioner = Some(captioner);
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// Pass a handler result through, remembering server-side failures for /health
    pub async fn track<T>(&self, result: ApiResult<T>) -> ApiResult<T> {
        if let Err(error) = &result {
            if error.status().is_server_error() {
                *self.last_error.write().await = Some(error.message());
            }
        }
        result
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_origins);

    Router::new()
        .merge(api::health_routes())
        .merge(api::buildinfo_routes())
        .merge(api::generate_routes())
        .merge(api::download_routes())
        .merge(api::image_routes())
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
