//! aims-gen - AI music generation service
//!
//! Forwards text prompts to a text-to-audio model and images to a
//! captioning model, writing generated audio as WAV files served back by id.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aims_gen::config::{Args, ServiceConfig};
use aims_gen::inference::{ImageCaptioner, MusicModel, RemoteCaptioner, RemoteMusicModel};
use aims_gen::storage::OutputStore;
use aims_gen::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ServiceConfig::resolve(args).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "aims_gen={level},aims_common={level},tower_http={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting AI Music Service (aims-gen) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let store = OutputStore::new(config.output_dir.clone());
    store
        .ensure_directory_exists()
        .with_context(|| format!("Failed to create output directory {}", store.dir().display()))?;
    info!("Output directory: {}", store.dir().display());

    info!("Initializing music model...");
    let music_model = RemoteMusicModel::connect(&config.music_backend)
        .await
        .context("Failed to start service - music model initialization failed")?;
    info!(
        "Music model: {} on {} ({} Hz)",
        music_model.name(),
        music_model.device(),
        music_model.sample_rate()
    );

    info!("Initializing image captioning model...");
    let captioner = match RemoteCaptioner::connect(&config.caption_backend).await {
        Ok(captioner) => {
            info!("Caption model: {}", captioner.name());
            Some(captioner)
        }
        Err(e) => {
            warn!("Caption model failed to initialize, but music model is ready: {:#}", e);
            None
        }
    };

    let mut state = AppState::new(store, config.generation.clone(), config.caption.clone())
        .with_cors_origins(config.cors_origins.clone())
        .with_music_model(Arc::new(music_model));
    if let Some(captioner) = captioner {
        state = state.with_captioner(Arc::new(captioner));
        info!("All models initialized successfully!");
    }

    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("CORS origins: {}", config.cors_origins.join(", "));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
