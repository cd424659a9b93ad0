//! Configuration resolution for aims-gen
//!
//! **Priority:** CLI → ENV → TOML → built-in default
//!
//! `clap` applies the first two tiers (each flag falls back to its
//! environment variable); anything still unset comes from the TOML file,
//! whose own missing fields carry the built-in defaults.

use aims_common::config::{
    parse_origin_list, resolve_toml_config, BackendConfig, CaptionConfig, GenerationConfig,
    TomlConfig,
};
use aims_common::Result;
use clap::Parser;
use std::path::PathBuf;

/// Service name used for the default config file name
pub const SERVICE_NAME: &str = "aims-gen";

/// Command-line arguments for aims-gen
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "aims-gen")]
#[command(about = "AI music generation service")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "AIMS_HOST")]
    pub host: Option<String>,

    /// TOML config file (default: <config_dir>/aims/aims-gen.toml)
    #[arg(short, long, env = "AIMS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory generated WAV files are written to
    #[arg(short, long, env = "AIMS_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Comma separated list of allowed CORS origins
    #[arg(long, env = "CORS_ORIGINS")]
    pub cors_origins: Option<String>,

    /// Base URL of the text-to-audio inference runtime
    #[arg(long, env = "AIMS_MUSIC_ENDPOINT")]
    pub music_endpoint: Option<String>,

    /// Base URL of the image captioning inference runtime
    #[arg(long, env = "AIMS_CAPTION_ENDPOINT")]
    pub caption_endpoint: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "AIMS_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub output_dir: PathBuf,
    pub cors_origins: Vec<String>,
    pub generation: GenerationConfig,
    pub caption: CaptionConfig,
    pub music_backend: BackendConfig,
    pub caption_backend: BackendConfig,
    pub log_level: String,
}

impl ServiceConfig {
    /// Load the TOML tier (from `--config` or the default path) and apply
    /// CLI/ENV overrides
    pub fn resolve(args: Args) -> Result<Self> {
        let toml = resolve_toml_config(args.config.as_deref(), SERVICE_NAME)?;
        Ok(Self::from_parts(args, toml))
    }

    /// Merge CLI/ENV values over an already loaded TOML config
    pub fn from_parts(args: Args, toml: TomlConfig) -> Self {
        let mut music_backend = toml.music_backend;
        if let Some(endpoint) = args.music_endpoint {
            music_backend.endpoint = Some(endpoint);
        }

        let mut caption_backend = toml.caption_backend;
        if let Some(endpoint) = args.caption_endpoint {
            caption_backend.endpoint = Some(endpoint);
        }

        Self {
            host: args.host.unwrap_or(toml.host),
            port: args.port.unwrap_or(toml.port),
            output_dir: args.output_dir.unwrap_or(toml.output_dir),
            cors_origins: args
                .cors_origins
                .as_deref()
                .map(parse_origin_list)
                .unwrap_or(toml.cors_origins),
            generation: toml.generation,
            caption: toml.caption,
            music_backend,
            caption_backend,
            log_level: args.log_level.unwrap_or(toml.logging.level),
        }
    }

    /// `host:port` for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
