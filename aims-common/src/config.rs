//! TOML bootstrap configuration
//!
//! The TOML file is the third configuration tier:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Built-in defaults (code constants)
//!
//! Tiers 1 and 2 are applied by the service binary on top of the
//! [`TomlConfig`] returned here. A missing file yields defaults; a file that
//! exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Directory generated WAV files are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Origins allowed by CORS
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub caption: CaptionConfig,

    /// Text-to-audio inference runtime
    #[serde(default)]
    pub music_backend: BackendConfig,

    /// Image captioning inference runtime
    #[serde(default)]
    pub caption_backend: BackendConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Music generation limits and sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Duration used when a request omits one (seconds)
    #[serde(default = "default_duration_secs")]
    pub default_duration_secs: f64,

    /// Upper bound applied to every requested duration (seconds)
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: f64,

    /// Audio tokens generated per second of output
    #[serde(default = "default_tokens_per_second")]
    pub tokens_per_second: u32,

    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

/// Image captioning settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionConfig {
    /// Maximum caption length in tokens
    #[serde(default = "default_caption_max_length")]
    pub max_length: u32,
}

/// Connection settings for one inference runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL, e.g. `http://127.0.0.1:8000` (None = not configured)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,

    /// Device label reported by /health when the runtime does not say
    #[serde(default)]
    pub device: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_port() -> u16 {
    5000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated_music")
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

fn default_duration_secs() -> f64 {
    10.0
}

fn default_max_duration_secs() -> f64 {
    30.0
}

fn default_tokens_per_second() -> u32 {
    50
}

fn default_guidance_scale() -> f32 {
    3.5
}

fn default_temperature() -> f32 {
    0.9
}

fn default_top_k() -> u32 {
    250
}

fn default_top_p() -> f32 {
    0.95
}

fn default_caption_max_length() -> u32 {
    50
}

fn default_backend_timeout_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            output_dir: default_output_dir(),
            cors_origins: default_cors_origins(),
            generation: GenerationConfig::default(),
            caption: CaptionConfig::default(),
            music_backend: BackendConfig::default(),
            caption_backend: BackendConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: default_duration_secs(),
            max_duration_secs: default_max_duration_secs(),
            tokens_per_second: default_tokens_per_second(),
            guidance_scale: default_guidance_scale(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            max_length: default_caption_max_length(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_backend_timeout_secs(),
            device: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        let generation = &self.generation;
        if !(generation.max_duration_secs.is_finite() && generation.max_duration_secs > 0.0) {
            return Err(Error::Config(format!(
                "generation.max_duration_secs must be positive, got {}",
                generation.max_duration_secs
            )));
        }
        let default_secs = generation.default_duration_secs;
        if !(default_secs.is_finite() && default_secs > 0.0) {
            return Err(Error::Config(format!(
                "generation.default_duration_secs must be positive, got {}",
                default_secs
            )));
        }
        if generation.tokens_per_second == 0 {
            return Err(Error::Config("generation.tokens_per_second must be non-zero".to_string()));
        }
        if !(generation.top_p > 0.0 && generation.top_p <= 1.0) {
            return Err(Error::Config(format!(
                "generation.top_p must be in (0, 1], got {}",
                generation.top_p
            )));
        }
        if generation.temperature <= 0.0 {
            return Err(Error::Config(format!(
                "generation.temperature must be positive, got {}",
                generation.temperature
            )));
        }
        if self.caption.max_length == 0 {
            return Err(Error::Config("caption.max_length must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Default TOML path for a service: `<config_dir>/aims/<service>.toml`
pub fn default_config_path(service: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("aims").join(format!("{}.toml", service)))
}

/// Parse and validate a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse TOML {}: {}", path.display(), e)))?;
    config.validate()?;
    info!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}

/// Load the TOML tier for a service
///
/// An explicitly given path must exist. Without one, the default path is
/// used if present, otherwise built-in defaults.
pub fn resolve_toml_config(explicit: Option<&Path>, service: &str) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        return load_toml_config(path);
    }

    match default_config_path(service) {
        Some(path) if path.exists() => load_toml_config(&path),
        _ => {
            info!("No config file found for {}, using built-in defaults", service);
            Ok(TomlConfig::default())
        }
    }
}

/// Split a comma separated origin list, dropping blanks
pub fn parse_origin_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
