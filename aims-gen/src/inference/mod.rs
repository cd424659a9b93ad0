//! Model backends
//!
//! The service never loads model weights itself. Generation and captioning
//! are delegated to an inference runtime behind [`MusicModel`] and
//! [`ImageCaptioner`]; handlers receive the instances through `AppState`.
//!
//! Implementations need not be safe for concurrent calls: the service holds
//! its inference lock around every call.

mod remote;

pub use remote::{RemoteCaptioner, RemoteMusicModel};

use aims_common::config::{CaptionConfig, GenerationConfig};
use aims_common::RawAudioBuffer;
use async_trait::async_trait;
use serde::Serialize;

/// Sampling settings for one music generation call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParams {
    pub max_new_tokens: usize,
    pub do_sample: bool,
    pub guidance_scale: f32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

impl GenerationParams {
    /// Token budget for `duration_secs` of audio, sampling settings from config
    ///
    /// `max_new_tokens` is `floor(duration_secs * tokens_per_second)`.
    pub fn for_duration(duration_secs: f64, config: &GenerationConfig) -> Self {
        let tokens = (duration_secs * config.tokens_per_second as f64).floor();
        Self {
            max_new_tokens: tokens.max(0.0) as usize,
            do_sample: true,
            guidance_scale: config.guidance_scale,
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
        }
    }
}

/// Settings for one captioning call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionParams {
    pub max_length: u32,
}

impl From<&CaptionConfig> for CaptionParams {
    fn from(config: &CaptionConfig) -> Self {
        Self {
            max_length: config.max_length,
        }
    }
}

/// Text-to-audio generator
#[async_trait]
pub trait MusicModel: Send + Sync {
    /// Model identifier, e.g. "facebook/musicgen-medium"
    fn name(&self) -> &str;

    /// Device the model runs on, e.g. "cuda" or "cpu"
    fn device(&self) -> &str;

    /// Sample rate of generated audio in Hz
    fn sample_rate(&self) -> u32;

    /// Generate raw audio for an (already enhanced) prompt
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> anyhow::Result<RawAudioBuffer>;
}

/// Image-to-text captioner
#[async_trait]
pub trait ImageCaptioner: Send + Sync {
    fn name(&self) -> &str;

    /// Describe the image in `image` (encoded PNG/JPEG/... bytes)
    async fn caption(&self, image: &[u8], params: &CaptionParams) -> anyhow::Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_budget_is_fifty_per_second() {
        let config = GenerationConfig::default();
        assert_eq!(GenerationParams::for_duration(10.0, &config).max_new_tokens, 500);
        assert_eq!(GenerationParams::for_duration(30.0, &config).max_new_tokens, 1500);
        assert_eq!(GenerationParams::for_duration(2.55, &config).max_new_tokens, 127);
    }

    #[test]
    fn test_sampling_settings_come_from_config() {
        let params = GenerationParams::for_duration(1.0, &GenerationConfig::default());
        assert!(params.do_sample);
        assert_eq!(params.guidance_scale, 3.5);
        assert_eq!(params.temperature, 0.9);
        assert_eq!(params.top_k, 250);
        assert_eq!(params.top_p, 0.95);
    }

    #[test]
    fn test_caption_params_from_config() {
        let params = CaptionParams::from(&CaptionConfig::default());
        assert_eq!(params.max_length, 50);
    }
}
