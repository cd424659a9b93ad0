//! Inference runtime HTTP adapters
//!
//! The runtime hosts the pretrained models and exposes:
//!
//! ```text
//! GET  {endpoint}/info     -> {"model", "device", "sample_rate"?}
//! POST {endpoint}/generate -> {"audio": [f32] | [[f32]]}
//! POST {endpoint}/caption  -> {"caption"}
//! ```

use super::{CaptionParams, GenerationParams, ImageCaptioner, MusicModel};
use aims_common::config::BackendConfig;
use aims_common::RawAudioBuffer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("aims-gen/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct RuntimeInfo {
    model: String,
    #[serde(default)]
    device: Option<String>,
    #[serde(default)]
    sample_rate: Option<u32>,
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    prompt: &'a str,
    #[serde(flatten)]
    params: &'a GenerationParams,
}

/// `[f32]` for mono output, `[[f32]]` for `(channels, samples)` output
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireAudio {
    Mono(Vec<f32>),
    Planar(Vec<Vec<f32>>),
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    audio: WireAudio,
}

#[derive(Debug, Serialize)]
struct CaptionBody<'a> {
    /// Base64 encoded image bytes
    image: String,
    #[serde(flatten)]
    params: &'a CaptionParams,
}

#[derive(Debug, Deserialize)]
struct CaptionReply {
    caption: String,
}

fn endpoint_of(config: &BackendConfig, role: &str) -> Result<String> {
    let endpoint = config
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .with_context(|| format!("{} backend endpoint is not configured", role))?;
    Ok(endpoint.trim_end_matches('/').to_string())
}

fn build_client(config: &BackendConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

async fn fetch_info(client: &reqwest::Client, endpoint: &str) -> Result<RuntimeInfo> {
    let url = format!("{}/info", endpoint);
    let response = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Inference runtime unreachable at {}", endpoint))?;

    if !response.status().is_success() {
        anyhow::bail!("Inference runtime returned error: {}", response.status());
    }

    response
        .json()
        .await
        .context("Failed to parse inference runtime info")
}

/// Text-to-audio model served by a remote inference runtime
pub struct RemoteMusicModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    device: String,
    sample_rate: u32,
}

impl RemoteMusicModel {
    /// Connect and read model metadata
    ///
    /// Fails if the endpoint is not configured, unreachable, or does not
    /// report a sample rate.
    pub async fn connect(config: &BackendConfig) -> Result<Self> {
        let endpoint = endpoint_of(config, "Music")?;
        let client = build_client(config)?;

        let info = fetch_info(&client, &endpoint).await?;
        let sample_rate = info
            .sample_rate
            .filter(|rate| *rate > 0)
            .context("Music model did not report a sample rate")?;
        let device = info
            .device
            .or_else(|| config.device.clone())
            .unwrap_or_else(|| "unknown".to_string());

        info!(
            model = %info.model,
            device = %device,
            sample_rate,
            "Music model ready at {}",
            endpoint
        );

        Ok(Self {
            client,
            endpoint,
            model: info.model,
            device,
            sample_rate,
        })
    }
}

#[async_trait]
impl MusicModel for RemoteMusicModel {
    fn name(&self) -> &str {
        &self.model
    }

    fn device(&self) -> &str {
        &self.device
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<RawAudioBuffer> {
        debug!(max_new_tokens = params.max_new_tokens, "Requesting generation");

        let response = self
            .client
            .post(format!("{}/generate", self.endpoint))
            .json(&GenerateBody { prompt, params })
            .send()
            .await
            .context("Music generation request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Music generation returned error ({}): {}", status, detail);
        }

        let reply: GenerateReply = response
            .json()
            .await
            .context("Failed to parse generated audio")?;

        Ok(match reply.audio {
            WireAudio::Mono(samples) => RawAudioBuffer::Mono(samples),
            WireAudio::Planar(planes) => RawAudioBuffer::Planar(planes),
        })
    }
}

/// Image captioning model served by a remote inference runtime
pub struct RemoteCaptioner {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl RemoteCaptioner {
    pub async fn connect(config: &BackendConfig) -> Result<Self> {
        let endpoint = endpoint_of(config, "Caption")?;
        let client = build_client(config)?;
        let info = fetch_info(&client, &endpoint).await?;

        info!(model = %info.model, "Caption model ready at {}", endpoint);

        Ok(Self {
            client,
            endpoint,
            model: info.model,
        })
    }
}

#[async_trait]
impl ImageCaptioner for RemoteCaptioner {
    fn name(&self) -> &str {
        &self.model
    }

    async fn caption(&self, image: &[u8], params: &CaptionParams) -> Result<String> {
        let body = CaptionBody {
            image: base64::engine::general_purpose::STANDARD.encode(image),
            params,
        };

        let response = self
            .client
            .post(format!("{}/caption", self.endpoint))
            .json(&body)
            .send()
            .await
            .context("Caption request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Captioning returned error ({}): {}", status, detail);
        }

        let reply: CaptionReply = response.json().await.context("Failed to parse caption")?;
        Ok(reply.caption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_removed() {
        let config = BackendConfig {
            endpoint: Some("http://127.0.0.1:8000/".to_string()),
            ..BackendConfig::default()
        };
        assert_eq!(endpoint_of(&config, "Music").unwrap(), "http://127.0.0.1:8000");
    }

    #[test]
    fn test_missing_endpoint_is_error() {
        assert!(endpoint_of(&BackendConfig::default(), "Music").is_err());

        let blank = BackendConfig {
            endpoint: Some("  ".to_string()),
            ..BackendConfig::default()
        };
        assert!(endpoint_of(&blank, "Caption").is_err());
    }

    #[test]
    fn test_wire_audio_shapes() {
        let mono: GenerateReply = serde_json::from_str(r#"{"audio": [0.1, -0.2]}"#).unwrap();
        assert!(matches!(mono.audio, WireAudio::Mono(ref s) if s.len() == 2));

        let planar: GenerateReply =
            serde_json::from_str(r#"{"audio": [[0.1, 0.2], [0.3, 0.4]]}"#).unwrap();
        assert!(matches!(planar.audio, WireAudio::Planar(ref p) if p.len() == 2));
    }

    #[test]
    fn test_generate_body_flattens_params() {
        let params = GenerationParams::for_duration(1.0, &Default::default());
        let body = serde_json::to_value(GenerateBody {
            prompt: "calm piano",
            params: &params,
        })
        .unwrap();
        assert_eq!(body["prompt"], "calm piano");
        assert_eq!(body["max_new_tokens"], 50);
        assert_eq!(body["top_k"], 250);
    }
}
