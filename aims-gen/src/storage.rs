//! Generated file storage
//!
//! Files live at `<output_dir>/<uuid>.wav`. They are written once and never
//! modified; there is no expiry.

use crate::error::{ApiError, ApiResult};
use aims_common::audio::encode_wav;
use aims_common::PcmWaveform;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory if missing
    pub fn ensure_directory_exists(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    pub fn path_for(&self, file_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.wav", file_id))
    }

    /// Public download path for a file id
    pub fn download_path(file_id: Uuid) -> String {
        format!("/download/{}", file_id)
    }

    /// Encode a waveform as WAV and write it under `file_id`
    ///
    /// Returns the encoded file contents.
    pub async fn save(
        &self,
        file_id: Uuid,
        waveform: PcmWaveform,
        sample_rate: u32,
    ) -> ApiResult<Vec<u8>> {
        let bytes = tokio::task::spawn_blocking(move || encode_wav(&waveform, sample_rate))
            .await
            .map_err(|e| ApiError::Internal(format!("WAV encoder task failed: {}", e)))??;

        let path = self.path_for(file_id);
        tokio::fs::write(&path, &bytes).await?;

        debug!(
            file_id = %file_id,
            path = %path.display(),
            bytes = bytes.len(),
            "Saved generated audio"
        );
        Ok(bytes)
    }

    /// Read a stored file
    ///
    /// Ids that are not UUIDs are reported as not found, so the id can never
    /// name a path outside the output directory.
    pub async fn load(&self, file_id: &str) -> ApiResult<(Uuid, Vec<u8>)> {
        let id = Uuid::parse_str(file_id)
            .map_err(|_| ApiError::NotFound("File not found".to_string()))?;

        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok((id, bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ApiError::NotFound("File not found".to_string()))
            }
            Err(e) => Err(ApiError::Io(e)),
        }
    }
}
