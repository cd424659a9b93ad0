//! Audio buffers produced by generation and the PCM waveform persisted to disk

mod postprocess;
mod wav;

pub use postprocess::{postprocess, AudioLayout, SILENCE_THRESHOLD, SILENT_FALLBACK_GAIN};
pub use wav::encode_wav;

/// Raw floating-point output of a generation call
///
/// Sample values are nominally in [-1, 1] but model output may exceed that
/// range; [`postprocess`] handles both.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAudioBuffer {
    /// One-dimensional buffer, shape `(samples,)`
    Mono(Vec<f32>),
    /// Channel-major buffer, shape `(channels, samples)`
    Planar(Vec<Vec<f32>>),
}

impl RawAudioBuffer {
    /// Number of channels (1 for [`RawAudioBuffer::Mono`])
    pub fn channels(&self) -> usize {
        match self {
            RawAudioBuffer::Mono(_) => 1,
            RawAudioBuffer::Planar(planes) => planes.len(),
        }
    }

    /// Samples per channel, taken from the first channel
    pub fn frames(&self) -> usize {
        match self {
            RawAudioBuffer::Mono(samples) => samples.len(),
            RawAudioBuffer::Planar(planes) => planes.first().map_or(0, Vec::len),
        }
    }
}

/// Quantized 16-bit PCM audio, interleaved as `(frames, channels)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmWaveform {
    channels: u16,
    samples: Vec<i16>,
}

impl PcmWaveform {
    /// Build from interleaved samples
    ///
    /// `samples.len()` must be a multiple of `channels`; callers inside this
    /// crate guarantee it.
    pub(crate) fn from_interleaved(channels: u16, samples: Vec<i16>) -> Self {
        debug_assert!(channels > 0);
        debug_assert_eq!(samples.len() % channels as usize, 0);
        Self { channels, samples }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// `(frames, channels)`
    pub fn shape(&self) -> (usize, usize) {
        (self.frames(), self.channels as usize)
    }

    /// All samples, interleaved
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// One frame: one sample per channel
    pub fn frame(&self, index: usize) -> Option<&[i16]> {
        let width = self.channels as usize;
        let start = index.checked_mul(width)?;
        self.samples.get(start..start + width)
    }
}
