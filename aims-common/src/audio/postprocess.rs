//! Conversion of raw generator output into 16-bit PCM
//!
//! Pipeline: transpose `(channels, samples)` to interleaved frames, normalize
//! to unit peak, clip to [-1, 1], quantize to i16.

use super::{PcmWaveform, RawAudioBuffer};
use crate::{Error, Result};
use tracing::{debug, warn};

/// Peak magnitude at or below which a buffer is treated as silent
pub const SILENCE_THRESHOLD: f32 = 1e-8;

/// Gain applied to near-silent buffers instead of peak normalization
pub const SILENT_FALLBACK_GAIN: f32 = 0.1;

const PCM_FULL_SCALE: f32 = 32767.0;

/// Shape and gain information reported alongside the PCM waveform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioLayout {
    pub channels: u16,
    pub frames: usize,
    /// Maximum absolute sample value of the raw input
    pub peak: f32,
    /// True when the input was near-silent and [`SILENT_FALLBACK_GAIN`] was used
    pub silent_fallback: bool,
}

/// Normalize, clip and quantize a raw generator buffer
///
/// - `Planar` input `(channels, samples)` comes out interleaved as
///   `(samples, channels)`; `Mono` input is a single channel.
/// - If the peak magnitude exceeds [`SILENCE_THRESHOLD`] every sample is
///   divided by the peak; otherwise every sample is multiplied by
///   [`SILENT_FALLBACK_GAIN`].
/// - Samples are clipped to [-1.0, 1.0], scaled by 32767 and rounded half
///   away from zero (`f32::round`), so the output is always within
///   `-32767..=32767`.
///
/// # Errors
/// [`Error::InvalidAudioShape`] for an empty buffer, zero channels, zero
/// samples, channels of unequal length, or NaN/infinite samples.
pub fn postprocess(raw: &RawAudioBuffer) -> Result<(PcmWaveform, AudioLayout)> {
    let (channels, interleaved) = interleave(raw)?;

    let peak = interleaved.iter().fold(0.0_f32, |max, x| max.max(x.abs()));
    debug!(peak, channels, "Raw audio peak");

    let silent_fallback = peak <= SILENCE_THRESHOLD;
    if silent_fallback {
        warn!(peak, "Audio is nearly silent, using default normalization");
    }

    let samples: Vec<i16> = interleaved
        .into_iter()
        .map(|x| {
            let normalized = if silent_fallback {
                x * SILENT_FALLBACK_GAIN
            } else {
                x / peak
            };
            round_to_i16(normalized.clamp(-1.0, 1.0) * PCM_FULL_SCALE)
        })
        .collect();

    let waveform = PcmWaveform::from_interleaved(channels, samples);
    let layout = AudioLayout {
        channels,
        frames: waveform.frames(),
        peak,
        silent_fallback,
    };

    Ok((waveform, layout))
}

/// Flatten the buffer into interleaved frames, validating shape and values
fn interleave(raw: &RawAudioBuffer) -> Result<(u16, Vec<f32>)> {
    match raw {
        RawAudioBuffer::Mono(samples) => {
            if samples.is_empty() {
                return Err(Error::InvalidAudioShape("buffer has no samples".to_string()));
            }
            check_finite(samples)?;
            Ok((1, samples.clone()))
        }
        RawAudioBuffer::Planar(planes) => {
            let channels = u16::try_from(planes.len()).map_err(|_| {
                Error::InvalidAudioShape(format!("too many channels: {}", planes.len()))
            })?;
            let frames = raw.frames();
            if channels == 0 || frames == 0 {
                return Err(Error::InvalidAudioShape(format!(
                    "buffer shape ({}, {}) is empty",
                    channels, frames
                )));
            }
            if let Some((index, plane)) = planes
                .iter()
                .enumerate()
                .find(|(_, plane)| plane.len() != frames)
            {
                return Err(Error::InvalidAudioShape(format!(
                    "channel {} has {} samples, expected {}",
                    index,
                    plane.len(),
                    frames
                )));
            }
            for plane in planes {
                check_finite(plane)?;
            }

            let mut interleaved = Vec::with_capacity(frames * planes.len());
            for frame in 0..frames {
                interleaved.extend(planes.iter().map(|plane| plane[frame]));
            }
            Ok((channels, interleaved))
        }
    }
}

fn check_finite(samples: &[f32]) -> Result<()> {
    match samples.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(Error::InvalidAudioShape(format!(
            "non-numeric sample {} at index {}",
            samples[index], index
        ))),
        None => Ok(()),
    }
}

/// Round half away from zero and saturate into i16
fn round_to_i16(scaled: f32) -> i16 {
    scaled.round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_peak_keeps_proportions() {
        let raw = RawAudioBuffer::Mono(vec![0.5, -1.0, 0.25, 0.0]);
        let (pcm, layout) = postprocess(&raw).unwrap();

        assert_eq!(layout.peak, 1.0);
        assert!(!layout.silent_fallback);
        assert_eq!(pcm.samples(), &[16384, -32767, 8192, 0]);
    }

    #[test]
    fn test_out_of_range_input_is_normalized() {
        let raw = RawAudioBuffer::Mono(vec![3.0, -6.0, 1.5]);
        let (pcm, layout) = postprocess(&raw).unwrap();

        assert_eq!(layout.peak, 6.0);
        assert_eq!(pcm.samples(), &[16384, -32767, 8192]);
    }

    #[test]
    fn test_quiet_input_is_boosted_to_full_scale() {
        let raw = RawAudioBuffer::Mono(vec![0.001, -0.002]);
        let (pcm, _) = postprocess(&raw).unwrap();
        assert_eq!(pcm.samples(), &[16384, -32767]);
    }

    #[test]
    fn test_all_zero_input_uses_fallback() {
        let raw = RawAudioBuffer::Planar(vec![vec![0.0; 64], vec![0.0; 64]]);
        let (pcm, layout) = postprocess(&raw).unwrap();

        assert!(layout.silent_fallback);
        assert_eq!(layout.peak, 0.0);
        assert!(pcm.samples().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_near_silent_input_uses_fallback_gain() {
        let raw = RawAudioBuffer::Mono(vec![5e-9, -1e-8]);
        let (pcm, layout) = postprocess(&raw).unwrap();

        assert!(layout.silent_fallback);
        // 1e-8 * 0.1 * 32767 rounds to zero
        assert_eq!(pcm.samples(), &[0, 0]);
    }

    #[test]
    fn test_output_always_within_i16_range() {
        let inputs = [
            RawAudioBuffer::Mono(vec![f32::MAX, f32::MIN, 0.0]),
            RawAudioBuffer::Mono(vec![1e30, -1e-30]),
            RawAudioBuffer::Mono((0..1000).map(|i| (i as f32 * 0.37).sin() * 4.0).collect()),
            RawAudioBuffer::Planar(vec![vec![-2.0, 2.0], vec![0.1, -0.1]]),
        ];
        for raw in &inputs {
            let (pcm, _) = postprocess(raw).unwrap();
            assert!(pcm.samples().iter().all(|&s| (-32767..=32767).contains(&s)));
        }
    }

    #[test]
    fn test_planar_input_is_transposed() {
        let left: Vec<f32> = (0..100).map(|i| i as f32 / 99.0).collect();
        let right: Vec<f32> = left.iter().map(|x| -x * 0.5).collect();
        let raw = RawAudioBuffer::Planar(vec![left, right]);

        let (pcm, layout) = postprocess(&raw).unwrap();

        assert_eq!(pcm.shape(), (100, 2));
        assert_eq!(layout.channels, 2);
        assert_eq!(layout.frames, 100);
        assert_eq!(pcm.frame(0), Some(&[0, 0][..]));
        assert_eq!(pcm.frame(99), Some(&[32767, -16384][..]));
        assert_eq!(pcm.frame(100), None);
    }

    #[test]
    fn test_mono_input_is_single_channel() {
        let raw = RawAudioBuffer::Mono(vec![0.1; 10]);
        let (pcm, _) = postprocess(&raw).unwrap();
        assert_eq!(pcm.shape(), (10, 1));
    }

    #[test]
    fn test_deterministic() {
        let raw = RawAudioBuffer::Mono((0..256).map(|i| (i as f32).cos() * 0.7).collect());
        let (a, _) = postprocess(&raw).unwrap();
        let (b, _) = postprocess(&raw).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!(round_to_i16(2.5), 3);
        assert_eq!(round_to_i16(-2.5), -3);
        assert_eq!(round_to_i16(2.4), 2);
        assert_eq!(round_to_i16(32767.0), 32767);
    }

    #[test]
    fn test_empty_buffers_rejected() {
        let cases = [
            RawAudioBuffer::Mono(vec![]),
            RawAudioBuffer::Planar(vec![]),
            RawAudioBuffer::Planar(vec![vec![], vec![]]),
        ];
        for raw in &cases {
            assert!(
                matches!(postprocess(raw), Err(Error::InvalidAudioShape(_))),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_ragged_channels_rejected() {
        let raw = RawAudioBuffer::Planar(vec![vec![0.1, 0.2, 0.3], vec![0.1]]);
        assert!(matches!(postprocess(&raw), Err(Error::InvalidAudioShape(_))));
    }

    #[test]
    fn test_non_finite_samples_rejected() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let raw = RawAudioBuffer::Planar(vec![vec![0.1, bad]]);
            assert!(matches!(postprocess(&raw), Err(Error::InvalidAudioShape(_))));
        }
    }
}
