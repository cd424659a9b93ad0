//! WAV serialization of PCM waveforms (16-bit integer, interleaved)

use super::PcmWaveform;
use crate::Result;
use std::io::Cursor;

/// Encode a waveform into an in-memory 16-bit PCM WAV file
///
/// CPU bound for long tracks; call from a blocking thread in async contexts.
pub fn encode_wav(waveform: &PcmWaveform, sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: waveform.channels(),
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        let mut samples = writer.get_i16_writer(waveform.samples().len() as u32);
        for &sample in waveform.samples() {
            samples.write_sample(sample);
        }
        samples.flush()?;
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{postprocess, RawAudioBuffer};

    fn stereo_waveform() -> PcmWaveform {
        let raw = RawAudioBuffer::Planar(vec![vec![1.0, 0.5, 0.0], vec![-1.0, -0.5, 0.25]]);
        postprocess(&raw).unwrap().0
    }

    #[test]
    fn test_encode_wav_header_and_samples() {
        let waveform = stereo_waveform();
        let bytes = encode_wav(&waveform, 32_000).unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");

        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 32_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);

        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, waveform.samples());
    }

    #[test]
    fn test_encode_wav_mono_frame_count() {
        let (waveform, _) = postprocess(&RawAudioBuffer::Mono(vec![0.1; 480])).unwrap();
        let bytes = encode_wav(&waveform, 48_000).unwrap();

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.duration(), 480);
    }
}
