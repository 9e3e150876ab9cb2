//! Audio loading utilities.
//!
//! Recognizers take 16-bit-equivalent floats: samples on the `i16` scale
//! (±32768) stored as `f32`, whatever the file's own sample format.

use crate::error::{AudioError, Result};
use hound::{SampleFormat, WavReader, WavSpec};
use std::path::Path;

/// Load audio from a WAV file as interleaved 16-bit-equivalent samples.
///
/// Returns audio samples and WAV specification.
///
/// # Errors
///
/// Returns error if file cannot be read or has unsupported format.
pub fn load_audio<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavSpec)> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|s| s * 32768.0))
            .collect::<hound::Result<_>>()?,
        SampleFormat::Int => {
            let scale = 2f32.powi(16 - i32::from(spec.bits_per_sample));
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<hound::Result<_>>()?
        }
    };

    tracing::debug!(
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        bits = spec.bits_per_sample,
        samples = samples.len(),
        "loaded audio"
    );

    Ok((samples, spec))
}

/// Average interleaved channels into one.
///
/// # Errors
///
/// Returns error if the channel count is 0 or greater than 2.
pub fn downmix(samples: Vec<f32>, channels: u16) -> Result<Vec<f32>> {
    match channels {
        1 => Ok(samples),
        2 => Ok(samples
            .chunks(2)
            .map(|chunk| chunk.iter().sum::<f32>() / 2.0)
            .collect()),
        n => Err(AudioError::InvalidChannels(n).into()),
    }
}

/// Load a WAV file as mono samples, returning them with the file's rate.
///
/// Converts stereo to mono if needed.
pub fn read_audio_mono(path: impl AsRef<Path>) -> Result<(Vec<f32>, u32)> {
    let (audio, spec) = load_audio(path)?;
    Ok((downmix(audio, spec.channels)?, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use hound::WavWriter;

    const SAMPLE_RATE: u32 = 16000;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn int16_keeps_sample_scale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, 1, SAMPLE_RATE, &[0, 1000, -32768]);

        let (audio, rate) = read_audio_mono(&path).unwrap();

        assert_eq!(rate, SAMPLE_RATE);
        assert_eq!(audio, vec![0.0, 1000.0, -32768.0]);
    }

    #[test]
    fn stereo_is_averaged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 2, SAMPLE_RATE, &[100, 300, -50, 50]);

        let (audio, _) = read_audio_mono(&path).unwrap();

        assert_eq!(audio.len(), 2);
        assert!((audio[0] - 200.0).abs() < 0.001);
        assert!(audio[1].abs() < 0.001);
    }

    #[test]
    fn file_rate_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("8k.wav");
        write_wav(&path, 1, 8000, &[0; 16]);

        let (audio, rate) = read_audio_mono(&path).unwrap();

        assert_eq!(rate, 8000);
        assert_eq!(audio.len(), 16);
    }

    #[test]
    fn too_many_channels_is_rejected() {
        let result = downmix(vec![0.0; 6], 3);
        assert!(matches!(result, Err(Error::Audio(AudioError::InvalidChannels(3)))));
    }

    #[test]
    fn missing_file_is_hound_error() {
        let result = load_audio("/nonexistent/audio.wav");
        assert!(matches!(result, Err(Error::Audio(_))));
    }
}
