use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;
use tracing::info;

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

        let spec = reader.spec();
        let samples: Vec<i16> = match spec.sample_format {
            hound::SampleFormat::Int => reader
                .into_samples::<i16>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .map(|s| {
                    s.map(|v| (v * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
                })
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
        };

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels",
            duration_seconds, spec.sample_rate, spec.channels
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Convert to mono 16kHz for the transcription engine
    pub fn to_mono_16khz(&self) -> Vec<i16> {
        let mono = if self.channels == 2 {
            stereo_to_mono(&self.samples)
        } else {
            self.samples.clone()
        };
        downsample(&mono, self.sample_rate, 16000)
    }
}

/// Sum left and right channels, clamped to i16 range
fn stereo_to_mono(samples: &[i16]) -> Vec<i16> {
    samples
        .chunks_exact(2)
        .map(|pair| {
            let sum = pair[0] as i32 + pair[1] as i32;
            sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16
        })
        .collect()
}

/// Downsample by decimation; rates below the target are passed through
fn downsample(samples: &[i16], source_rate: u32, target_rate: u32) -> Vec<i16> {
    if source_rate <= target_rate {
        return samples.to_vec();
    }
    let ratio = (source_rate / target_rate).max(1) as usize;
    samples.iter().step_by(ratio).copied().collect()
}
