//! Chunk windowing
//!
//! Accumulates frames into bounded windows and encodes each window into a
//! self-describing WAV container when a time or size trigger fires. A ~1s
//! tail of frames survives each emission so speech spanning a window
//! boundary keeps its acoustic context. The full voiced recording is kept
//! separately and flushed to disk as a single artifact on stop.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::capture::AudioFrame;
use crate::config::AudioConfig;

/// One emitted window, packed as a WAV container so a decoder needs no
/// side-channel information
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub sample_count: usize,
    /// Complete WAV payload, header included
    pub data: Vec<u8>,
}

impl EncodedChunk {
    pub fn duration_seconds(&self) -> f64 {
        self.sample_count as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Wall-clock interval between emissions
    pub emit_interval: Duration,
    /// Sample cap that forces an emission
    pub max_window_samples: usize,
    /// Samples retained across an emission boundary
    pub tail_samples: usize,
}

impl WindowConfig {
    pub fn from_audio(config: &AudioConfig) -> Self {
        // Capture delivers mono frames, so the budgets are mono samples
        let per_sec = config.sample_rate as usize;
        Self {
            emit_interval: Duration::from_millis(config.emit_interval_ms),
            max_window_samples: per_sec * config.max_window_secs as usize,
            tail_samples: per_sec * config.tail_secs as usize,
        }
    }
}

pub struct ChunkWindower {
    config: WindowConfig,
    sample_rate: u32,
    channels: u16,
    frames: VecDeque<Vec<i16>>,
    window_samples: usize,
    /// Everything the gate did not discard, for the stop-time artifact
    recording: Vec<i16>,
    last_emit: Instant,
}

impl ChunkWindower {
    pub fn new(sample_rate: u32, channels: u16, config: WindowConfig) -> Self {
        Self {
            config,
            sample_rate,
            channels,
            frames: VecDeque::new(),
            window_samples: 0,
            recording: Vec::new(),
            last_emit: Instant::now(),
        }
    }

    /// Accumulate one frame. Returns at most one encoded chunk, when the
    /// elapsed-time or sample-count trigger fires.
    pub fn push(&mut self, frame: &AudioFrame) -> Option<EncodedChunk> {
        self.window_samples += frame.samples.len();
        self.frames.push_back(frame.samples.clone());
        self.recording.extend_from_slice(&frame.samples);

        let time_due = self.last_emit.elapsed() >= self.config.emit_interval;
        let size_due = self.window_samples >= self.config.max_window_samples;
        if !time_due && !size_due {
            return None;
        }

        let chunk = self.encode_window();
        self.retain_tail();
        self.last_emit = Instant::now();
        chunk
    }

    /// Discard the in-progress window after a silence reset. The accumulated
    /// recording is untouched.
    pub fn discard_window(&mut self) {
        self.frames.clear();
        self.window_samples = 0;
    }

    /// Samples accumulated for the stop-time artifact
    pub fn recorded_samples(&self) -> usize {
        self.recording.len()
    }

    /// Write the full accumulated recording to `path` as a single WAV file
    pub fn flush_to(&self, path: &Path) -> Result<()> {
        let mut writer = hound::WavWriter::create(path, self.wav_spec())
            .with_context(|| format!("Failed to create recording file: {}", path.display()))?;
        for &sample in &self.recording {
            writer
                .write_sample(sample)
                .context("Failed to write sample to recording")?;
        }
        writer
            .finalize()
            .context("Failed to finalize recording file")?;
        debug!(
            "Recording flushed: {} samples to {}",
            self.recording.len(),
            path.display()
        );
        Ok(())
    }

    fn encode_window(&self) -> Option<EncodedChunk> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = match hound::WavWriter::new(&mut cursor, self.wav_spec()) {
                Ok(writer) => writer,
                Err(e) => {
                    warn!("Failed to encode chunk: {}", e);
                    return None;
                }
            };
            for frame in &self.frames {
                for &sample in frame {
                    if let Err(e) = writer.write_sample(sample) {
                        warn!("Failed to encode chunk: {}", e);
                        return None;
                    }
                }
            }
            if let Err(e) = writer.finalize() {
                warn!("Failed to encode chunk: {}", e);
                return None;
            }
        }

        Some(EncodedChunk {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_count: self.window_samples,
            data: cursor.into_inner(),
        })
    }

    /// Drop whole frames from the front while the remainder still holds at
    /// least the configured tail
    fn retain_tail(&mut self) {
        while let Some(front) = self.frames.front() {
            if self.window_samples - front.len() >= self.config.tail_samples {
                self.window_samples -= front.len();
                self.frames.pop_front();
            } else {
                break;
            }
        }
    }

    fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }
}
