//! Whisper speech-to-text engine
//!
//! Wraps `whisper_rs`. The GGML model is loaded once at startup and shared
//! across sessions; inference runs on the blocking thread pool so the async
//! context is never stalled by model latency.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{Transcriber, TranscriptionResult, TranscriptionSegment};
use crate::audio::{AudioFile, EncodedChunk};
use crate::config::TranscriberConfig;

/// Audio shorter than this (0.5s at 16kHz) is skipped rather than fed to the
/// model, which hallucinates on very short input
const MIN_SAMPLES: usize = 8000;

pub struct WhisperTranscriber {
    ctx: Arc<WhisperContext>,
    language: Option<String>,
}

impl WhisperTranscriber {
    pub fn load(config: &TranscriberConfig) -> Result<Self> {
        let model_path = config
            .model_path
            .to_str()
            .ok_or_else(|| anyhow!("Model path is not valid UTF-8"))?;

        info!("Loading whisper model from {}", model_path);
        let ctx =
            WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
                .context("Failed to load whisper model")?;
        info!("Whisper model loaded");

        let language = if config.language.eq_ignore_ascii_case("auto") {
            None
        } else {
            Some(config.language.clone())
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            language,
        })
    }

    fn run(
        ctx: &WhisperContext,
        language: Option<&str>,
        samples: &[f32],
    ) -> Result<TranscriptionResult> {
        let mut state = ctx
            .create_state()
            .context("Failed to create whisper state")?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        match language {
            Some(lang) => {
                params.set_language(Some(lang));
                params.set_detect_language(false);
            }
            None => {
                params.set_language(None);
                params.set_detect_language(true);
            }
        }
        params.set_temperature(0.0);
        params.set_n_threads(num_cpus::get().min(8) as i32);
        params.set_print_progress(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_translate(false);

        state
            .full(params, samples)
            .context("Whisper inference failed")?;

        let num_segments = state
            .full_n_segments()
            .context("Failed to read segment count")?;

        let mut segments: Vec<TranscriptionSegment> = Vec::new();
        for i in 0..num_segments.max(0) {
            let text = state
                .full_get_segment_text_lossy(i)
                .with_context(|| format!("Failed to read segment {}", i))?
                .trim()
                .to_string();

            // Drop repeats and fragments the model tends to emit at
            // window boundaries
            if text.chars().count() < 2 {
                continue;
            }
            if let Some(prev) = segments.last() {
                if prev.text == text || prev.text.ends_with(&text) {
                    continue;
                }
            }

            let start = state.full_get_segment_t0(i).unwrap_or(0) as f64 / 100.0;
            let end = state.full_get_segment_t1(i).unwrap_or(0) as f64 / 100.0;
            segments.push(TranscriptionSegment { text, start, end });
        }

        Ok(TranscriptionResult::from_segments(
            segments,
            language.map(str::to_string),
        ))
    }

    fn samples_from_chunk(chunk: &EncodedChunk) -> Result<Vec<f32>> {
        let reader = hound::WavReader::new(Cursor::new(&chunk.data))
            .context("Failed to decode chunk container")?;
        let samples = reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read chunk samples")?;
        Ok(samples)
    }

    /// Reject output that is mostly one repeated character, a failure mode
    /// of short noisy windows
    fn acceptable_quality(text: &str) -> bool {
        let total = text.chars().count();
        if total == 0 {
            return false;
        }
        let unique: std::collections::HashSet<char> = text.chars().collect();
        unique.len() * 10 >= total * 3
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe_chunk(&self, chunk: EncodedChunk) -> Result<String> {
        let samples = Self::samples_from_chunk(&chunk)?;
        if samples.len() < MIN_SAMPLES {
            return Ok(String::new());
        }

        let ctx = Arc::clone(&self.ctx);
        let language = self.language.clone();
        let result = tokio::task::spawn_blocking(move || {
            Self::run(&ctx, language.as_deref(), &samples)
        })
        .await
        .context("Transcription task failed")??;

        // Incremental windows overlap; only the latest segment is new
        let text = match result.segments.last() {
            Some(segment) if Self::acceptable_quality(&segment.text) => segment.format(),
            _ => String::new(),
        };
        Ok(text)
    }

    async fn transcribe_file(&self, path: &Path) -> Result<TranscriptionResult> {
        let audio = AudioFile::open(path)?;
        let samples: Vec<f32> = audio
            .to_mono_16khz()
            .into_iter()
            .map(|s| s as f32 / 32768.0)
            .collect();
        if samples.len() < MIN_SAMPLES {
            return Ok(TranscriptionResult::default());
        }

        let ctx = Arc::clone(&self.ctx);
        let language = self.language.clone();
        tokio::task::spawn_blocking(move || Self::run(&ctx, language.as_deref(), &samples))
            .await
            .context("Transcription task failed")?
    }
}
