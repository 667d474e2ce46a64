// Shared test doubles: a scripted frame source standing in for the
// microphone and a mock transcriber standing in for the model.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use echoscribe::audio::{AudioFrame, EncodedChunk, FrameSource, SourceGuard};
use echoscribe::config::AudioConfig;
use echoscribe::error::CaptureError;
use echoscribe::session::SourceFactory;
use echoscribe::transcribe::{Transcriber, TranscriptionResult, TranscriptionSegment};

/// Audio config tuned for fast tests: small frames, quick emissions
pub fn test_audio_config(temp_dir: PathBuf) -> AudioConfig {
    AudioConfig {
        sample_rate: 16000,
        frame_samples: 1600,
        silence_threshold: 0.01,
        silence_reset_frames: 10,
        emit_interval_ms: 200,
        max_window_secs: 2,
        tail_secs: 1,
        temp_dir,
    }
}

/// Emits a steady stream of voiced frames, one per `pace`, like a microphone
/// that never stops talking
pub struct ScriptedSource {
    frame_samples: usize,
    sample_rate: u32,
    pace: Duration,
}

impl ScriptedSource {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            frame_samples: config.frame_samples,
            sample_rate: config.sample_rate,
            pace: Duration::from_millis(10),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn open(&mut self) -> Result<SourceGuard, CaptureError> {
        Ok(SourceGuard::new(()))
    }

    fn read(&mut self, _timeout: Duration) -> Result<Option<AudioFrame>, CaptureError> {
        std::thread::sleep(self.pace);
        Ok(Some(AudioFrame {
            samples: vec![2000i16; self.frame_samples],
            sample_rate: self.sample_rate,
            channels: 1,
        }))
    }
}

pub fn scripted_source_factory() -> SourceFactory {
    Arc::new(|config: &AudioConfig| {
        Box::new(ScriptedSource::new(config)) as Box<dyn FrameSource>
    })
}

/// Fails to acquire a device, like a machine with no microphone
pub struct FailingSource;

impl FrameSource for FailingSource {
    fn open(&mut self) -> Result<SourceGuard, CaptureError> {
        Err(CaptureError::DeviceUnavailable(
            "no default input device".to_string(),
        ))
    }

    fn read(&mut self, _timeout: Duration) -> Result<Option<AudioFrame>, CaptureError> {
        Ok(None)
    }
}

pub fn failing_source_factory() -> SourceFactory {
    Arc::new(|_: &AudioConfig| Box::new(FailingSource) as Box<dyn FrameSource>)
}

/// Counts calls and returns canned results
pub struct MockTranscriber {
    pub chunk_calls: AtomicUsize,
    pub file_calls: AtomicUsize,
}

impl MockTranscriber {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            chunk_calls: AtomicUsize::new(0),
            file_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe_chunk(&self, _chunk: EncodedChunk) -> anyhow::Result<String> {
        let n = self.chunk_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("partial {}", n))
    }

    async fn transcribe_file(&self, _path: &Path) -> anyhow::Result<TranscriptionResult> {
        self.file_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TranscriptionResult::from_segments(
            vec![TranscriptionSegment {
                text: "full transcript".to_string(),
                start: 0.0,
                end: 1.0,
            }],
            None,
        ))
    }
}
