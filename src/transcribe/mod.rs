//! Transcription capability
//!
//! The core treats transcription as an external collaborator behind the
//! `Transcriber` trait: a bounded-latency `transcribe_chunk` for incremental
//! progress and an authoritative `transcribe_file` for the complete
//! recording. Engines are selected by name at startup through the registry.

mod registry;
mod result;
mod whisper;

pub use registry::{TranscriberFactory, TranscriberRegistry};
pub use result::{format_timestamp, TranscriptionResult, TranscriptionSegment};
pub use whisper::WhisperTranscriber;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use crate::audio::EncodedChunk;

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one emitted chunk. Returns an empty string when the chunk
    /// is below the quality or length threshold.
    async fn transcribe_chunk(&self, chunk: EncodedChunk) -> Result<String>;

    /// Transcribe a complete audio file, with timestamped segments
    async fn transcribe_file(&self, path: &Path) -> Result<TranscriptionResult>;
}

impl std::fmt::Debug for dyn Transcriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Transcriber")
    }
}
