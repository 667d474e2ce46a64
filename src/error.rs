//! Error types for the transcription service

use thiserror::Error;

/// Audio capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No input device available: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to open input stream: {0}")]
    Stream(String),

    #[error("Capture thread did not report readiness in time")]
    StartTimeout,
}

/// Transcription engine errors
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("Unknown transcriber model: {0}")]
    UnknownModel(String),

    #[error("Transcription failed: {0}")]
    Failed(String),
}

/// Session lifecycle errors surfaced to the protocol layer
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session has been terminated")]
    Terminated,

    #[error("Failed to start audio capture: {0}")]
    Capture(#[from] CaptureError),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Recording artifact error: {0}")]
    Artifact(String),
}
