use serde::{Deserialize, Serialize};

use crate::transcribe::TranscriptionResult;

/// Inbound control messages from the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ControlMessage {
    StartRecording,
    StopRecording,
    ProcessAudioFile {
        #[serde(rename = "filePath")]
        file_path: String,
    },
}

/// Outbound status and result messages to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ResponseMessage {
    RecordingStarted { status: String },
    RecordingStopped { status: String },
    /// Best-effort partial result for one emitted chunk
    TranscriptionProgress(String),
    /// Authoritative result for a complete recording or file
    TranscriptionComplete(TranscriptionResult),
    Error { message: String },
}

impl ResponseMessage {
    pub fn recording_started() -> Self {
        Self::RecordingStarted {
            status: "ok".to_string(),
        }
    }

    pub fn recording_stopped() -> Self {
        Self::RecordingStopped {
            status: "ok".to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
