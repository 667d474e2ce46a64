use serde::{Deserialize, Serialize};

/// One timestamped span of transcribed speech
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    pub text: String,
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
}

impl TranscriptionSegment {
    /// Render as `[MM:SS -> MM:SS] text`
    pub fn format(&self) -> String {
        format!(
            "[{} -> {}] {}",
            format_timestamp(self.start),
            format_timestamp(self.end),
            self.text
        )
    }
}

/// Full result of transcribing a recording or file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Formatted transcript, one timestamped segment per line
    pub text: String,
    pub segments: Vec<TranscriptionSegment>,
    pub language: Option<String>,
}

impl TranscriptionResult {
    pub fn from_segments(segments: Vec<TranscriptionSegment>, language: Option<String>) -> Self {
        let text = segments
            .iter()
            .map(TranscriptionSegment::format)
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            text,
            segments,
            language,
        }
    }
}

/// Convert seconds to MM:SS
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
