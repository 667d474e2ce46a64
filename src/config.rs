use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub transcriber: TranscriberConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Sample rate for capture and transcription (Whisper expects 16kHz).
    /// Capture always downmixes the device layout to mono at this rate.
    pub sample_rate: u32,
    /// Samples per capture frame
    pub frame_samples: usize,
    /// Silence threshold as a fraction of full-scale amplitude
    pub silence_threshold: f32,
    /// Consecutive silent frames tolerated before the window is discarded
    pub silence_reset_frames: u32,
    /// Wall-clock interval between chunk emissions, in milliseconds
    pub emit_interval_ms: u64,
    /// Window cap before a forced emission, in seconds of audio
    pub max_window_secs: u64,
    /// Audio retained across an emission boundary, in seconds
    pub tail_secs: u64,
    /// Directory for temporary recording artifacts
    pub temp_dir: PathBuf,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // Whisper expects 16kHz
            frame_samples: 4096,
            silence_threshold: 0.01,
            silence_reset_frames: 10,
            emit_interval_ms: 1000,
            max_window_secs: 2,
            tail_secs: 1,
            temp_dir: PathBuf::from("temp"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriberConfig {
    /// Registered transcriber name (e.g. "whisper")
    pub model: String,
    /// Path to the model file on disk
    pub model_path: PathBuf,
    /// Language hint ("auto" enables detection)
    pub language: String,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            model: "whisper".to_string(),
            model_path: PathBuf::from("models/ggml-base.bin"),
            language: "auto".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
