use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audio::{
    ChunkWindower, CpalSource, CaptureEngine, EncodedChunk, FrameSource, SilenceGate,
    WindowConfig,
};
use crate::bridge::{ChunkConsumer, TranscriptionBridge, DEFAULT_DISPATCH_TIMEOUT};
use crate::config::AudioConfig;
use crate::error::{CaptureError, SessionError};
use crate::protocol::ResponseMessage;
use crate::transcribe::{Transcriber, TranscriptionResult};

/// Produces the frame source for a new recording; swappable so tests can
/// drive sessions with synthesized audio
pub type SourceFactory = Arc<dyn Fn(&AudioConfig) -> Box<dyn FrameSource> + Send + Sync>;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Recording,
    Terminated,
}

struct ActiveRecording {
    engine: CaptureEngine,
    /// Cleared on teardown so in-flight dispatches become no-ops
    live: Arc<AtomicBool>,
    artifact: PathBuf,
}

struct SessionState {
    phase: Phase,
    recording: Option<ActiveRecording>,
}

/// Per-connection state: at most one active capture engine, an outbound
/// message sender, and a serialized state machine. All mutation goes through
/// the internal mutex, so start/stop/cleanup never run concurrently for the
/// same session.
pub struct Session {
    id: Uuid,
    outbound: mpsc::Sender<ResponseMessage>,
    transcriber: Arc<dyn Transcriber>,
    audio: AudioConfig,
    source_factory: SourceFactory,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    /// Start a new recording. An already-recording session replaces its
    /// engine: the old one is stopped and its artifact discarded before the
    /// fresh engine starts.
    pub async fn start_recording(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        if state.phase == Phase::Terminated {
            return Err(SessionError::Terminated);
        }

        if let Some(previous) = state.recording.take() {
            warn!("Session {} already recording; restarting", self.id);
            teardown_recording(previous).await;
        }

        std::fs::create_dir_all(&self.audio.temp_dir)
            .map_err(|e| SessionError::Artifact(e.to_string()))?;
        let artifact = self.audio.temp_dir.join(format!(
            "rec-{}-{}.wav",
            self.id,
            chrono::Utc::now().format("%Y%m%d%H%M%S")
        ));

        let live = Arc::new(AtomicBool::new(true));
        let consumer = Arc::new(SessionChunkConsumer {
            transcriber: Arc::clone(&self.transcriber),
            outbound: self.outbound.clone(),
        });
        let bridge = TranscriptionBridge::new(
            tokio::runtime::Handle::current(),
            consumer,
            Arc::clone(&live),
            DEFAULT_DISPATCH_TIMEOUT,
        );

        let gate = SilenceGate::new(self.audio.silence_threshold, self.audio.silence_reset_frames);
        // Capture downmixes the device layout to mono before framing
        let windower = ChunkWindower::new(
            self.audio.sample_rate,
            1,
            WindowConfig::from_audio(&self.audio),
        );
        let pipeline = Box::new(super::pipeline::RecordingPipeline::new(
            gate,
            windower,
            bridge,
            artifact.clone(),
        ));

        let source = (self.source_factory)(&self.audio);
        let engine = tokio::task::spawn_blocking(move || CaptureEngine::start(source, pipeline))
            .await
            .map_err(|e| SessionError::Capture(CaptureError::Stream(e.to_string())))??;

        state.recording = Some(ActiveRecording {
            engine,
            live,
            artifact,
        });
        state.phase = Phase::Recording;
        info!("Session {} recording started", self.id);
        Ok(())
    }

    /// Stop the active recording, transcribe the persisted artifact for the
    /// authoritative result, and remove the artifact. Stopping an idle
    /// session is a no-op returning `None`.
    pub async fn stop_recording(&self) -> Result<Option<TranscriptionResult>, SessionError> {
        let mut state = self.state.lock().await;
        if state.phase == Phase::Terminated {
            return Err(SessionError::Terminated);
        }
        let Some(recording) = state.recording.take() else {
            return Ok(None);
        };

        let ActiveRecording {
            engine,
            live,
            artifact,
        } = recording;

        // Join the capture thread; the pipeline flushes the artifact on exit
        let mut engine = engine;
        if let Err(e) = tokio::task::spawn_blocking(move || engine.stop()).await {
            error!("Capture thread panicked on stop: {}", e);
        }
        live.store(false, Ordering::SeqCst);
        state.phase = Phase::Idle;
        info!("Session {} recording stopped", self.id);

        let result = self
            .transcriber
            .transcribe_file(&artifact)
            .await
            .map_err(|e| SessionError::Transcription(format!("{:#}", e)));

        // Removal failure is non-fatal; the file is orphaned for later cleanup
        if let Err(e) = std::fs::remove_file(&artifact) {
            warn!(
                "Failed to remove recording artifact {}: {}",
                artifact.display(),
                e
            );
        }

        result.map(Some)
    }

    /// Transcribe an on-disk audio file without touching recording state
    pub async fn process_file(&self, file_path: &str) -> Result<TranscriptionResult, SessionError> {
        let state = self.state.lock().await;
        if state.phase == Phase::Terminated {
            return Err(SessionError::Terminated);
        }

        let path = Path::new(file_path);
        if !path.exists() {
            return Err(SessionError::Artifact(format!(
                "Audio file not found: {}",
                file_path
            )));
        }

        self.transcriber
            .transcribe_file(path)
            .await
            .map_err(|e| SessionError::Transcription(format!("{:#}", e)))
    }

    /// Tear the session down: stop any active engine, remove any lingering
    /// artifact, and mark the session terminated. Safe to call on every exit
    /// path; each step is best-effort.
    pub async fn cleanup(&self) {
        let mut state = self.state.lock().await;
        if state.phase == Phase::Terminated {
            return;
        }
        if let Some(recording) = state.recording.take() {
            teardown_recording(recording).await;
        }
        state.phase = Phase::Terminated;
        info!("Session {} terminated", self.id);
    }
}

/// Hard-stop a recording without transcribing it
async fn teardown_recording(recording: ActiveRecording) {
    let ActiveRecording {
        engine,
        live,
        artifact,
    } = recording;

    // Flip liveness first so chunks already crossing the bridge are dropped
    live.store(false, Ordering::SeqCst);

    let mut engine = engine;
    if let Err(e) = tokio::task::spawn_blocking(move || engine.stop()).await {
        error!("Capture thread panicked during teardown: {}", e);
    }

    if artifact.exists() {
        if let Err(e) = std::fs::remove_file(&artifact) {
            warn!(
                "Failed to remove recording artifact {}: {}",
                artifact.display(),
                e
            );
        }
    }
}

/// Delivers transcribed chunk text to the session's outbound channel
struct SessionChunkConsumer {
    transcriber: Arc<dyn Transcriber>,
    outbound: mpsc::Sender<ResponseMessage>,
}

#[async_trait]
impl ChunkConsumer for SessionChunkConsumer {
    async fn consume(&self, chunk: EncodedChunk) -> anyhow::Result<()> {
        match self.transcriber.transcribe_chunk(chunk).await {
            Ok(text) if text.is_empty() => Ok(()),
            Ok(text) => self
                .outbound
                .send(ResponseMessage::TranscriptionProgress(text))
                .await
                .map_err(|_| anyhow::anyhow!("session output closed")),
            Err(e) => {
                // Per-chunk failure: report it and keep the session running
                let _ = self
                    .outbound
                    .send(ResponseMessage::error(format!(
                        "Transcription failed: {:#}",
                        e
                    )))
                    .await;
                Ok(())
            }
        }
    }
}

/// Owns all live sessions, keyed by session identity. Created on connection
/// accept and removed on disconnect; no ambient global table.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    audio: AudioConfig,
    transcriber: Arc<dyn Transcriber>,
    source_factory: SourceFactory,
}

impl SessionStore {
    pub fn new(audio: AudioConfig, transcriber: Arc<dyn Transcriber>) -> Self {
        Self::with_source_factory(
            audio,
            transcriber,
            Arc::new(|config: &AudioConfig| {
                Box::new(CpalSource::new(config)) as Box<dyn FrameSource>
            }),
        )
    }

    pub fn with_source_factory(
        audio: AudioConfig,
        transcriber: Arc<dyn Transcriber>,
        source_factory: SourceFactory,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            audio,
            transcriber,
            source_factory,
        }
    }

    pub async fn create(&self, outbound: mpsc::Sender<ResponseMessage>) -> Arc<Session> {
        let session = Arc::new(Session {
            id: Uuid::new_v4(),
            outbound,
            transcriber: Arc::clone(&self.transcriber),
            audio: self.audio.clone(),
            source_factory: Arc::clone(&self.source_factory),
            state: Mutex::new(SessionState {
                phase: Phase::Idle,
                recording: None,
            }),
        });
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::clone(&session));
        session
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> Option<Arc<Session>> {
        self.sessions.write().await.remove(&id)
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
