pub mod audio;
pub mod bridge;
pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod session;
pub mod transcribe;

pub use audio::{
    AudioFile, AudioFrame, CaptureEngine, ChunkWindower, CpalSource, EncodedChunk, FrameSink,
    FrameSource, GateDecision, SilenceGate, SourceGuard, WindowConfig,
};
pub use bridge::{ChunkConsumer, TranscriptionBridge};
pub use config::Config;
pub use error::{CaptureError, SessionError, TranscribeError};
pub use http::{create_router, AppState};
pub use protocol::{ControlMessage, ResponseMessage};
pub use session::{Phase, Session, SessionStore, SourceFactory};
pub use transcribe::{
    Transcriber, TranscriberRegistry, TranscriptionResult, TranscriptionSegment,
};
