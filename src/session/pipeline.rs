//! Per-recording frame pipeline
//!
//! Runs entirely on the capture thread: each frame passes the silence gate,
//! accumulates in the windower, and any emitted chunk crosses to the async
//! side through the bridge. On stop the full recording is flushed to the
//! session's artifact path.

use std::path::PathBuf;
use tracing::{debug, error};

use crate::audio::{AudioFrame, ChunkWindower, FrameSink, GateDecision, SilenceGate};
use crate::bridge::TranscriptionBridge;

pub struct RecordingPipeline {
    gate: SilenceGate,
    windower: ChunkWindower,
    bridge: TranscriptionBridge,
    artifact: PathBuf,
}

impl RecordingPipeline {
    pub fn new(
        gate: SilenceGate,
        windower: ChunkWindower,
        bridge: TranscriptionBridge,
        artifact: PathBuf,
    ) -> Self {
        Self {
            gate,
            windower,
            bridge,
            artifact,
        }
    }
}

impl FrameSink for RecordingPipeline {
    fn on_frame(&mut self, frame: AudioFrame) {
        match self.gate.observe(&frame.samples) {
            GateDecision::Reset => {
                debug!("Extended silence; discarding buffered window");
                self.windower.discard_window();
            }
            GateDecision::Voiced | GateDecision::Silent => {
                if let Some(chunk) = self.windower.push(&frame) {
                    debug!(
                        "Emitting chunk: {:.2}s of audio",
                        chunk.duration_seconds()
                    );
                    self.bridge.dispatch(chunk);
                }
            }
        }
    }

    fn on_stop(&mut self) {
        if let Err(e) = self.windower.flush_to(&self.artifact) {
            // Non-fatal: stop still completes, the final transcription
            // just sees an empty or missing artifact
            error!("Failed to persist recording artifact: {:#}", e);
        }
    }
}
