//! Transcription bridge
//!
//! The single crossing point between a recording's capture thread and the
//! session's async execution context. `dispatch` marshals one chunk onto the
//! tokio runtime and waits for the consumer to finish, bounded by a fixed
//! timeout: a stuck downstream call becomes a dropped chunk and a log line,
//! never a stalled capture loop. Once the owning session is torn down the
//! liveness flag turns dispatch into a silent no-op.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::audio::EncodedChunk;

pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(1);

/// Async consumer of emitted chunks, running on the session's runtime
#[async_trait]
pub trait ChunkConsumer: Send + Sync {
    async fn consume(&self, chunk: EncodedChunk) -> anyhow::Result<()>;
}

pub struct TranscriptionBridge {
    handle: tokio::runtime::Handle,
    consumer: Arc<dyn ChunkConsumer>,
    live: Arc<AtomicBool>,
    timeout: Duration,
}

impl TranscriptionBridge {
    pub fn new(
        handle: tokio::runtime::Handle,
        consumer: Arc<dyn ChunkConsumer>,
        live: Arc<AtomicBool>,
        timeout: Duration,
    ) -> Self {
        Self {
            handle,
            consumer,
            live,
            timeout,
        }
    }

    /// Deliver one chunk to the consumer. Called from the capture thread;
    /// blocks for at most the configured timeout. Failure of one dispatch
    /// never affects subsequent ones.
    pub fn dispatch(&self, chunk: EncodedChunk) {
        if !self.live.load(Ordering::SeqCst) {
            return;
        }

        let (done_tx, done_rx) = sync_channel::<anyhow::Result<()>>(1);
        let consumer = Arc::clone(&self.consumer);
        let live = Arc::clone(&self.live);

        self.handle.spawn(async move {
            // Re-check after marshaling: the session may have been torn
            // down while this task was queued
            if !live.load(Ordering::SeqCst) {
                return;
            }
            let result = consumer.consume(chunk).await;
            let _ = done_tx.send(result);
        });

        match done_rx.recv_timeout(self.timeout) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Chunk transcription failed: {:#}", e),
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Chunk dispatch exceeded {:?}; dropping chunk",
                    self.timeout
                );
            }
            // Sender dropped without a result: either teardown mid-dispatch
            // (expected, silent) or the consumer task panicked
            Err(RecvTimeoutError::Disconnected) => {
                if self.live.load(Ordering::SeqCst) {
                    warn!("Chunk consumer exited without reporting; dropping chunk");
                }
            }
        }
    }
}
