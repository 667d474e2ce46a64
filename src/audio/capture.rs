//! Audio capture engine
//!
//! Runs a dedicated thread per active recording that performs blocking reads
//! from a frame source and forwards each frame to a sink. Stopping is a
//! cooperative flag plus a finite join: once `stop` returns, no further frame
//! callback fires.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info};

use crate::error::CaptureError;

/// How long a single blocking read may wait before re-checking the stop flag
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// How long `start` waits for the capture thread to acquire the device
const START_TIMEOUT: Duration = Duration::from_secs(5);

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

/// Keeps the platform stream alive for the duration of the capture loop.
///
/// The underlying handle never leaves the capture thread, so it does not
/// need to be `Send`.
pub struct SourceGuard(#[allow(dead_code)] Box<dyn Any>);

impl SourceGuard {
    pub fn new(inner: impl Any) -> Self {
        Self(Box::new(inner))
    }
}

/// Blocking source of fixed-size audio frames
pub trait FrameSource: Send {
    /// Acquire the input device. Called once, on the capture thread; the
    /// returned guard is dropped when the loop exits.
    fn open(&mut self) -> Result<SourceGuard, CaptureError>;

    /// Read the next frame, waiting at most `timeout`. `Ok(None)` means the
    /// wait elapsed without data; an error is fatal for this capture.
    fn read(&mut self, timeout: Duration) -> Result<Option<AudioFrame>, CaptureError>;
}

/// Receives frames produced by the capture loop
pub trait FrameSink: Send {
    fn on_frame(&mut self, frame: AudioFrame);

    /// Called exactly once after the last frame, on the capture thread
    fn on_stop(&mut self);
}

/// Owns the capture thread for one recording. An engine is never restarted;
/// each recording gets a fresh one.
pub struct CaptureEngine {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureEngine {
    /// Start capturing. Blocks until the source has acquired the device or
    /// reported failure.
    pub fn start(
        mut source: Box<dyn FrameSource>,
        mut sink: Box<dyn FrameSink>,
    ) -> Result<Self, CaptureError> {
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), CaptureError>>();

        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                let guard = match source.open() {
                    Ok(guard) => {
                        let _ = ready_tx.send(Ok(()));
                        guard
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                info!("Capture thread started");

                while !stop_flag.load(Ordering::SeqCst) {
                    match source.read(READ_TIMEOUT) {
                        Ok(Some(frame)) => sink.on_frame(frame),
                        Ok(None) => {}
                        Err(e) => {
                            // Fatal for this recording, not for the process
                            error!("Audio read failed, ending capture: {}", e);
                            break;
                        }
                    }
                }

                drop(guard);
                sink.on_stop();
                info!("Capture thread stopped");
            })
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        let mut engine = Self {
            stop,
            thread: Some(handle),
        };

        match ready_rx.recv_timeout(START_TIMEOUT) {
            Ok(Ok(())) => Ok(engine),
            Ok(Err(e)) => {
                engine.stop();
                Err(e)
            }
            Err(_) => {
                engine.stop();
                Err(CaptureError::StartTimeout)
            }
        }
    }

    /// Signal the capture loop to exit and join the thread. Idempotent and
    /// safe to call from any thread; no frame callback fires after this
    /// returns.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("Capture thread panicked");
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.thread.is_some()
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
