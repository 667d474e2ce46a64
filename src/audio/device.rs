//! Microphone input via cpal
//!
//! The cpal callback delivers buffers of arbitrary size on its own realtime
//! thread; `CpalSource` downmixes them to mono i16, reassembles fixed-size
//! frames, and hands them to the capture loop through a bounded channel so a
//! slow consumer drops frames instead of stalling the device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::capture::{AudioFrame, FrameSource, SourceGuard};
use crate::config::AudioConfig;
use crate::error::CaptureError;

/// Frames buffered between the device callback and the capture loop
const CHANNEL_CAPACITY: usize = 32;

/// Captures from the host default input device
pub struct CpalSource {
    sample_rate: u32,
    frame_samples: usize,
    rx: Option<Receiver<Vec<i16>>>,
    failed: Arc<AtomicBool>,
}

impl CpalSource {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            frame_samples: config.frame_samples,
            rx: None,
            failed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl FrameSource for CpalSource {
    fn open(&mut self) -> Result<SourceGuard, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            CaptureError::DeviceUnavailable("no default input device".to_string())
        })?;
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        info!(
            "Opening input device: {} ({:?}, {} ch)",
            name,
            supported.sample_format(),
            supported.channels()
        );

        let stream_config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (tx, rx) = bounded::<Vec<i16>>(CHANNEL_CAPACITY);
        let channels = supported.channels() as usize;
        let mut assembler = FrameAssembler::new(self.frame_samples, channels, tx);

        let err_cb = {
            let failed = Arc::clone(&self.failed);
            move |e: cpal::StreamError| {
                failed.store(true, Ordering::SeqCst);
                error!("Input stream error: {}", e);
            }
        };

        let stream = match supported.sample_format() {
            cpal::SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    assembler.push(data, |s| s as f32 / 32768.0)
                },
                err_cb,
                None,
            ),
            cpal::SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| assembler.push(data, |s| s),
                err_cb,
                None,
            ),
            other => {
                return Err(CaptureError::Stream(format!(
                    "unsupported sample format: {:?}",
                    other
                )))
            }
        }
        .map_err(|e| CaptureError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        self.rx = Some(rx);
        Ok(SourceGuard::new(stream))
    }

    fn read(&mut self, timeout: Duration) -> Result<Option<AudioFrame>, CaptureError> {
        if self.failed.load(Ordering::SeqCst) {
            return Err(CaptureError::Stream("input stream failed".to_string()));
        }

        let rx = self
            .rx
            .as_ref()
            .ok_or_else(|| CaptureError::Stream("source not opened".to_string()))?;

        match rx.recv_timeout(timeout) {
            Ok(samples) => Ok(Some(AudioFrame {
                samples,
                sample_rate: self.sample_rate,
                channels: 1,
            })),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(CaptureError::Stream("input stream closed".to_string()))
            }
        }
    }
}

/// Downmixes interleaved device buffers to mono and re-slices them into
/// fixed-size i16 frames
struct FrameAssembler {
    frame_samples: usize,
    channels: usize,
    pending: Vec<i16>,
    tx: Sender<Vec<i16>>,
    dropped: usize,
}

impl FrameAssembler {
    fn new(frame_samples: usize, channels: usize, tx: Sender<Vec<i16>>) -> Self {
        Self {
            frame_samples: frame_samples.max(1),
            channels: channels.max(1),
            pending: Vec::with_capacity(frame_samples),
            tx,
            dropped: 0,
        }
    }

    fn push<T, F>(&mut self, data: &[T], mut convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        if self.channels == 1 {
            self.pending
                .extend(data.iter().copied().map(|s| to_i16(convert(s))));
        } else {
            // Average each interleaved frame to produce mono
            for group in data.chunks(self.channels) {
                let sum: f32 = group.iter().copied().map(&mut convert).sum();
                self.pending.push(to_i16(sum / group.len() as f32));
            }
        }

        while self.pending.len() >= self.frame_samples {
            let frame: Vec<i16> = self.pending.drain(..self.frame_samples).collect();
            match self.tx.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped += 1;
                    if self.dropped % 100 == 1 {
                        warn!("Capture buffer full; {} frames dropped", self.dropped);
                    }
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
