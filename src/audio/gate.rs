//! Silence gate
//!
//! Classifies frames by mean absolute amplitude. A long run of consecutive
//! silent frames signals the windower to discard its buffer so inert audio
//! does not grow the window or bias transcription context across a pause.
//! Brief silence inside active speech is kept.

/// Outcome of observing one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Frame carries speech energy; accumulate it
    Voiced,
    /// Frame is silent but within the tolerated run; accumulate it
    Silent,
    /// Silence run exceeded the limit; discard buffered frames and this one
    Reset,
}

pub struct SilenceGate {
    /// Threshold as a fraction of full-scale amplitude
    threshold: f32,
    /// Consecutive silent frames tolerated before a reset
    reset_after: u32,
    consecutive_silent: u32,
}

impl SilenceGate {
    pub fn new(threshold: f32, reset_after: u32) -> Self {
        Self {
            threshold,
            reset_after,
            consecutive_silent: 0,
        }
    }

    pub fn observe(&mut self, samples: &[i16]) -> GateDecision {
        if Self::is_silent(samples, self.threshold) {
            self.consecutive_silent += 1;
            if self.consecutive_silent > self.reset_after {
                GateDecision::Reset
            } else {
                GateDecision::Silent
            }
        } else {
            self.consecutive_silent = 0;
            GateDecision::Voiced
        }
    }

    fn is_silent(samples: &[i16], threshold: f32) -> bool {
        if samples.is_empty() {
            return true;
        }
        let mean_abs = samples
            .iter()
            .map(|&s| (s as f64).abs())
            .sum::<f64>()
            / samples.len() as f64;
        mean_abs < threshold as f64 * 32768.0
    }
}
