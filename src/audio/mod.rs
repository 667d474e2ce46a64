pub mod capture;
pub mod device;
pub mod file;
pub mod gate;
pub mod window;

pub use capture::{AudioFrame, CaptureEngine, FrameSink, FrameSource, SourceGuard};
pub use device::CpalSource;
pub use file::AudioFile;
pub use gate::{GateDecision, SilenceGate};
pub use window::{ChunkWindower, EncodedChunk, WindowConfig};
