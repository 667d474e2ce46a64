//! WebSocket session protocol
//!
//! Message-oriented duplex protocol, one connection per client:
//! - Inbound: `start_recording`, `stop_recording`, `process_audio_file`
//! - Outbound: `recording_started`, `recording_stopped`,
//!   `transcription_progress`, `transcription_complete`, `error`

mod messages;
mod router;

pub use messages::{ControlMessage, ResponseMessage};
pub use router::{handle_connection, handle_message};
