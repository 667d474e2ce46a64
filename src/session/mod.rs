//! Session management
//!
//! One `Session` per client connection holds the optional active capture
//! engine, the outbound message sender, and a serialized lifecycle state
//! machine (`Idle -> Recording -> Idle`, terminating on disconnect). The
//! `SessionStore` owns all live sessions with explicit create/get/remove
//! lifecycle methods.

mod manager;
mod pipeline;

pub use manager::{Phase, Session, SessionStore, SourceFactory};
pub use pipeline::RecordingPipeline;
