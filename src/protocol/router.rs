//! Per-connection protocol loop
//!
//! Parses inbound control messages, drives the session, and emits responses.
//! A malformed or failing message yields a single `error` response and the
//! loop continues; only a transport failure or disconnect ends it. Cleanup
//! runs unconditionally on every exit path.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::{ControlMessage, ResponseMessage};
use crate::http::AppState;
use crate::session::Session;

/// Outbound messages buffered per connection
const OUTBOUND_CAPACITY: usize = 64;

pub async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ResponseMessage>(OUTBOUND_CAPACITY);

    let session = state.sessions.create(out_tx.clone()).await;
    let session_id = session.id();
    info!("Client connected: session {}", session_id);

    // Single writer task owns the sink; everything outbound funnels through
    // the channel, including bridge progress results
    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize response: {}", e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_rx.next().await {
        let text = match received {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("Receive failed for session {}: {}", session_id, e);
                break;
            }
        };

        if handle_message(&session, &text, &out_tx).await.is_err() {
            // Outbound channel gone means the transport is gone
            break;
        }
    }

    state.sessions.remove(session_id).await;
    session.cleanup().await;
    writer.abort();
    info!("Client disconnected: session {}", session_id);
}

/// Dispatch one inbound message and emit the corresponding responses.
/// Errors only on a closed outbound channel.
pub async fn handle_message(
    session: &Session,
    text: &str,
    out: &mpsc::Sender<ResponseMessage>,
) -> Result<(), mpsc::error::SendError<ResponseMessage>> {
    let message = match serde_json::from_str::<ControlMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            return out
                .send(ResponseMessage::error(format!("Malformed message: {}", e)))
                .await;
        }
    };

    match message {
        ControlMessage::StartRecording => match session.start_recording().await {
            Ok(()) => out.send(ResponseMessage::recording_started()).await,
            Err(e) => out.send(ResponseMessage::error(e.to_string())).await,
        },
        ControlMessage::StopRecording => match session.stop_recording().await {
            Ok(Some(result)) => {
                out.send(ResponseMessage::TranscriptionComplete(result))
                    .await?;
                out.send(ResponseMessage::recording_stopped()).await
            }
            Ok(None) => out.send(ResponseMessage::recording_stopped()).await,
            Err(e) => out.send(ResponseMessage::error(e.to_string())).await,
        },
        ControlMessage::ProcessAudioFile { file_path } => {
            match session.process_file(&file_path).await {
                Ok(result) => {
                    out.send(ResponseMessage::TranscriptionComplete(result))
                        .await
                }
                Err(e) => out.send(ResponseMessage::error(e.to_string())).await,
            }
        }
    }
}
