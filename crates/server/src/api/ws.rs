//! WebSocket push channel for one job's progress.
//!
//! The socket sends `connected` with the current snapshot, then one message
//! per accepted progress event, and closes after the first terminal message.
//! Lag and reconnection gaps are reconciled by the core progress stream,
//! which only ever yields snapshots newer than the last one sent.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use lectern_core::{subscribe_with_retry, Job, ProgressEvent, ProgressKind, ProgressStream};

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_MESSAGES_SENT};
use crate::state::AppState;

/// Message sent to progress subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// First message, carrying the snapshot at subscribe time.
    Connected { job: Job },
    Progress { job: Job },
    Completed { job: Job },
    Failed { job: Job },
    Cancelled { job: Job },
    /// Keep-alive.
    #[serde(rename = "hb")]
    Heartbeat,
    Error { error: String },
}

impl WsMessage {
    pub fn for_event(event: ProgressEvent) -> Self {
        let job = event.snapshot;
        match event.kind {
            ProgressKind::Progress => WsMessage::Progress { job },
            ProgressKind::Completed => WsMessage::Completed { job },
            ProgressKind::Failed => WsMessage::Failed { job },
            ProgressKind::Cancelled => WsMessage::Cancelled { job },
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            WsMessage::Connected { .. } => "connected",
            WsMessage::Progress { .. } => "progress",
            WsMessage::Completed { .. } => "completed",
            WsMessage::Failed { .. } => "failed",
            WsMessage::Cancelled { .. } => "cancelled",
            WsMessage::Heartbeat => "hb",
            WsMessage::Error { .. } => "error",
        }
    }
}

type WsSender = SplitSink<WebSocket, Message>;

/// WebSocket upgrade handler.
pub async fn job_progress_ws(
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, job_id: String) {
    let (mut sender, receiver) = socket.split();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();
    info!(job_id = %job_id, "Progress subscriber connected");

    let progress = &state.config().progress;
    let subscribed = subscribe_with_retry(
        state.transport(),
        &job_id,
        progress.subscribe_attempts,
        progress.subscribe_backoff(),
    )
    .await;

    match subscribed {
        Ok(stream) => {
            run_session(&mut sender, receiver, stream, &state, &job_id).await;
        }
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "Progress subscription failed");
            let _ = send(&mut sender, &WsMessage::Error { error: e.to_string() }).await;
        }
    }

    let _ = sender.send(Message::Close(None)).await;
    WS_CONNECTIONS_ACTIVE.dec();
    info!(job_id = %job_id, "Progress subscriber disconnected");
}

async fn run_session(
    sender: &mut WsSender,
    mut receiver: futures::stream::SplitStream<WebSocket>,
    mut stream: ProgressStream,
    state: &AppState,
    job_id: &str,
) {
    let period = state.config().progress.heartbeat();
    let mut heartbeat = interval_at(Instant::now() + period, period);
    let mut connected = false;

    loop {
        tokio::select! {
            event = stream.next() => {
                let Some(event) = event else {
                    debug!(job_id = %job_id, "Progress stream ended");
                    break;
                };
                let terminal = event.is_terminal();
                let mut messages = Vec::with_capacity(2);
                if !connected {
                    connected = true;
                    messages.push(WsMessage::Connected { job: event.snapshot.clone() });
                    if terminal {
                        messages.push(WsMessage::for_event(event));
                    }
                } else {
                    messages.push(WsMessage::for_event(event));
                }
                for message in &messages {
                    if send(sender, message).await.is_err() {
                        debug!(job_id = %job_id, "WebSocket send failed, client disconnected");
                        return;
                    }
                }
                if terminal {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if send(sender, &WsMessage::Heartbeat).await.is_err() {
                    return;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match text.as_str().trim() {
                            "ping" => {
                                if sender.send(Message::Text("pong".into())).await.is_err() {
                                    return;
                                }
                            }
                            "cancel" => {
                                if let Err(e) = state.orchestrator().cancel(job_id) {
                                    let error = WsMessage::Error { error: e.to_string() };
                                    if send(sender, &error).await.is_err() {
                                        return;
                                    }
                                }
                            }
                            other => debug!(job_id = %job_id, "Ignoring client message: {}", other),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(job_id = %job_id, "WebSocket client requested close");
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(job_id = %job_id, "WebSocket receive error: {}", e);
                        return;
                    }
                }
            }
        }
    }
}

async fn send(sender: &mut WsSender, message: &WsMessage) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize WsMessage: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(json.into())).await?;
    WS_MESSAGES_SENT
        .with_label_values(&[message.type_name()])
        .inc();
    Ok(())
}
