//! WebSocket handler for control-panel connections
//!
//! Every `DirectorNotification` is pushed verbatim as JSON. Clients may also
//! ping, ask for status, or report world activity over the same socket.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use crate::application::dto::DirectorStatusDto;
use crate::domain::events::DomainEvent;
use crate::infrastructure::state::AppState;

/// Messages a control panel may send
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    GetStatus,
    Activity { event: DomainEvent },
}

/// Direct replies; broadcast notifications are sent as they are
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerReply {
    Pong,
    Status { status: DirectorStatusDto },
    Error { code: String, message: String },
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tracing::info!("Control panel connected");

    let send_task = tokio::spawn(async move {
        while let Some(json) = rx.recv().await {
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let forward_task = {
        let tx = tx.clone();
        let mut notifications = state.director.notifications();
        tokio::spawn(async move {
            loop {
                match notifications.recv().await {
                    Ok(notification) => match serde_json::to_string(&notification) {
                        Ok(json) => {
                            if tx.send(json).is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::error!("Failed to serialize notification: {}", e),
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Control panel lagged, {} notifications dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    };

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => handle_message(msg, &state).await,
                    Err(e) => {
                        tracing::warn!("Failed to parse message: {}", e);
                        Some(ServerReply::Error {
                            code: "PARSE_ERROR".to_string(),
                            message: format!("Invalid message format: {}", e),
                        })
                    }
                };
                if let Some(reply) = reply {
                    match serde_json::to_string(&reply) {
                        Ok(json) => {
                            if tx.send(json).is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::error!("Failed to serialize reply: {}", e),
                    }
                }
            }
            Ok(Message::Close(_)) => {
                tracing::info!("Control panel closed the connection");
                break;
            }
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    forward_task.abort();
    send_task.abort();
    tracing::info!("Control panel disconnected");
}

async fn handle_message(msg: ClientMessage, state: &AppState) -> Option<ServerReply> {
    match msg {
        ClientMessage::Ping => Some(ServerReply::Pong),
        ClientMessage::GetStatus => Some(ServerReply::Status {
            status: state.director.status().await,
        }),
        ClientMessage::Activity { event } => {
            state.director.record_activity(event);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages_parse() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "activity", "event": {"type": "actor_moved", "entity_id": "6f1c1a8e-2b0a-4a4e-9a51-3c1f0f7d2e11", "position": {"x": 3.0, "y": 4.0}}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Activity { event } => assert_eq!(event.position().x, 3.0),
            other => panic!("unexpected message {:?}", other),
        }
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type": "ping"}"#).unwrap(),
            ClientMessage::Ping
        ));
    }

    #[test]
    fn test_reply_shape() {
        let json = serde_json::to_value(ServerReply::Pong).unwrap();
        assert_eq!(json["type"], "pong");
    }
}
