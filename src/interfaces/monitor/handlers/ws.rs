use axum::{
    Json,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::super::MonitorState;
use crate::core::monitor::BoardEvent;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<MonitorState>) -> Response {
    if state.shutdown.is_cancelled() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "success": false, "error": "Monitor is shutting down" })),
        )
            .into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Greet with a full snapshot, then relay every broadcast until the client
/// leaves or the monitor shuts down.
async fn handle_socket(mut socket: WebSocket, state: MonitorState) {
    // Subscribe first so nothing published during the snapshot read is lost.
    let mut updates = state.notifier.subscribe();

    let greeting = match BoardEvent::snapshot(&state.store).await {
        Ok(event) => serde_json::to_string(&event),
        Err(e) => {
            warn!("Could not build board snapshot: {:#}", e);
            return;
        }
    };
    match greeting {
        Ok(text) => {
            if socket.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        Err(e) => {
            warn!("Could not serialize board snapshot: {}", e);
            return;
        }
    }
    debug!(
        subscribers = state.notifier.subscriber_count(),
        "Dashboard subscriber connected"
    );

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            update = updates.recv() => match update {
                Ok(text) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    debug!(missed, "Dashboard subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("Dashboard subscriber disconnected");
}
