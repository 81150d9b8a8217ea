use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::protocol::ServerMessage;
use crate::session::Connection;
use crate::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Direct replies and room broadcasts share one outgoing queue
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut conn = Connection::new(tx);
    let conn_id = conn.id();

    tracing::info!("Connection {} opened", conn_id);

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.to_json())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                tracing::debug!("Frame from {} ({} bytes)", conn_id, text.len());
                if let Some(reply) = state.sessions.handle_text(&mut conn, &text).await {
                    if !conn.send(reply) {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                tracing::info!("Connection {} closed", conn_id);
                break;
            }
            Ok(_) => {
                // Binary frames carry nothing in this protocol; pings are answered by axum
            }
            Err(e) => {
                tracing::warn!("WebSocket error for connection {}: {}", conn_id, e);
                break;
            }
        }
    }

    state.sessions.disconnect(&mut conn).await;
    send_task.abort();
}
