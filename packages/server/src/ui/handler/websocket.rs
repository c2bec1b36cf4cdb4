//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{Identity, SessionId},
    ui::state::AppState,
};

/// Query parameters for WebSocket connection.
///
/// The identity fields are filled in by the external auth layer when the
/// client is logged in; the chat core trusts them as-is. Absent fields mean
/// a guest connection.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_id: Option<i64>,
    pub username: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> impl IntoResponse {
    // Create a channel for this session to receive messages
    let (tx, rx) = mpsc::unbounded_channel();

    let session_id = state.router.connect(tx).await;

    if let (Some(user_id), Some(username)) = (query.user_id, query.username) {
        state
            .router
            .attach_identity(&session_id, Identity { user_id, username })
            .await;
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, session_id, rx))
}

/// Spawns a task that receives messages from the rx channel and pushes them
/// to the WebSocket sender.
///
/// Messages for this session (broadcasts and direct replies) arrive on the
/// rx channel in router call order; pushing them through one task keeps
/// that order on the wire.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    session_id: SessionId,
    rx: mpsc::UnboundedReceiver<String>,
) {
    let (sender, mut receiver) = socket.split();

    let session_id_recv = session_id.clone();
    let state_recv = state.clone();

    // Task receiving frames from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!("websocket error on '{}': {}", session_id_recv, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    state_recv
                        .router
                        .handle_frame(&session_id_recv, text.as_str())
                        .await;
                }
                Message::Ping(_) => {
                    // Ping/pong is handled automatically by the WebSocket protocol
                    tracing::trace!("received transport ping from '{}'", session_id_recv);
                }
                Message::Close(_) => {
                    tracing::debug!("session '{}' requested close", session_id_recv);
                    break;
                }
                _ => {}
            }
        }
    });

    // Task pushing outbound messages to this client
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Close and reaper eviction may race here; handle_disconnect is idempotent
    state.router.handle_disconnect(&session_id).await;
}
