//! WebSocket endpoint
//!
//! Each upgraded connection is plugged into the registry:
//! - it gets a `ClientHandle` with a bounded outbox and is registered
//!   (which queues the welcome snapshot);
//! - a writer task drains the outbox onto the socket, giving up on a send
//!   that takes longer than the configured timeout;
//! - the read loop answers `ping` probes and ignores everything else.
//!
//! The registry owns the only strong outbox sender. When it drops the
//! client (close, failed broadcast, `close_all`) the writer sends a Close
//! frame and the connection ends. Shutdown reaches connections the same
//! way: the registry is closed once the dispatcher has drained, so the last
//! updates still go out.

use std::net::SocketAddr;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::registry::{ClientHandle, ReplyHandle};
use crate::transport::http::ApiState;
use crate::transport::message::{ClientMessage, ServerMessage};

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<ApiState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, peer, state))
}

async fn handle_socket(socket: WebSocket, peer: SocketAddr, state: ApiState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (handle, mut rx) = ClientHandle::channel(state.bridge.client_outbox_capacity);
    let client_id = handle.id;
    let replies = handle.downgrade();
    if let Err(e) = state.registry.register(handle) {
        warn!("could not register {peer}: {e}");
        return;
    }
    info!(client = %client_id, %peer, "WebSocket client connected");

    let send_timeout = state.bridge.send_timeout();
    let mut writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match timeout(send_timeout, ws_sender.send(msg)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!(client = %client_id, "send failed: {e}");
                    return;
                }
                Err(_) => {
                    warn!(client = %client_id, "send timed out after {send_timeout:?}");
                    return;
                }
            }
        }
        let _ = timeout(send_timeout, ws_sender.send(WsMessage::Close(None))).await;
        debug!(client = %client_id, "send loop closed");
    });

    let mut writer_done = false;
    loop {
        let next = tokio::select! {
            next = ws_receiver.next() => next,
            _ = &mut writer => {
                writer_done = true;
                break;
            }
        };

        match next {
            Some(Ok(WsMessage::Text(text))) => handle_client_text(&replies, text.as_str()),
            Some(Ok(WsMessage::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                debug!(client = %client_id, "read error: {e}");
                break;
            }
        }
    }

    state.registry.unregister(&client_id);
    if !writer_done {
        let _ = writer.await;
    }
    info!(client = %client_id, "WebSocket client disconnected");
}

/// Answers liveness probes. Anything else, including invalid JSON, is
/// ignored.
pub(crate) fn handle_client_text(replies: &ReplyHandle, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Ping { timestamp }) => {
            if let Err(e) = replies.send_json(&ServerMessage::pong(timestamp)) {
                debug!(client = %replies.id, "pong not sent: {e}");
            }
        }
        Ok(ClientMessage::Unknown) => {
            debug!(client = %replies.id, "ignoring client message");
        }
        Err(e) => {
            debug!(
                client = %replies.id,
                "ignoring invalid client message: {e} | {}",
                text.chars().take(100).collect::<String>()
            );
        }
    }
}
