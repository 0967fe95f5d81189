//! Client handle
//!
//! `ClientHandle` is the registry's view of one live WebSocket client: an id
//! plus the sending half of that client's bounded outbox. The connection's
//! writer task owns the receiving half and drains it onto the socket.
//!
//! The registry holds the only strong sender. The connection itself answers
//! pings through a `ReplyHandle`, which does not keep the outbox open, so
//! once the registry drops a client its writer sees the outbox close and
//! ends the connection.

use axum::extract::ws::Message as WsMessage;
use tokio::sync::mpsc::{self, Receiver, Sender, WeakSender, error::TrySendError};
use uuid::Uuid;

use crate::transport::message::ServerMessage;
use crate::utils::{BridgeError, Result};

pub type ClientId = Uuid;

#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub id: ClientId,
    sender: Sender<WsMessage>,
}

impl ClientHandle {
    /// Wrap an existing outbox sender under a fresh id.
    pub fn new(sender: Sender<WsMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
        }
    }

    /// A handle together with the outbox receiver its writer task drains.
    pub fn channel(capacity: usize) -> (Self, Receiver<WsMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Queues a frame without waiting. A closed or full outbox is a
    /// transport failure for this client only.
    pub fn try_send(&self, msg: WsMessage) -> Result<()> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => {
                BridgeError::Transport(format!("outbox full for client {}", self.id))
            }
            TrySendError::Closed(_) => {
                BridgeError::Transport(format!("client {} is gone", self.id))
            }
        })
    }

    pub fn send_json(&self, msg: &ServerMessage) -> Result<()> {
        let text = serde_json::to_string(msg)?;
        self.try_send(WsMessage::Text(text.into()))
    }

    /// A reply path into the same outbox that lives only as long as this
    /// handle (or a clone of it) does.
    pub fn downgrade(&self) -> ReplyHandle {
        ReplyHandle {
            id: self.id,
            sender: self.sender.downgrade(),
        }
    }
}

/// Direct replies to one client, valid while the client is registered.
#[derive(Debug, Clone)]
pub struct ReplyHandle {
    pub id: ClientId,
    sender: WeakSender<WsMessage>,
}

impl ReplyHandle {
    pub fn send_json(&self, msg: &ServerMessage) -> Result<()> {
        let sender = self
            .sender
            .upgrade()
            .ok_or_else(|| BridgeError::Transport(format!("client {} was removed", self.id)))?;
        ClientHandle {
            id: self.id,
            sender,
        }
        .send_json(msg)
    }
}
