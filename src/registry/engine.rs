//! Connection registry
//!
//! Tracks live fan-out destinations and delivers envelopes to all of them.
//!
//! Concurrency notes:
//! - The map sits behind a `std::sync::Mutex`; nothing awaits while it is
//!   held because every per-client send is a non-blocking `try_send` into
//!   that client's outbox.
//! - `register` sends the welcome and inserts under the same lock that
//!   `broadcast` takes, so a new client always sees its welcome before any
//!   broadcast.
//! - A failed send removes exactly that client and never reaches the
//!   caller or the other clients.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};
use axum::extract::ws::Message as WsMessage;

use super::client::{ClientHandle, ClientId};
use crate::state::StateStore;
use crate::transport::message::ServerMessage;
use crate::utils::Result;

#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    clients: Arc<Mutex<HashMap<ClientId, ClientHandle>>>,
    store: StateStore,
}

impl ConnectionRegistry {
    pub fn new(store: StateStore) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            store,
        }
    }

    /// Adds a client after sending it the current snapshot.
    ///
    /// If the welcome cannot be queued the client is not registered.
    pub fn register(&self, handle: ClientHandle) -> Result<()> {
        let mut clients = self.lock();
        let welcome = ServerMessage::welcome(self.store.snapshot());
        handle.send_json(&welcome)?;

        let id = handle.id;
        clients.insert(id, handle);
        info!(client = %id, total = clients.len(), "client registered");
        Ok(())
    }

    /// Removes a client. Removing an absent client is a no-op.
    pub fn unregister(&self, id: &ClientId) -> bool {
        let mut clients = self.lock();
        let removed = clients.remove(id).is_some();
        if removed {
            info!(client = %id, total = clients.len(), "client unregistered");
        }
        removed
    }

    /// Sends `envelope` to every registered client and returns how many
    /// deliveries were queued.
    pub fn broadcast(&self, envelope: &ServerMessage) -> usize {
        let text = match serde_json::to_string(envelope) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialize {} envelope: {e}", envelope.kind());
                return 0;
            }
        };
        let frame = WsMessage::Text(text.into());

        let mut clients = self.lock();
        let mut failed = Vec::new();
        for (id, handle) in clients.iter() {
            if let Err(e) = handle.try_send(frame.clone()) {
                warn!(client = %id, "broadcast failed, dropping client: {e}");
                failed.push(*id);
            }
        }
        for id in &failed {
            clients.remove(id);
        }

        let delivered = clients.len();
        debug!(
            kind = envelope.kind(),
            delivered,
            dropped = failed.len(),
            "broadcast"
        );
        delivered
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every handle so each writer task sees its outbox close.
    pub fn close_all(&self) -> usize {
        let mut clients = self.lock();
        let count = clients.len();
        clients.clear();
        info!("closed {count} client connection(s)");
        count
    }

    // No invariant spans more than one map operation, so a poisoned lock
    // still guards a consistent map.
    fn lock(&self) -> MutexGuard<'_, HashMap<ClientId, ClientHandle>> {
        self.clients.lock().unwrap_or_else(|e| e.into_inner())
    }
}
