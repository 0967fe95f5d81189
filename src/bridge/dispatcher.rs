//! Dispatcher
//!
//! The single consumer of the ingest queue and the only writer of the
//! state store. For each message it applies the topic's routing rule,
//! then broadcasts one envelope: `sensor_data` for solar, turbine and
//! combined messages, `gps_data` for gps. Link-state changes arrive on a
//! watch channel and only update the snapshot's `broker_connected` flag.
//!
//! Routing and decode failures are logged and dropped; nothing stops the
//! loop except shutdown or every producer going away.

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::queue::IngestReceiver;
use crate::broker::{InboundMessage, LinkState, Route, TopicMap};
use crate::registry::ConnectionRegistry;
use crate::state::{Channel, Reading, StateStore};
use crate::transport::message::ServerMessage;
use crate::utils::{BridgeError, Result, wait_for_shutdown};

/// What a message changed.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Sensor(Vec<Channel>),
    Gps(Reading),
}

pub struct Dispatcher {
    ingest: IngestReceiver,
    link_state: watch::Receiver<LinkState>,
    store: StateStore,
    registry: ConnectionRegistry,
    topics: TopicMap,
    processed: u64,
    rejected: u64,
}

impl Dispatcher {
    pub fn new(
        ingest: IngestReceiver,
        link_state: watch::Receiver<LinkState>,
        store: StateStore,
        registry: ConnectionRegistry,
        topics: TopicMap,
    ) -> Self {
        Self {
            ingest,
            link_state,
            store,
            registry,
            topics,
            processed: 0,
            rejected: 0,
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        self.sync_link_state();
        let mut link_open = true;

        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                changed = self.link_state.changed(), if link_open => {
                    if changed.is_err() {
                        link_open = false;
                    }
                    self.sync_link_state();
                }
                msg = self.ingest.recv() => match msg {
                    Some(msg) => {
                        self.handle(msg);
                    }
                    None => break,
                },
            }
        }

        self.ingest.close();
        let mut drained = 0;
        while let Some(msg) = self.ingest.try_recv() {
            self.handle(msg);
            drained += 1;
        }
        info!(
            processed = self.processed,
            rejected = self.rejected,
            drained,
            "dispatcher stopped"
        );
    }

    /// Applies one message and broadcasts the result. Returns the number of
    /// clients the update was queued for.
    pub fn handle(&mut self, msg: InboundMessage) -> usize {
        let topic = msg.topic.clone();
        let update = match self.apply(msg) {
            Ok(update) => update,
            Err(e) => {
                self.rejected += 1;
                warn!("dropping message: {e}");
                return 0;
            }
        };
        self.processed += 1;

        let envelope = match update {
            Update::Sensor(_) => ServerMessage::sensor_update(&self.store.snapshot().current_data),
            Update::Gps(gps) => ServerMessage::gps_update(gps),
        };
        let delivered = self.registry.broadcast(&envelope);
        debug!("{topic}: {} sent to {delivered} client(s)", envelope.kind());
        delivered
    }

    /// Routes a message into the state store without broadcasting.
    pub fn apply(&self, msg: InboundMessage) -> Result<Update> {
        let InboundMessage { topic, payload, .. } = msg;
        let route = self
            .topics
            .route(&topic)
            .ok_or_else(|| BridgeError::routing(&topic, "unknown topic"))?;

        match route {
            Route::Channel(channel) => {
                let reading = into_reading(&topic, channel.as_str(), payload)?;
                if channel.is_sensor() {
                    self.store.set(channel, reading);
                    Ok(Update::Sensor(vec![channel]))
                } else {
                    self.store.set(channel, reading.clone());
                    Ok(Update::Gps(reading))
                }
            }
            Route::Combined => {
                let Value::Object(mut fields) = payload else {
                    return Err(BridgeError::routing(&topic, "payload is not an object"));
                };

                let mut updates = Vec::new();
                for channel in [Channel::Solar, Channel::Turbine] {
                    if let Some(value) = fields.remove(channel.as_str()) {
                        updates.push((channel, into_reading(&topic, channel.as_str(), value)?));
                    }
                }
                if updates.is_empty() {
                    return Err(BridgeError::routing(&topic, "no solar or turbine field"));
                }

                let channels = updates.iter().map(|(c, _)| *c).collect();
                self.store.set_many(updates);
                Ok(Update::Sensor(channels))
            }
        }
    }

    fn sync_link_state(&mut self) {
        let connected = self.link_state.borrow_and_update().is_connected();
        if self.store.broker_connected() != connected {
            self.store.set_broker_connected(connected);
            info!(connected, "broker link status changed");
        }
    }
}

fn into_reading(topic: &str, field: &str, value: Value) -> Result<Reading> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(BridgeError::routing(
            topic,
            format!("'{field}' is not an object (got {other})"),
        )),
    }
}
