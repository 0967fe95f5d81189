//! Broker link
//!
//! The connection lifecycle of the MQTT session as an explicit state
//! machine. The MQTT driver calls one transition handler per broker event;
//! each handler either moves `LinkState` along the table in
//! [`LinkState::apply`] or rejects the event.
//!
//! The link never touches the state store or the client registry. Decoded
//! messages go onto the ingest queue and state changes go out on a watch
//! channel, which the dispatcher, the reconnect supervisor and the HTTP API
//! observe.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Notify, watch};
use tracing::{debug, info, warn};

use super::message::InboundMessage;
use super::session::BrokerSession;
use super::topic::TopicMap;
use crate::bridge::queue::IngestSender;
use crate::utils::{BridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    ConnectStart,
    Acknowledged,
    Dropped,
}

/// How a session ended. Only the log line differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectKind {
    Clean,
    Unclean(String),
}

impl LinkState {
    /// The transition table. `None` means the event is not valid here.
    ///
    /// `Connecting` + `Dropped` is a failed attempt and lands back in
    /// `Disconnected`, where the supervisor can try again.
    pub fn apply(self, event: LinkEvent) -> Option<LinkState> {
        match (self, event) {
            (LinkState::Disconnected, LinkEvent::ConnectStart) => Some(LinkState::Connecting),
            (LinkState::Connecting, LinkEvent::Acknowledged) => Some(LinkState::Connected),
            (LinkState::Connecting, LinkEvent::Dropped) => Some(LinkState::Disconnected),
            (LinkState::Connected, LinkEvent::Dropped) => Some(LinkState::Disconnected),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected)
    }
}

#[derive(Debug)]
pub struct BrokerLink {
    topics: TopicMap,
    state: watch::Sender<LinkState>,
    ingest: IngestSender,
    wake: Notify,
}

impl BrokerLink {
    pub fn new(topics: TopicMap, ingest: IngestSender) -> Self {
        let (state, _) = watch::channel(LinkState::Disconnected);
        Self {
            topics,
            state,
            ingest,
            wake: Notify::new(),
        }
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    /// Messages the ingest queue rejected because it was full.
    pub fn dropped_messages(&self) -> u64 {
        self.ingest.dropped()
    }

    /// Starts a connection attempt: `Disconnected -> Connecting`, then wakes
    /// the driver. Fire-and-forget; the outcome arrives as later transitions.
    pub fn request_connect(&self) -> Result<LinkState> {
        let next = self.transition(LinkEvent::ConnectStart)?;
        self.wake.notify_one();
        Ok(next)
    }

    /// Resolves once `request_connect` has been called.
    pub async fn connect_requested(&self) {
        self.wake.notified().await
    }

    /// Broker acknowledged the session: subscribe every configured topic,
    /// then report ready.
    pub fn on_connack<S: BrokerSession>(&self, session: &S) -> Result<LinkState> {
        for topic in self.topics.topics() {
            if let Err(e) = session.subscribe(topic) {
                self.on_disconnect(DisconnectKind::Unclean(e.to_string()));
                return Err(e);
            }
            info!("subscribed to {topic}");
        }
        let next = self.transition(LinkEvent::Acknowledged)?;
        info!("broker link ready ({} topics)", self.topics.len());
        Ok(next)
    }

    /// Decodes a delivered payload and hands it to the dispatcher without
    /// waiting. Malformed payloads are logged and dropped.
    pub fn on_publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let payload: Value = match serde_json::from_slice(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!("dropping malformed payload on {topic}: {e}");
                return Err(e.into());
            }
        };
        debug!("broker message on {topic}");

        self.ingest
            .push(InboundMessage::new(topic, payload))
            .inspect_err(|e| warn!("dropping message on {topic}: {e}"))
    }

    /// The session is gone. Repeated drops while already disconnected are
    /// ignored.
    pub fn on_disconnect(&self, kind: DisconnectKind) -> Option<LinkState> {
        if self.state() == LinkState::Disconnected {
            return None;
        }
        match &kind {
            DisconnectKind::Clean => info!("broker link closed"),
            DisconnectKind::Unclean(reason) => warn!("broker link lost: {reason}"),
        }
        self.transition(LinkEvent::Dropped).ok()
    }

    /// Unsubscribes every topic and asks the broker to end the session.
    pub fn shutdown<S: BrokerSession>(&self, session: &S) {
        for topic in self.topics.topics() {
            if let Err(e) = session.unsubscribe(topic) {
                warn!("{e}");
            }
        }
        if let Err(e) = session.disconnect() {
            warn!("{e}");
        }
    }

    fn transition(&self, event: LinkEvent) -> Result<LinkState> {
        let mut outcome = None;
        self.state.send_if_modified(|state| {
            let from = *state;
            match from.apply(event) {
                Some(next) => {
                    *state = next;
                    outcome = Some(Ok(next));
                    true
                }
                None => {
                    outcome = Some(Err(BridgeError::InvalidTransition { from, event }));
                    false
                }
            }
        });

        match outcome {
            Some(Ok(next)) => {
                debug!(?event, state = ?next, "link transition");
                Ok(next)
            }
            Some(Err(e)) => {
                debug!("{e}");
                Err(e)
            }
            None => Err(BridgeError::Transport("link state unavailable".into())),
        }
    }
}
