//! MQTT driver
//!
//! Owns the rumqttc event loop and turns packets into `BrokerLink`
//! transitions. The loop is only polled while a session is wanted: the
//! driver idles until the link asks for a connection, drives the session
//! until it drops, reports the drop and idles again. Reconnection pacing
//! belongs to the reconnect supervisor, not to this task.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, Transport,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::link::{BrokerLink, DisconnectKind, LinkState};
use crate::config::BrokerSettings;
use crate::utils::wait_for_shutdown;

const REQUEST_CAPACITY: usize = 64;
const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Dropped,
    Shutdown,
}

pub struct MqttDriver {
    link: Arc<BrokerLink>,
    client: AsyncClient,
    eventloop: EventLoop,
    endpoint: String,
}

impl MqttDriver {
    pub fn new(settings: &BrokerSettings, link: Arc<BrokerLink>) -> Self {
        let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
        options.set_keep_alive(Duration::from_secs(settings.keep_alive_secs));
        options.set_credentials(&settings.username, &settings.password);
        options.set_clean_session(true);
        if settings.use_tls {
            options.set_transport(Transport::tls_with_default_config());
        }

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        Self {
            link,
            client,
            eventloop,
            endpoint: format!("{}:{}", settings.host, settings.port),
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = self.link.connect_requested() => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }

            info!("connecting to MQTT broker {}", self.endpoint);
            if self.drive_session(&mut shutdown).await == SessionEnd::Shutdown {
                self.close().await;
                break;
            }
        }
        self.link.on_disconnect(DisconnectKind::Clean);
        info!("MQTT driver stopped");
    }

    async fn drive_session(&mut self, shutdown: &mut watch::Receiver<bool>) -> SessionEnd {
        loop {
            let event = tokio::select! {
                event = self.eventloop.poll() => event,
                _ = wait_for_shutdown(shutdown) => return SessionEnd::Shutdown,
            };

            match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        self.link.on_disconnect(DisconnectKind::Unclean(format!(
                            "connection refused: {:?}",
                            ack.code
                        )));
                        return SessionEnd::Dropped;
                    }
                    if let Err(e) = self.link.on_connack(&self.client) {
                        warn!("broker session not ready: {e}");
                        return SessionEnd::Dropped;
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    // failures are logged by the link and never end the session
                    let _ = self.link.on_publish(&publish.topic, &publish.payload);
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    debug!(pkid = ack.pkid, "subscription confirmed: {:?}", ack.return_codes);
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    self.link.on_disconnect(DisconnectKind::Clean);
                    return SessionEnd::Dropped;
                }
                Ok(_) => {}
                Err(e) => {
                    self.link.on_disconnect(DisconnectKind::Unclean(e.to_string()));
                    return SessionEnd::Dropped;
                }
            }
        }
    }

    /// Unsubscribes and disconnects, polling just long enough to flush the
    /// packets out.
    async fn close(&mut self) {
        if self.link.state() != LinkState::Connected {
            return;
        }
        self.link.shutdown(&self.client);

        let flush = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(CLOSE_GRACE, flush).await.is_err() {
            warn!("MQTT disconnect not flushed within {CLOSE_GRACE:?}");
        }
    }
}
