//! The broker capabilities the link needs.
//!
//! Calls only queue a request for the MQTT event loop; they never wait on
//! the network, so they are safe to make from inside the task that polls
//! that event loop.

use rumqttc::{AsyncClient, QoS};

use crate::utils::{BridgeError, Result};

pub trait BrokerSession {
    fn subscribe(&self, topic: &str) -> Result<()>;
    fn unsubscribe(&self, topic: &str) -> Result<()>;
    fn disconnect(&self) -> Result<()>;
}

impl BrokerSession for AsyncClient {
    fn subscribe(&self, topic: &str) -> Result<()> {
        self.try_subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| BridgeError::Transport(format!("subscribe {topic}: {e}")))
    }

    fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.try_unsubscribe(topic)
            .map_err(|e| BridgeError::Transport(format!("unsubscribe {topic}: {e}")))
    }

    fn disconnect(&self) -> Result<()> {
        self.try_disconnect()
            .map_err(|e| BridgeError::Transport(format!("disconnect: {e}")))
    }
}
