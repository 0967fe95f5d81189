//! JSON envelopes exchanged with WebSocket clients.
//!
//! Every envelope carries a `type` tag. The server sends a `connection`
//! welcome on registration and then `sensor_data` / `gps_data` updates; the
//! only client message with meaning is `ping`, answered with `pong`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{CurrentData, Reading, StateSnapshot};
use crate::utils::timestamp;

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "ping")]
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<Value>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "connection")]
    Connection {
        status: String,
        message: String,
        timestamp: String,
        current_data: CurrentData,
        mqtt_connected: bool,
    },
    #[serde(rename = "sensor_data")]
    SensorData {
        timestamp: String,
        solar: Reading,
        turbine: Reading,
    },
    #[serde(rename = "gps_data")]
    GpsData { timestamp: String, gps: Reading },
    #[serde(rename = "pong")]
    Pong {
        timestamp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_timestamp: Option<Value>,
    },
}

impl ServerMessage {
    pub fn welcome(snapshot: StateSnapshot) -> Self {
        ServerMessage::Connection {
            status: "connected".to_string(),
            message: "Connected to WattBridge".to_string(),
            timestamp: timestamp(),
            current_data: snapshot.current_data,
            mqtt_connected: snapshot.broker_connected,
        }
    }

    pub fn sensor_update(data: &CurrentData) -> Self {
        ServerMessage::SensorData {
            timestamp: timestamp(),
            solar: data.solar.clone(),
            turbine: data.turbine.clone(),
        }
    }

    pub fn gps_update(gps: Reading) -> Self {
        ServerMessage::GpsData {
            timestamp: timestamp(),
            gps,
        }
    }

    pub fn pong(client_timestamp: Option<Value>) -> Self {
        ServerMessage::Pong {
            timestamp: timestamp(),
            client_timestamp,
        }
    }

    /// The `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Connection { .. } => "connection",
            ServerMessage::SensorData { .. } => "sensor_data",
            ServerMessage::GpsData { .. } => "gps_data",
            ServerMessage::Pong { .. } => "pong",
        }
    }
}
