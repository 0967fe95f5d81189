use serde::Deserialize;
use std::time::Duration;

/// Top-level configuration settings for the bridge.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub bridge: BridgeSettings,
    pub log_level: String,
}

/// The one listener shared by `/ws` and the HTTP snapshot API.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// MQTT broker endpoint and pre-shared credentials.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
    pub keep_alive_secs: u64,
    pub topics: TopicSettings,
}

/// The four fixed topic identifiers the bridge subscribes to.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TopicSettings {
    pub solar: String,
    pub turbine: String,
    pub gps: String,
    pub sensor: String,
}

/// Queue sizes, timeouts and reconnect pacing.
#[derive(Debug, Deserialize, Clone)]
pub struct BridgeSettings {
    pub ingest_capacity: usize,
    pub client_outbox_capacity: usize,
    pub send_timeout_ms: u64,
    pub reconnect_interval_secs: u64,
    pub reconnect_max_backoff_secs: u64,
}

impl BridgeSettings {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }

    pub fn reconnect_max_backoff(&self) -> Duration {
        Duration::from_secs(self.reconnect_max_backoff_secs)
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub bridge: Option<PartialBridgeSettings>,
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: Option<bool>,
    pub keep_alive_secs: Option<u64>,
    pub topics: Option<PartialTopicSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialTopicSettings {
    pub solar: Option<String>,
    pub turbine: Option<String>,
    pub gps: Option<String>,
    pub sensor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBridgeSettings {
    pub ingest_capacity: Option<usize>,
    pub client_outbox_capacity: Option<usize>,
    pub send_timeout_ms: Option<u64>,
    pub reconnect_interval_secs: Option<u64>,
    pub reconnect_max_backoff_secs: Option<u64>,
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            solar: "wattscope/sensor/solar".to_string(),
            turbine: "wattscope/sensor/turbine".to_string(),
            gps: "wattscope/gps".to_string(),
            sensor: "wattscope/sensor".to_string(),
        }
    }
}

/// Defaults for everything except the broker endpoint and credentials,
/// which have to come from a config file or the environment.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            broker: BrokerSettings {
                host: String::new(),
                port: 8883,
                client_id: "wattscope_backend".to_string(),
                username: String::new(),
                password: String::new(),
                use_tls: true,
                keep_alive_secs: 60,
                topics: TopicSettings::default(),
            },
            bridge: BridgeSettings {
                ingest_capacity: 1024,
                client_outbox_capacity: 256,
                send_timeout_ms: 5000,
                reconnect_interval_secs: 10,
                reconnect_max_backoff_secs: 60,
            },
            log_level: "info".to_string(),
        }
    }
}
