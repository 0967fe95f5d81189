mod settings;

use crate::config::settings::PartialSettings;
use crate::utils::{BridgeError, Result};
use config::{Config, Environment, File};

pub use settings::{BridgeSettings, BrokerSettings, ServerSettings, Settings, TopicSettings};

/// Loads `.env`, then `config/default.toml` (optional), then
/// `WATTBRIDGE__SECTION__KEY` environment variables, and merges the result
/// over `Settings::default()`.
///
/// Fails when the broker host or credentials are missing; that is the only
/// error that stops the bridge from starting.
pub fn load_config() -> Result<Settings> {
    let _ = dotenvy::dotenv();

    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("WATTBRIDGE")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let settings = merge(partial);
    settings.validate()?;
    Ok(settings)
}

fn merge(partial: PartialSettings) -> Settings {
    let default = Settings::default();
    let server = partial.server.as_ref();
    let broker = partial.broker.as_ref();
    let topics = broker.and_then(|b| b.topics.as_ref());
    let bridge = partial.bridge.as_ref();

    Settings {
        server: ServerSettings {
            host: server
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server.and_then(|s| s.port).unwrap_or(default.server.port),
        },
        broker: BrokerSettings {
            host: broker
                .and_then(|b| b.host.clone())
                .unwrap_or(default.broker.host),
            port: broker.and_then(|b| b.port).unwrap_or(default.broker.port),
            client_id: broker
                .and_then(|b| b.client_id.clone())
                .unwrap_or(default.broker.client_id),
            username: broker
                .and_then(|b| b.username.clone())
                .unwrap_or(default.broker.username),
            password: broker
                .and_then(|b| b.password.clone())
                .unwrap_or(default.broker.password),
            use_tls: broker
                .and_then(|b| b.use_tls)
                .unwrap_or(default.broker.use_tls),
            keep_alive_secs: broker
                .and_then(|b| b.keep_alive_secs)
                .unwrap_or(default.broker.keep_alive_secs),
            topics: TopicSettings {
                solar: topics
                    .and_then(|t| t.solar.clone())
                    .unwrap_or(default.broker.topics.solar),
                turbine: topics
                    .and_then(|t| t.turbine.clone())
                    .unwrap_or(default.broker.topics.turbine),
                gps: topics
                    .and_then(|t| t.gps.clone())
                    .unwrap_or(default.broker.topics.gps),
                sensor: topics
                    .and_then(|t| t.sensor.clone())
                    .unwrap_or(default.broker.topics.sensor),
            },
        },
        bridge: BridgeSettings {
            ingest_capacity: bridge
                .and_then(|b| b.ingest_capacity)
                .unwrap_or(default.bridge.ingest_capacity),
            client_outbox_capacity: bridge
                .and_then(|b| b.client_outbox_capacity)
                .unwrap_or(default.bridge.client_outbox_capacity),
            send_timeout_ms: bridge
                .and_then(|b| b.send_timeout_ms)
                .unwrap_or(default.bridge.send_timeout_ms),
            reconnect_interval_secs: bridge
                .and_then(|b| b.reconnect_interval_secs)
                .unwrap_or(default.bridge.reconnect_interval_secs),
            reconnect_max_backoff_secs: bridge
                .and_then(|b| b.reconnect_max_backoff_secs)
                .unwrap_or(default.bridge.reconnect_max_backoff_secs),
        },
        log_level: partial.log_level.unwrap_or(default.log_level),
    }
}

impl Settings {
    /// Rejects settings the bridge cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.broker.host.trim().is_empty() {
            return Err(BridgeError::Config("broker.host is not set".into()));
        }
        if self.broker.username.is_empty() || self.broker.password.is_empty() {
            return Err(BridgeError::Config(
                "broker.username and broker.password are required".into(),
            ));
        }
        if self.broker.client_id.trim().is_empty() {
            return Err(BridgeError::Config("broker.client_id must not be empty".into()));
        }
        if self.bridge.ingest_capacity == 0 || self.bridge.client_outbox_capacity == 0 {
            return Err(BridgeError::Config("queue capacities must be non-zero".into()));
        }
        if self.bridge.reconnect_interval_secs == 0 {
            return Err(BridgeError::Config(
                "bridge.reconnect_interval_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
