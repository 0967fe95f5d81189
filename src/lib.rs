//! # WattBridge
//!
//! `wattbridge` relays live energy telemetry from an MQTT broker to browser
//! dashboards over WebSockets. Readings for the solar, turbine and GPS
//! channels are kept in an in-memory snapshot so a dashboard that connects
//! late still starts from the latest values.
//!
//! ## Core Modules
//!
//! - `broker`: the MQTT link state machine, topic routing and the rumqttc driver.
//! - `bridge`: the ingest queue, the dispatcher and the reconnect supervisor.
//! - `state`: channels, readings and the shared snapshot.
//! - `registry`: live WebSocket clients and best-effort broadcast.
//! - `transport`: the WebSocket server, the HTTP snapshot API and the JSON envelopes.
//! - `config`: layered settings from defaults, `config/default.toml` and the environment.
//! - `utils`: errors, logging and timestamps.
//! - `app`: wiring and ordered shutdown.

pub mod app;
pub mod bridge;
pub mod broker;
pub mod config;
pub mod registry;
pub mod state;
pub mod transport;
pub mod utils;
