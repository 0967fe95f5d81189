//! The client-facing server: one axum `Router` on one listener.
//!
//! - `/ws` upgrades to the live fan-out WebSocket;
//! - `/`, `/api/current`, `/api/status` are read-only snapshot endpoints.
//!
//! The snapshot handlers only read the state store, the registry's client
//! count and the broker link, and always succeed.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::broker::{BrokerLink, LinkState};
use crate::config::{BridgeSettings, Settings};
use crate::registry::ConnectionRegistry;
use crate::state::StateStore;
use crate::transport::websocket::ws_handler;
use crate::utils::{timestamp, wait_for_shutdown};

#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
    pub registry: ConnectionRegistry,
    pub link: Arc<BrokerLink>,
    pub broker_host: String,
    pub broker_port: u16,
    pub port: u16,
    pub bridge: BridgeSettings,
    pub shutdown: watch::Receiver<bool>,
}

impl ApiState {
    pub fn new(
        store: StateStore,
        registry: ConnectionRegistry,
        link: Arc<BrokerLink>,
        settings: &Settings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            registry,
            link,
            broker_host: settings.broker.host.clone(),
            broker_port: settings.broker.port,
            port: settings.server.port,
            bridge: settings.bridge.clone(),
            shutdown,
        }
    }

    fn link_state(&self) -> LinkState {
        self.link.state()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/current", get(current))
        .route("/api/status", get(status))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: ApiState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("listening on http://{addr} (WebSocket at ws://{addr}/ws)");
    }
    let mut shutdown = state.shutdown.clone();
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        wait_for_shutdown(&mut shutdown).await;
        info!("HTTP server shutting down");
    })
    .await
}

pub(crate) async fn root(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "name": "WattBridge",
        "version": env!("CARGO_PKG_VERSION"),
        "mqtt": {
            "connected": state.link_state().is_connected(),
            "broker": state.broker_host,
            "port": state.broker_port,
        },
        "endpoints": {
            "websocket": format!("ws://localhost:{}/ws", state.port),
            "current_data": "/api/current",
            "status": "/api/status",
        },
    }))
}

pub(crate) async fn current(State(state): State<ApiState>) -> Json<Value> {
    let data = state.store.snapshot().current_data;
    Json(json!({
        "timestamp": timestamp(),
        "solar": data.solar,
        "turbine": data.turbine,
        "gps": data.gps,
        "status": {
            "mqtt_connected": state.link_state().is_connected(),
            "websocket_clients": state.registry.len(),
        },
    }))
}

pub(crate) async fn status(State(state): State<ApiState>) -> Json<Value> {
    let link = state.link_state();
    Json(json!({
        "status": "online",
        "mqtt_connected": link.is_connected(),
        "link_state": link,
        "mqtt_broker": state.broker_host,
        "active_websocket_connections": state.registry.len(),
        "ingest_dropped": state.link.dropped_messages(),
        "server_time": timestamp(),
        "current_data": state.store.snapshot().current_data,
    }))
}
