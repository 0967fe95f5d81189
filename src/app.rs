//! Process wiring
//!
//! Builds every component from `Settings`, runs them as tasks and tears
//! them down in order on Ctrl-C:
//! 1. the shutdown flag stops the server, the supervisor and every client
//!    connection;
//! 2. the MQTT driver unsubscribes and disconnects;
//! 3. the dispatcher drains whatever is still queued;
//! 4. the registry drops every client so the writers send their close
//!    frames.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::bridge::{Dispatcher, ReconnectSupervisor, queue};
use crate::broker::{BrokerLink, MqttDriver, TopicMap};
use crate::config::Settings;
use crate::registry::ConnectionRegistry;
use crate::state::StateStore;
use crate::transport::{ApiState, serve};
use crate::utils::Result;

const STOP_GRACE: Duration = Duration::from_secs(5);

pub async fn run(settings: Settings) -> Result<()> {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;

    let store = StateStore::new();
    let registry = ConnectionRegistry::new(store.clone());
    let (ingest_tx, ingest_rx) = queue::channel(settings.bridge.ingest_capacity);
    let topics = TopicMap::from_settings(&settings.broker.topics);
    let link = Arc::new(BrokerLink::new(topics.clone(), ingest_tx));

    let (stop_tx, stop_rx) = watch::channel(false);

    let driver = MqttDriver::new(&settings.broker, link.clone());
    let dispatcher = Dispatcher::new(
        ingest_rx,
        link.watch_state(),
        store.clone(),
        registry.clone(),
        topics,
    );
    let supervisor = ReconnectSupervisor::new(link.clone(), &settings.bridge);
    let api = ApiState::new(store, registry.clone(), link.clone(), &settings, stop_rx.clone());

    print_banner(&settings);

    let driver_task = tokio::spawn(driver.run(stop_rx.clone()));
    let dispatcher_task = tokio::spawn(dispatcher.run(stop_rx.clone()));
    let supervisor_task = tokio::spawn(supervisor.run(stop_rx));
    let server_task = tokio::spawn(serve(listener, api));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for Ctrl-C: {e}");
    }
    info!("shutdown signal received, stopping bridge");
    let _ = stop_tx.send(true);

    join("MQTT driver", driver_task).await;
    join("dispatcher", dispatcher_task).await;
    registry.close_all();
    join("reconnect supervisor", supervisor_task).await;
    if let Some(Err(e)) = join("HTTP server", server_task).await {
        warn!("HTTP server stopped with error: {e}");
    }

    info!("bridge stopped");
    Ok(())
}

async fn join<T>(name: &str, task: JoinHandle<T>) -> Option<T> {
    match tokio::time::timeout(STOP_GRACE, task).await {
        Ok(Ok(out)) => Some(out),
        Ok(Err(e)) => {
            error!("{name} task failed: {e}");
            None
        }
        Err(_) => {
            warn!("{name} did not stop within {STOP_GRACE:?}");
            None
        }
    }
}

fn print_banner(settings: &Settings) {
    let broker = &settings.broker;
    info!("WattBridge v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "MQTT broker: {}:{} (tls: {}, client id: {})",
        broker.host, broker.port, broker.use_tls, broker.client_id
    );
    info!(
        "topics: {}, {}, {}, {}",
        broker.topics.solar, broker.topics.turbine, broker.topics.gps, broker.topics.sensor
    );
    info!(
        "dashboard endpoints: ws://{host}:{port}/ws  http://{host}:{port}/api/current",
        host = settings.server.host,
        port = settings.server.port
    );
}
