//! CLI for WattBridge
//!
//! Subcommands:
//! - `server`: run the bridge
//! - `client`: connect to a running bridge, print the welcome and a pong

use std::process::ExitCode;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::error;
use wattbridge::config::load_config;
use wattbridge::utils::{logging, timestamp};

#[derive(Parser)]
#[command(name = "wattbridge")]
enum Command {
    /// Start the MQTT to WebSocket bridge
    Server,
    /// Connect to a running bridge and exchange a ping (useful for smoke tests)
    Client {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8000/ws")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cmd = Command::parse();

    let result = match cmd {
        Command::Server => run_server().await,
        Command::Client { url } => {
            logging::init("info");
            run_client(&url).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            // logging is not configured yet
            logging::init("info");
            return Err(e.into());
        }
    };
    logging::init(&settings.log_level);
    wattbridge::app::run(settings).await?;
    Ok(())
}

async fn run_client(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (mut ws_stream, _response) = connect_async(url).await?;

    // 1. Welcome snapshot
    if let Some(Ok(WsMessage::Text(msg))) = ws_stream.next().await {
        println!("Welcome: {msg}");
    }

    // 2. Ping
    let ping = json!({ "type": "ping", "timestamp": timestamp() });
    ws_stream
        .send(WsMessage::Text(ping.to_string().into()))
        .await?;

    // 3. First reply that is a pong; live updates may arrive before it
    while let Some(frame) = ws_stream.next().await {
        if let WsMessage::Text(msg) = frame? {
            let v: serde_json::Value = serde_json::from_str(msg.as_str())?;
            if v["type"] == "pong" {
                println!("Pong: {msg}");
                break;
            }
            println!("Update: {msg}");
        }
    }

    let _ = ws_stream.close(None).await;
    Ok(())
}
