//! Error types shared across the bridge.
//!
//! Every variant except [`BridgeError::Config`] is recovered locally: the
//! component that sees it logs it and carries on. Configuration errors are
//! the only class allowed to stop startup.

use thiserror::Error;

use crate::broker::{LinkEvent, LinkState};

#[derive(Error, Debug)]
pub enum BridgeError {
    /// Broker or client connection lost.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unroutable message on '{topic}': {reason}")]
    Routing { topic: String, reason: String },

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("invalid link transition: {event:?} while {from:?}")]
    InvalidTransition { from: LinkState, event: LinkEvent },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for BridgeError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl BridgeError {
    pub fn routing(topic: &str, reason: impl Into<String>) -> Self {
        Self::Routing {
            topic: topic.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
