//! Messages crossing from the broker link into the dispatcher.
//!
//! An `InboundMessage` is created once per delivered MQTT publish whose
//! payload decoded as JSON, consumed exactly once by the dispatcher and
//! then discarded.

use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
            received_at: Utc::now(),
        }
    }
}
