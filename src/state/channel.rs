use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

/// The latest structured value for a channel: a JSON object.
pub type Reading = Map<String, Value>;

/// A named telemetry stream with exactly one current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Solar,
    Turbine,
    Gps,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Solar, Channel::Turbine, Channel::Gps];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Solar => "solar",
            Channel::Turbine => "turbine",
            Channel::Gps => "gps",
        }
    }

    /// Sensor channels are coalesced into one `sensor_data` broadcast.
    pub fn is_sensor(&self) -> bool {
        matches!(self, Channel::Solar | Channel::Turbine)
    }

    /// The value a channel reports before any device has published to it.
    pub fn default_reading(&self) -> Reading {
        let value = match self {
            Channel::Solar | Channel::Turbine => {
                json!({ "voltage": 0, "ampere": 0, "power": 0 })
            }
            Channel::Gps => json!({ "latitude": -7.2575, "longitude": 112.7521 }),
        };
        match value {
            Value::Object(map) => map,
            _ => Reading::new(),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
