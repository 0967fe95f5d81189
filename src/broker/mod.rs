//! The MQTT side of the bridge.
//!
//! - `link`: the `BrokerLink` state machine and `LinkState`.
//! - `session`: the subscribe/unsubscribe/disconnect capability it drives.
//! - `mqtt`: the rumqttc event-loop task feeding broker events into the link.
//! - `topic`: topic-to-channel routing.
//! - `message`: `InboundMessage`, the unit handed to the dispatcher.

pub mod link;
pub mod message;
pub mod mqtt;
pub mod session;
pub mod topic;

pub use link::{BrokerLink, DisconnectKind, LinkEvent, LinkState};
pub use message::InboundMessage;
pub use mqtt::MqttDriver;
pub use session::BrokerSession;
pub use topic::{Route, TopicMap};
