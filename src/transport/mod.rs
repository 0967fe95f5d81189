//! Client-facing transports.
//!
//! - `message`: the JSON envelopes clients send and receive.
//! - `http`: the axum server carrying the snapshot endpoints and `/ws`.
//! - `websocket`: the per-connection fan-out loop behind `/ws`.

pub mod http;
pub mod message;
pub mod websocket;

pub use http::{ApiState, serve};
pub use message::{ClientMessage, ServerMessage};
